pub mod command_parser;

pub use command_parser::{
    MazeDefaults, MazeRequest, ParseError, ParsedCommand, command_route, generate_maze,
    parse_command,
};
