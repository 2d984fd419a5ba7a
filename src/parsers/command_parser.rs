use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::config::GeneralConfig;
use crate::dispatch::Route;
use crate::maze::{HIDDEN_CURSOR, MAX_DIMENSION, MIN_DIMENSION, Maze, MazeVariant};

const MAX_GENERATE_ARGS: usize = 2;

static SIZE_ARGUMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^-?[0-9]+x-?[0-9]+$").unwrap_or_else(|err| panic!("invalid size regex: {err}"))
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Generate(MazeRequest),
    Help,
    SetPrefix { argument: String },
    MentionQuery,
    Invalid { token: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MazeRequest {
    pub width: i32,
    pub height: i32,
    pub variant: MazeVariant,
    pub loopy: bool,
}

/// Size used when a `gen` command names none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MazeDefaults {
    pub width: i32,
    pub height: i32,
}

impl From<&GeneralConfig> for MazeDefaults {
    fn from(general: &GeneralConfig) -> Self {
        Self {
            width: general.default_maze_width,
            height: general.default_maze_height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("too many arguments")]
    TooManyArguments,
    #[error("unknown argument `{0}`")]
    UnknownArgument(String),
    #[error("maze size out of range")]
    SizeOutOfRange,
    #[error("`{0}` is not a valid maze dimension")]
    NumberFormat(String),
}

/// Picks the route for the text that follows `<prefix>maze`.
pub fn command_route(rest: &str) -> Route {
    match rest.split_whitespace().next() {
        Some("gen") => Route::Generate,
        Some("help") => Route::Help,
        Some("setPrefix") => Route::SetPrefix,
        _ => Route::Invalid,
    }
}

/// Parses the text that follows `<prefix>maze` into a command.
pub fn parse_command(rest: &str, defaults: MazeDefaults) -> Result<ParsedCommand, ParseError> {
    let rest = rest.trim();
    let (keyword, arguments) = match rest.split_once(char::is_whitespace) {
        Some((keyword, arguments)) => (keyword, arguments.trim()),
        None => (rest, ""),
    };

    let command = match command_route(keyword) {
        Route::Generate => ParsedCommand::Generate(parse_generate_args(arguments, defaults)?),
        Route::Help => ParsedCommand::Help,
        Route::SetPrefix => ParsedCommand::SetPrefix {
            argument: arguments.to_string(),
        },
        Route::Mention => ParsedCommand::MentionQuery,
        Route::Invalid => ParsedCommand::Invalid {
            token: (!keyword.is_empty()).then(|| keyword.to_string()),
        },
    };
    Ok(command)
}

/// Parses the arguments of `gen`. The argument count is checked before any
/// argument is looked at, so a third argument always reports
/// [`ParseError::TooManyArguments`].
pub fn parse_generate_args(
    arguments: &str,
    defaults: MazeDefaults,
) -> Result<MazeRequest, ParseError> {
    let tokens: Vec<&str> = arguments.split_whitespace().collect();
    if tokens.len() > MAX_GENERATE_ARGS {
        return Err(ParseError::TooManyArguments);
    }

    let mut request = MazeRequest {
        width: defaults.width,
        height: defaults.height,
        variant: MazeVariant::TreeBased,
        loopy: false,
    };

    for token in tokens {
        if SIZE_ARGUMENT.is_match(token) {
            let (width, height) = parse_size(token)?;
            request.width = width;
            request.height = height;
        } else if token.eq_ignore_ascii_case("windy") {
            request.variant = MazeVariant::TreeBased;
        } else if token.eq_ignore_ascii_case("spikey") {
            request.variant = MazeVariant::Alternate;
        } else if token.eq_ignore_ascii_case("loopy") {
            request.variant = MazeVariant::TreeBased;
            request.loopy = true;
        } else {
            return Err(ParseError::UnknownArgument(token.to_string()));
        }
    }

    Ok(request)
}

fn parse_size(token: &str) -> Result<(i32, i32), ParseError> {
    let (width, height) = token
        .split_once(['x', 'X'])
        .ok_or_else(|| ParseError::NumberFormat(token.to_string()))?;
    Ok((parse_dimension(width)?, parse_dimension(height)?))
}

fn parse_dimension(text: &str) -> Result<i32, ParseError> {
    let value: i32 = text
        .parse()
        .map_err(|_| ParseError::NumberFormat(text.to_string()))?;
    if (MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
        Ok(value)
    } else {
        Err(ParseError::SizeOutOfRange)
    }
}

/// Builds the maze a request describes, with the player marker hidden.
pub fn generate_maze(request: &MazeRequest) -> Maze {
    let mut maze = Maze::new(request.variant);
    // Dimensions were range checked while parsing.
    maze.generate(request.width as usize, request.height as usize);
    if request.loopy {
        maze.loopify();
    }
    maze.set_cursor(HIDDEN_CURSOR.0, HIDDEN_CURSOR.1);
    maze
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::{
        MazeDefaults, MazeRequest, ParseError, ParsedCommand, command_route, generate_maze,
        parse_command, parse_generate_args,
    };
    use crate::dispatch::Route;
    use crate::maze::{HIDDEN_CURSOR, MazeVariant};

    const DEFAULTS: MazeDefaults = MazeDefaults {
        width: 10,
        height: 10,
    };

    fn request(width: i32, height: i32, variant: MazeVariant, loopy: bool) -> MazeRequest {
        MazeRequest {
            width,
            height,
            variant,
            loopy,
        }
    }

    #[test_case("" => Ok(request(10, 10, MazeVariant::TreeBased, false)) ; "defaults")]
    #[test_case("5x7" => Ok(request(5, 7, MazeVariant::TreeBased, false)) ; "size only")]
    #[test_case("5x7 spikey" => Ok(request(5, 7, MazeVariant::Alternate, false)) ; "size and variant")]
    #[test_case("loopy 4x4" => Ok(request(4, 4, MazeVariant::TreeBased, true)) ; "variant first")]
    #[test_case("  3X30   WINDY " => Ok(request(3, 30, MazeVariant::TreeBased, false)) ; "case and spacing")]
    #[test_case("spikey loopy" => Ok(request(10, 10, MazeVariant::TreeBased, true)) ; "last variant wins")]
    #[test_case("1x5" => Err(ParseError::SizeOutOfRange) ; "width too small")]
    #[test_case("5x31" => Err(ParseError::SizeOutOfRange) ; "height too large")]
    #[test_case("-3x5" => Err(ParseError::SizeOutOfRange) ; "negative width")]
    #[test_case("99999999999x5" => Err(ParseError::NumberFormat("99999999999".to_string())) ; "overflowing width")]
    #[test_case("5x5x5" => Err(ParseError::UnknownArgument("5x5x5".to_string())) ; "three dimensions")]
    #[test_case("٣x٥" => Err(ParseError::UnknownArgument("٣x٥".to_string())) ; "non ascii digits")]
    #[test_case("twisty" => Err(ParseError::UnknownArgument("twisty".to_string())) ; "unknown word")]
    #[test_case("5x5 spikey loopy" => Err(ParseError::TooManyArguments) ; "three arguments")]
    #[test_case("bogus 1x1 nonsense" => Err(ParseError::TooManyArguments) ; "count checked before tokens")]
    fn parses_generate_arguments(arguments: &str) -> Result<MazeRequest, ParseError> {
        parse_generate_args(arguments, DEFAULTS)
    }

    #[test_case("gen" => Route::Generate ; "gen alone")]
    #[test_case("gen 5x5" => Route::Generate ; "gen with args")]
    #[test_case("help" => Route::Help ; "help")]
    #[test_case("setPrefix ?" => Route::SetPrefix ; "set prefix")]
    #[test_case("setprefix ?" => Route::Invalid ; "keywords are case sensitive")]
    #[test_case("" => Route::Invalid ; "empty")]
    #[test_case("dance" => Route::Invalid ; "unknown")]
    fn routes_by_first_token(rest: &str) -> Route {
        command_route(rest)
    }

    #[test]
    fn parse_command_extracts_set_prefix_argument() {
        assert_eq!(
            parse_command("setPrefix  ? ", DEFAULTS),
            Ok(ParsedCommand::SetPrefix {
                argument: "?".to_string()
            })
        );
    }

    #[test]
    fn parse_command_reports_invalid_token() {
        assert_eq!(
            parse_command("dance now", DEFAULTS),
            Ok(ParsedCommand::Invalid {
                token: Some("dance".to_string())
            })
        );
        assert_eq!(
            parse_command("   ", DEFAULTS),
            Ok(ParsedCommand::Invalid { token: None })
        );
    }

    #[test]
    fn parse_command_runs_generate_grammar() {
        assert_eq!(
            parse_command("gen 6x8", DEFAULTS),
            Ok(ParsedCommand::Generate(request(
                6,
                8,
                MazeVariant::TreeBased,
                false
            )))
        );
        assert_eq!(
            parse_command("gen a b c", DEFAULTS),
            Err(ParseError::TooManyArguments)
        );
    }

    #[test]
    fn generated_maze_matches_request_without_marker() {
        let maze = generate_maze(&request(5, 7, MazeVariant::Alternate, false));
        let text = maze.stringify();

        assert_eq!(maze.width(), 5);
        assert_eq!(maze.height(), 7);
        assert_eq!(maze.cursor(), HIDDEN_CURSOR);
        assert!(!text.contains('@'));
        assert_eq!(text.lines().count(), 15);
        assert!(text.lines().all(|line| line.chars().count() == 11));
    }

    #[test]
    fn every_accepted_size_generates_those_dimensions() {
        for width in 2..=30 {
            for height in 2..=30 {
                let request = parse_generate_args(&format!("{width}x{height} spikey"), DEFAULTS)
                    .expect("size in range");
                let maze = generate_maze(&request);
                assert_eq!((maze.width(), maze.height()), (width as usize, height as usize));
            }
        }
        for size in ["0x10", "10x0", "31x31", "2x-2"] {
            assert_eq!(
                parse_generate_args(size, DEFAULTS),
                Err(ParseError::SizeOutOfRange)
            );
        }
    }

    #[test]
    fn loopy_request_adds_loops() {
        let maze = generate_maze(&request(12, 12, MazeVariant::TreeBased, true));
        assert_eq!(maze.variant(), MazeVariant::TreeBased);
        assert!(!maze.grid().is_perfect());
        assert!(!maze.stringify().contains('@'));
    }
}
