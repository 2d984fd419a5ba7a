use tracing::{debug, error, warn};

use super::{InboundEvent, Route, RoutedEvent};
use crate::context::AppContext;
use crate::db::PrefixWrite;
use crate::parsers::{MazeRequest, ParseError, ParsedCommand, generate_maze, parse_command};
use crate::prefix::PrefixError;
use crate::utils::template::fill;

/// Discord rejects messages longer than this many characters.
pub const MESSAGE_LIMIT: usize = 2000;

const MAZE_BLOCK_OPEN: &str = "```maze\n";
const MAZE_BLOCK_CLOSE: &str = "```";

/// Answers one routed event. Failures are logged and, where possible, turned
/// into a reply; nothing is returned to the worker.
pub async fn handle(ctx: &AppContext, routed: RoutedEvent) {
    let command = match routed.route {
        Route::Mention => Ok(ParsedCommand::MentionQuery),
        _ => parse_command(&routed.text, ctx.maze_defaults()),
    };

    let reply = match command {
        Ok(ParsedCommand::Generate(request)) => {
            return handle_generate(ctx, &routed, &request).await;
        }
        Ok(ParsedCommand::Help) => handle_help(ctx, &routed),
        Ok(ParsedCommand::SetPrefix { argument }) => {
            handle_set_prefix(ctx, &routed, &argument).await
        }
        Ok(ParsedCommand::MentionQuery) => handle_mention(ctx, &routed),
        Ok(ParsedCommand::Invalid { token }) => handle_invalid(ctx, &routed, token.as_deref()),
        Err(err) => parse_error_reply(ctx, &routed, &err),
    };

    send_reply(ctx, &routed.event, &reply).await;
}

async fn handle_generate(ctx: &AppContext, routed: &RoutedEvent, request: &MazeRequest) {
    debug!(
        message_id = routed.event.message_id,
        width = request.width,
        height = request.height,
        variant = ?request.variant,
        loopy = request.loopy,
        "generating maze"
    );

    let maze = generate_maze(request);
    for chunk in maze_messages(&maze.stringify()) {
        if !send_reply(ctx, &routed.event, &chunk).await {
            break;
        }
    }
}

fn handle_help(ctx: &AppContext, routed: &RoutedEvent) -> String {
    fill(&ctx.messages().help, &[("<prefix>", &routed.prefix)])
}

fn handle_mention(ctx: &AppContext, routed: &RoutedEvent) -> String {
    fill(&ctx.messages().mention, &[("<prefix>", &routed.prefix)])
}

fn handle_invalid(ctx: &AppContext, routed: &RoutedEvent, token: Option<&str>) -> String {
    let messages = ctx.messages();
    match token {
        Some(command) => fill(
            &messages.invalid_command,
            &[("<prefix>", &routed.prefix), ("<command>", command)],
        ),
        None => fill(&messages.no_command, &[("<prefix>", &routed.prefix)]),
    }
}

async fn handle_set_prefix(ctx: &AppContext, routed: &RoutedEvent, argument: &str) -> String {
    let messages = ctx.messages();
    let prefix = routed.prefix.as_str();

    if !routed.event.is_direct_message() {
        match ctx.gateway.can_manage_guild(&routed.event).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(
                    author_id = routed.event.author_id,
                    guild_id = ?routed.event.guild_id,
                    "set prefix refused without manage guild permission"
                );
                return fill(&messages.permission_error, &[("<prefix>", prefix)]);
            }
            Err(err) => {
                error!(message_id = routed.event.message_id, error = %err, "permission lookup failed");
                return fill(&messages.generic_error, &[("<prefix>", prefix)]);
            }
        }
    }

    match ctx.prefixes.set_prefix(&routed.event, argument).await {
        Ok(change) if change.write == PrefixWrite::Unchanged => {
            fill(&messages.prefix_unchanged, &[("<prefix>", &change.new_prefix)])
        }
        Ok(change) => fill(
            &messages.prefix_changed,
            &[
                ("<oldPrefix>", &change.old_prefix),
                ("<newPrefix>", &change.new_prefix),
            ],
        ),
        Err(err) => prefix_error_reply(ctx, prefix, &err),
    }
}

fn prefix_error_reply(ctx: &AppContext, prefix: &str, err: &PrefixError) -> String {
    let messages = ctx.messages();
    let template = match err {
        PrefixError::NotAllowedInDm => &messages.prefix_dm_error,
        PrefixError::TooManyArguments => &messages.too_many_args_error,
        PrefixError::InvalidLength => &messages.prefix_length_error,
        PrefixError::InvalidCategory => &messages.prefix_type_error,
        PrefixError::PersistenceFailure(_) => &messages.generic_error,
    };
    fill(template, &[("<prefix>", prefix)])
}

fn parse_error_reply(ctx: &AppContext, routed: &RoutedEvent, err: &ParseError) -> String {
    let messages = ctx.messages();
    let prefix = routed.prefix.as_str();
    match err {
        ParseError::TooManyArguments => fill(&messages.too_many_args_error, &[("<prefix>", prefix)]),
        ParseError::UnknownArgument(argument) => fill(
            &messages.unknown_arg_error,
            &[("<prefix>", prefix), ("<argument>", argument)],
        ),
        ParseError::SizeOutOfRange => fill(&messages.size_error, &[("<prefix>", prefix)]),
        ParseError::NumberFormat(text) => {
            error!(message_id = routed.event.message_id, text = %text, "maze size did not parse");
            fill(&messages.generic_error, &[("<prefix>", prefix)])
        }
    }
}

/// Sends one reply, logging on failure. Returns whether it was delivered.
async fn send_reply(ctx: &AppContext, event: &InboundEvent, content: &str) -> bool {
    match ctx.gateway.reply(event, content).await {
        Ok(()) => true,
        Err(err) => {
            warn!(
                message_id = event.message_id,
                channel_id = event.channel_id,
                error = %err,
                "failed to send reply"
            );
            false
        }
    }
}

/// Wraps a rendered maze in `maze` code blocks, starting a new message on a
/// line boundary whenever the next line would overflow [`MESSAGE_LIMIT`].
pub fn maze_messages(rendered: &str) -> Vec<String> {
    let budget = MESSAGE_LIMIT - MAZE_BLOCK_OPEN.len() - MAZE_BLOCK_CLOSE.len();
    let mut messages = Vec::new();
    let mut body = String::new();
    let mut body_chars = 0;

    for line in rendered.split_inclusive('\n') {
        let line_chars = line.chars().count();
        if body_chars + line_chars > budget && !body.is_empty() {
            messages.push(format!("{MAZE_BLOCK_OPEN}{body}{MAZE_BLOCK_CLOSE}"));
            body.clear();
            body_chars = 0;
        }
        body.push_str(line);
        body_chars += line_chars;
    }

    if !body.is_empty() || messages.is_empty() {
        messages.push(format!("{MAZE_BLOCK_OPEN}{body}{MAZE_BLOCK_CLOSE}"));
    }
    messages
}
