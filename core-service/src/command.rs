//! Chat command surface.

use crate::error::{CoreError, Result};
use std::num::{IntErrorKind, ParseIntError};

/// A command invoked from a chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Resolve `reference` and append it to the channel's queue.
    Play { reference: String },
    /// Render the current track and the pending queue.
    List,
    Skip,
    Pause,
    Resume,
    /// Remove a queued track. `argument` is kept raw; it is parsed as a
    /// 1-based position when the command runs.
    Remove { argument: String },
}

impl ChatCommand {
    /// Parse a command name and its whitespace-split arguments.
    ///
    /// Names are matched case-insensitively. `enqueue` is accepted for
    /// `play`, and `playlist`/`queue` for `list`. Extra arguments are ignored.
    pub fn parse(name: &str, args: &[&str]) -> Result<Self> {
        let name = name.trim().to_ascii_lowercase();
        let first = args.iter().map(|arg| arg.trim()).find(|arg| !arg.is_empty());

        let command = match name.as_str() {
            "play" | "enqueue" => ChatCommand::Play {
                reference: required(&name, first)?,
            },
            "list" | "playlist" | "queue" => ChatCommand::List,
            "skip" => ChatCommand::Skip,
            "pause" => ChatCommand::Pause,
            "resume" => ChatCommand::Resume,
            "remove" => ChatCommand::Remove {
                argument: required(&name, first)?,
            },
            _ => return Err(CoreError::UnknownCommand(name)),
        };
        Ok(command)
    }

    /// Canonical command name.
    pub fn name(&self) -> &'static str {
        match self {
            ChatCommand::Play { .. } => "play",
            ChatCommand::List => "list",
            ChatCommand::Skip => "skip",
            ChatCommand::Pause => "pause",
            ChatCommand::Resume => "resume",
            ChatCommand::Remove { .. } => "remove",
        }
    }
}

fn required(command: &str, argument: Option<&str>) -> Result<String> {
    argument
        .map(str::to_string)
        .ok_or_else(|| CoreError::MissingArgument {
            command: command.to_string(),
        })
}

/// Parse a `remove` argument into a 0-based queue index.
///
/// Returns `Err` for anything that is not an integer and `Ok(None)` for
/// integers that can never name a queue position (zero, negatives and
/// integers too large to parse).
pub(crate) fn queue_index(argument: &str) -> std::result::Result<Option<usize>, ParseIntError> {
    match argument.trim().parse::<i64>() {
        Ok(position) => Ok(usize::try_from(position).ok().and_then(|p| p.checked_sub(1))),
        Err(err) if matches!(err.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
