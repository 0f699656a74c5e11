//! Inline `[Command]` lines: recognition and presentation effects.

use crate::ctx::Ctx;
use crate::event::OutputEvent;

/// A parsed command line. `Unknown` keeps the raw inner text so it can be
/// logged and recorded in the command history like any other command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ShowPlayer,
    HidePlayer,
    ShowCg(String),
    HideCg,
    GoTo(String),
    PlayMusic(String),
    StopMusic,
    Unknown(String),
}

/// What the traversal loop should do after a command ran.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandEffect {
    Continue,
    EnterNode(String),
}

impl Command {
    /// Recognizes a whole-line `[Name]` or `[Name=Arg]` form. Anything else
    /// is not a command and stays a content line.
    pub fn parse(line: &str) -> Option<Command> {
        let inner = line.strip_prefix('[')?.strip_suffix(']')?;
        let (name, arg) = match inner.split_once('=') {
            Some((name, arg)) => (name.trim(), Some(arg.trim())),
            None => (inner.trim(), None),
        };

        let cmd = match (name, arg) {
            ("ShowPlayer", None) => Command::ShowPlayer,
            ("HidePlayer", None) => Command::HidePlayer,
            ("CG", Some(arg)) => Command::ShowCg(arg.to_string()),
            ("HideCG", None) => Command::HideCg,
            ("GoTo", Some(arg)) => Command::GoTo(arg.to_string()),
            ("Music", Some(arg)) => Command::PlayMusic(arg.to_string()),
            ("StopMusic", None) => Command::StopMusic,
            _ => Command::Unknown(inner.to_string()),
        };
        Some(cmd)
    }
}

/// Applies a command's presentation effects to the ctx and queues the
/// matching event. During history replay `GoTo` is inert: the node stack is
/// restored from the snapshot, not by re-entering nodes.
pub(crate) fn dispatch(ctx: &mut Ctx, cmd: &Command, replay: bool) -> CommandEffect {
    match cmd {
        Command::ShowPlayer => {
            ctx.player_visible = true;
            ctx.push(OutputEvent::ShowPlayer);
        }
        Command::HidePlayer => {
            ctx.player_visible = false;
            ctx.push(OutputEvent::HidePlayer);
        }
        Command::ShowCg(name) => {
            ctx.current_cg = Some(name.clone());
            ctx.push(OutputEvent::ShowCg { name: name.clone() });
        }
        Command::HideCg => {
            ctx.current_cg = None;
            ctx.push(OutputEvent::HideCg);
        }
        Command::PlayMusic(name) => {
            ctx.current_music = Some(name.clone());
            ctx.push(OutputEvent::PlayMusic { name: name.clone() });
        }
        Command::StopMusic => {
            ctx.current_music = None;
            ctx.push(OutputEvent::StopMusic);
        }
        Command::GoTo(target) => {
            if replay {
                log::debug!("replay: skipping GoTo '{}'", target);
            } else {
                return CommandEffect::EnterNode(target.clone());
            }
        }
        Command::Unknown(raw) => {
            log::debug!("unknown command [{}] skipped", raw);
        }
    }
    CommandEffect::Continue
}
