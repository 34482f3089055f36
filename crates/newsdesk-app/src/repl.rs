//! Line commands understood by the chat prompt.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Anything that is not a slash command is a question.
    Ask(String),
    NewSession,
    ClearSession,
    Memory(bool),
    Status,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub const HELP: &str = "\
Commands:
  /new            start a new session (clears the transcript)
  /clear          clear the server-side memory for this session
  /memory on|off  toggle conversation memory
  /status         show session and backend status
  /quit           leave";

pub fn parse(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    if !line.starts_with('/') {
        return ReplCommand::Ask(line.to_string());
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["/new"] => ReplCommand::NewSession,
        ["/clear"] => ReplCommand::ClearSession,
        ["/memory", "on"] => ReplCommand::Memory(true),
        ["/memory", "off"] => ReplCommand::Memory(false),
        ["/status"] => ReplCommand::Status,
        ["/help"] => ReplCommand::Help,
        ["/quit" | "/exit"] => ReplCommand::Quit,
        _ => ReplCommand::Unknown(line.to_string()),
    }
}
