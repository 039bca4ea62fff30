//! Commands typed on stdin while attached to the sessions.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachCommand {
    Reset,
    List,
    Send { name: String, command: String },
    /// Probe installed shells again and list them
    Shells,
    Quit,
    Help,
    /// Anything that is not a recognised `:` command
    Unknown(String),
}

pub fn parse_command(line: &str) -> Option<AttachCommand> {
    let line = line.trim();
    let rest = line.strip_prefix(':')?;
    let (verb, args) = match rest.split_once(char::is_whitespace) {
        Some((verb, args)) => (verb, args.trim()),
        None => (rest, ""),
    };

    let command = match verb {
        "reset" => AttachCommand::Reset,
        "list" | "ls" => AttachCommand::List,
        "shells" => AttachCommand::Shells,
        "quit" | "q" => AttachCommand::Quit,
        "help" | "h" => AttachCommand::Help,
        "send" => match args.split_once(char::is_whitespace) {
            Some((name, command)) if !command.trim().is_empty() => AttachCommand::Send {
                name: name.to_string(),
                command: command.trim().to_string(),
            },
            _ => AttachCommand::Unknown(line.to_string()),
        },
        _ => AttachCommand::Unknown(line.to_string()),
    };
    Some(command)
}

/// Answer to the reset prompt: y, n, or a (yes, and don't ask again)
pub fn parse_answer(line: &str) -> crate::orchestrator::Confirmation {
    use crate::orchestrator::Confirmation;

    match line.trim().to_lowercase().as_str() {
        "y" | "yes" => Confirmation::yes(),
        "a" | "always" => Confirmation::always(),
        _ => Confirmation::no(),
    }
}

pub const HELP: &str = ":reset              close all terminals and reopen the startup terminals
:list               show open sessions
:send <name> <cmd>  type a command into a session
:shells             detect installed shells again
:quit               stop every session and exit";
