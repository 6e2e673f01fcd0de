//! Chat command parsing.

/// A recognised slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// `/task <text>`; the text may be empty.
    Task(String),
    List,
    Clear,
}

impl Command {
    /// Parse a message text.
    ///
    /// Accepts `/cmd@botname` when `bot_username` matches (or is unknown).
    /// Returns `None` for plain text, unknown commands, or commands
    /// addressed to another bot.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let text = text.trim_start();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.find(char::is_whitespace) {
            Some(idx) => (&rest[..idx], rest[idx..].trim()),
            None => (rest, ""),
        };

        let name = match head.split_once('@') {
            Some((name, target)) => {
                if let Some(me) = bot_username {
                    if !target.eq_ignore_ascii_case(me.trim_start_matches('@')) {
                        return None;
                    }
                }
                name
            }
            None => head,
        };

        match name.to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "task" | "gorev" | "görev" => Some(Self::Task(args.to_string())),
            "list" => Some(Self::List),
            "clear" => Some(Self::Clear),
            _ => None,
        }
    }
}
