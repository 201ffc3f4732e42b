use std::fmt;

use crate::error::CliError;
use crate::repl::Repl;

/// Handler invoked with the whitespace-separated arguments after the command name.
pub type CommandHandler = fn(&mut Repl, &[String]) -> Result<String, CliError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Commands,
    Config,
    Save,
    History,
    SaveHistory,
    New,
    List,
    Switch,
    Delete,
    Bot,
    Quit,
}

pub struct CommandSpec {
    pub command: Command,
    /// Accepted names without the leading slash.
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub summary: &'static str,
    pub handler: CommandHandler,
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("command", &self.command)
            .field("aliases", &self.aliases)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

pub static COMMAND_TABLE: &[CommandSpec] = &[
    CommandSpec {
        command: Command::Commands,
        aliases: &["commands", "c", "help"],
        usage: "/commands",
        summary: "list available commands",
        handler: Repl::show_commands,
    },
    CommandSpec {
        command: Command::Config,
        aliases: &["config", "cfg"],
        usage: "/config [key=value ...]",
        summary: "show the config or change a setting",
        handler: Repl::configure,
    },
    CommandSpec {
        command: Command::Save,
        aliases: &["save", "s"],
        usage: "/save [file]",
        summary: "save the last printed reply",
        handler: Repl::save_reply,
    },
    CommandSpec {
        command: Command::History,
        aliases: &["history", "hs"],
        usage: "/history [index ...]",
        summary: "print messages of the active conversation",
        handler: Repl::show_history,
    },
    CommandSpec {
        command: Command::SaveHistory,
        aliases: &["save_history", "save_hs"],
        usage: "/save_history [name]",
        summary: "save the active conversation, or a copy under name",
        handler: Repl::save_history,
    },
    CommandSpec {
        command: Command::New,
        aliases: &["new", "clear_history", "clear_hs"],
        usage: "/new",
        summary: "start a new conversation",
        handler: Repl::new_conversation,
    },
    CommandSpec {
        command: Command::List,
        aliases: &["list", "ls"],
        usage: "/list",
        summary: "list conversations, newest first",
        handler: Repl::list_conversations,
    },
    CommandSpec {
        command: Command::Switch,
        aliases: &["switch", "sw"],
        usage: "/switch <conversation>",
        summary: "make another conversation active",
        handler: Repl::switch_conversation,
    },
    CommandSpec {
        command: Command::Delete,
        aliases: &["delete", "rm"],
        usage: "/delete <conversation>",
        summary: "delete a conversation and its saved file",
        handler: Repl::delete_conversation,
    },
    CommandSpec {
        command: Command::Bot,
        aliases: &["bot"],
        usage: "/bot [name]",
        summary: "list instructions or select one",
        handler: Repl::bot,
    },
    CommandSpec {
        command: Command::Quit,
        aliases: &["quit", "q", "exit"],
        usage: "/quit",
        summary: "save per config and exit",
        handler: Repl::quit,
    },
];

/// Looks up a command by any of its aliases, with or without the leading slash.
#[must_use]
pub fn resolve(name: &str) -> Option<&'static CommandSpec> {
    let name = name.strip_prefix('/').unwrap_or(name);
    COMMAND_TABLE
        .iter()
        .find(|spec| spec.aliases.iter().any(|alias| *alias == name))
}

#[derive(Debug)]
pub enum Input {
    Empty,
    Chat(String),
    Command {
        spec: &'static CommandSpec,
        args: Vec<String>,
    },
    Unknown(String),
}

pub fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    if !trimmed.starts_with('/') {
        return Input::Chat(trimmed.to_string());
    }

    let mut parts = trimmed.split_whitespace();
    let name = parts.next().unwrap_or(trimmed);
    let args = parts.map(str::to_string).collect();

    match resolve(name) {
        Some(spec) => Input::Command { spec, args },
        None => Input::Unknown(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_has_exactly_one_spec() {
        let all = [
            Command::Commands,
            Command::Config,
            Command::Save,
            Command::History,
            Command::SaveHistory,
            Command::New,
            Command::List,
            Command::Switch,
            Command::Delete,
            Command::Bot,
            Command::Quit,
        ];
        for command in all {
            let count = COMMAND_TABLE
                .iter()
                .filter(|spec| spec.command == command)
                .count();
            assert_eq!(count, 1, "{command:?}");
        }
        assert_eq!(COMMAND_TABLE.len(), all.len());
    }

    #[test]
    fn aliases_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for alias in COMMAND_TABLE.iter().flat_map(|spec| spec.aliases.iter()) {
            assert!(seen.insert(*alias), "duplicate alias {alias}");
        }
    }

    #[test]
    fn aliases_resolve_to_the_same_command() {
        for (alias, command) in [
            ("/c", Command::Commands),
            ("/help", Command::Commands),
            ("/cfg", Command::Config),
            ("/s", Command::Save),
            ("/hs", Command::History),
            ("/save_hs", Command::SaveHistory),
            ("/clear_hs", Command::New),
            ("/ls", Command::List),
            ("/sw", Command::Switch),
            ("/rm", Command::Delete),
            ("/exit", Command::Quit),
        ] {
            let spec = resolve(alias).expect("alias should resolve");
            assert_eq!(spec.command, command, "{alias}");
        }
    }

    #[test]
    fn parse_input_splits_command_arguments() {
        match parse_input("  /history 0 -1 ") {
            Input::Command { spec, args } => {
                assert_eq!(spec.command, Command::History);
                assert_eq!(args, vec!["0", "-1"]);
            }
            other => panic!("unexpected input: {other:?}"),
        }
    }

    #[test]
    fn parse_input_classifies_chat_empty_and_unknown() {
        assert!(matches!(parse_input("   "), Input::Empty));
        assert!(matches!(parse_input(" hello /c "), Input::Chat(text) if text == "hello /c"));
        assert!(matches!(parse_input("/nope arg"), Input::Unknown(name) if name == "/nope"));
    }
}
