//! Line-oriented chat loop state. Every call returns the text to print.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chat_provider::ChatProvider;
use history_store::{HistoryStore, SaveOutcome};
use termchat::{ChatError, InstructionSet, SessionController, GREETING, NEW_CONVERSATION_ID};
use time::OffsetDateTime;

use crate::commands::{parse_input, Input, COMMAND_TABLE};
use crate::config::{config_base_dir, AppConfig, PathsConfig};
use crate::error::CliError;
use crate::output::save_text;
use crate::providers::provider_for_config;
use crate::render::{format_reply, DEFAULT_WRAP_WIDTH};

pub const PROMPT: &str = "> ";

pub struct Repl {
    controller: SessionController,
    config: AppConfig,
    config_path: PathBuf,
    paths: PathsConfig,
    last_reply: Option<String>,
    should_exit: bool,
    wrap_width: usize,
}

impl Repl {
    /// Builds the provider named in `config` and starts a session.
    pub fn from_config(config: AppConfig, config_path: &Path) -> Result<Self, CliError> {
        let provider = provider_for_config(&config).map_err(CliError::Invalid)?;
        Self::with_provider(config, config_path, provider)
    }

    pub fn with_provider(
        config: AppConfig,
        config_path: &Path,
        provider: Arc<dyn ChatProvider>,
    ) -> Result<Self, CliError> {
        config.validate()?;
        let paths = config.paths.resolve(&config_base_dir(config_path));
        let instructions = load_instructions(&paths.instructions)?;
        let store = HistoryStore::new(paths.history.clone());

        let controller =
            SessionController::start(config.session_config(), provider, instructions, store)?;
        let profile = controller.provider_profile();
        tracing::info!(
            provider = %profile.provider_id,
            model = %profile.model_id,
            instruction = %controller.instruction_name(),
            "session started"
        );

        Ok(Self {
            controller,
            config,
            config_path: config_path.to_path_buf(),
            paths,
            last_reply: None,
            should_exit: false,
            wrap_width: DEFAULT_WRAP_WIDTH,
        })
    }

    #[must_use]
    pub fn with_wrap_width(mut self, wrap_width: usize) -> Self {
        self.wrap_width = wrap_width;
        self
    }

    /// Banner printed before the first prompt.
    #[must_use]
    pub fn banner(&self) -> String {
        let profile = self.controller.provider_profile();
        format!(
            "termchat ({} / {}, bot: {}). Type /commands for help.\n{GREETING}",
            profile.provider_id,
            profile.model_id,
            self.controller.instruction_name()
        )
    }

    /// Handles one input line. Failures are rendered with an `error:` prefix.
    pub fn handle_line(&mut self, line: &str) -> String {
        let result = match parse_input(line) {
            Input::Empty => Ok(String::new()),
            Input::Chat(question) => self.chat(&question),
            Input::Command { spec, args } => (spec.handler)(self, &args),
            Input::Unknown(name) => Err(CliError::Invalid(format!(
                "unrecognized command {name}; type /commands for a list"
            ))),
        };

        match result {
            Ok(output) => output,
            Err(error) => format!("error: {error}"),
        }
    }

    #[must_use]
    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    #[must_use]
    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn last_reply(&self) -> Option<&str> {
        self.last_reply.as_deref()
    }

    fn chat(&mut self, question: &str) -> Result<String, CliError> {
        let answer = self.controller.chat(question, self.config.history_size)?;
        let rendered = format_reply(&answer, self.wrap_width);
        self.last_reply = Some(answer);
        Ok(rendered)
    }

    pub(crate) fn show_commands(&mut self, _args: &[String]) -> Result<String, CliError> {
        let lines: Vec<String> = COMMAND_TABLE
            .iter()
            .map(|spec| {
                let aliases = spec
                    .aliases
                    .iter()
                    .map(|alias| format!("/{alias}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{:<28} {} ({aliases})", spec.usage, spec.summary)
            })
            .collect();
        Ok(lines.join("\n"))
    }

    pub(crate) fn configure(&mut self, args: &[String]) -> Result<String, CliError> {
        for arg in args {
            let (key, value) = arg
                .split_once('=')
                .ok_or(CliError::Usage("/config [key=value ...]"))?;
            self.set_config_value(key.trim(), value.trim())?;
        }

        Ok(self.config.to_pretty_json()?)
    }

    fn set_config_value(&mut self, key: &str, value: &str) -> Result<(), CliError> {
        match key {
            "history_size" => self.config.history_size = parse_history_size(value)?,
            "instruction" | "bot" => {
                self.controller.select_instruction(value)?;
                self.config.instruction = value.to_string();
            }
            "save_history_on_exit" => self.config.save_history_on_exit = parse_bool(key, value)?,
            "save_config_on_exit" => self.config.save_config_on_exit = parse_bool(key, value)?,
            "provider" | "model" => {
                let mut candidate = self.config.clone();
                if key == "provider" {
                    candidate.provider = value.to_string();
                } else {
                    candidate.model = value.to_string();
                }
                let provider = provider_for_config(&candidate).map_err(CliError::Invalid)?;
                self.controller.set_provider(provider);
                self.config = candidate;
            }
            "auto_save" | "keep_new_conversation" | "request_timeout_sec" | "paths" => {
                return Err(CliError::Invalid(format!(
                    "'{key}' can only be changed in {}",
                    self.config_path.display()
                )));
            }
            unknown => {
                return Err(CliError::Invalid(format!("unknown config key '{unknown}'")));
            }
        }
        tracing::debug!(key, value, "config updated");
        Ok(())
    }

    pub(crate) fn save_reply(&mut self, args: &[String]) -> Result<String, CliError> {
        let reply = self
            .last_reply
            .as_deref()
            .ok_or_else(|| CliError::Invalid("no reply to save yet".to_string()))?;
        let path = save_text(&self.paths.saved, args.first().map(String::as_str), reply)?;
        Ok(format!("saved to {}", path.display()))
    }

    pub(crate) fn show_history(&mut self, args: &[String]) -> Result<String, CliError> {
        let messages = self.controller.active_messages()?;
        let indexes: Vec<usize> = if args.is_empty() {
            (0..messages.len()).collect()
        } else {
            args.iter()
                .map(|arg| resolve_index(arg, messages.len()))
                .collect::<Result<Vec<_>, _>>()?
        };

        let lines: Vec<String> = indexes
            .iter()
            .map(|&index| {
                let message = &messages[index];
                format!("history[{index}] {}: {}", message.role, message.content)
            })
            .collect();

        if let Some(&last) = indexes.last() {
            self.last_reply = Some(messages[last].content.clone());
        }
        Ok(lines.join("\n"))
    }

    /// Saves the active conversation, or a copy of it under `name` when one is given.
    pub(crate) fn save_history(&mut self, args: &[String]) -> Result<String, CliError> {
        let active = self
            .controller
            .active_id()
            .ok_or(ChatError::NoActiveConversation)?;
        let target = if args.is_empty() {
            active.clone()
        } else {
            history_name(&args.join(" ")).to_string()
        };

        let outcome = if target == active {
            self.controller.save_active()?
        } else {
            if target == NEW_CONVERSATION_ID || self.controller.conversation(&target).is_ok() {
                return Err(CliError::Invalid(format!(
                    "'{target}' is already used by another conversation"
                )));
            }
            let messages = self.controller.active_messages()?;
            self.controller
                .store()
                .save(&target, &messages)
                .map_err(ChatError::from)?
        };

        match outcome {
            SaveOutcome::Written => {
                let path = self
                    .controller
                    .store()
                    .path_for(&target)
                    .map_err(ChatError::from)?;
                Ok(format!("saved '{target}' to {}", path.display()))
            }
            SaveOutcome::SkippedEmpty => Ok(format!("'{target}' has no messages to save")),
        }
    }

    pub(crate) fn new_conversation(&mut self, _args: &[String]) -> Result<String, CliError> {
        self.controller.new_conversation()?;
        self.last_reply = None;
        Ok(GREETING.to_string())
    }

    pub(crate) fn list_conversations(&mut self, _args: &[String]) -> Result<String, CliError> {
        let mut lines = Vec::new();
        let mut current_label: Option<String> = None;

        for entry in self.controller.history_picker(OffsetDateTime::now_utc()) {
            if let Some(label) = entry.separator {
                if current_label.as_deref() != Some(label.as_str()) {
                    lines.push(format!("-- {label} --"));
                    current_label = Some(label);
                }
            }

            let marker = if entry.active { "*" } else { " " };
            if entry.id == NEW_CONVERSATION_ID {
                lines.push(format!("{marker} {} (new conversation)", entry.id));
            } else {
                lines.push(format!("{marker} {}", entry.id));
            }
        }

        Ok(lines.join("\n"))
    }

    pub(crate) fn switch_conversation(&mut self, args: &[String]) -> Result<String, CliError> {
        let id = conversation_id_arg(args, "/switch <conversation>")?;
        self.controller.switch_active(&id)?;
        Ok(format!("switched to '{id}'"))
    }

    pub(crate) fn delete_conversation(&mut self, args: &[String]) -> Result<String, CliError> {
        let id = conversation_id_arg(args, "/delete <conversation>")?;
        let was_active = self.controller.active_id().as_deref() == Some(id.as_str());

        self.controller.delete_conversation(&id)?;
        if was_active {
            self.controller.new_conversation()?;
            return Ok(format!("deleted '{id}'; started a new conversation"));
        }
        Ok(format!("deleted '{id}'"))
    }

    pub(crate) fn bot(&mut self, args: &[String]) -> Result<String, CliError> {
        let Some(name) = args.first() else {
            let current = self.controller.instruction_name();
            let lines: Vec<String> = self
                .controller
                .instructions()
                .names()
                .map(|name| {
                    let marker = if name == current { "*" } else { " " };
                    format!("{marker} {name}")
                })
                .collect();
            return Ok(lines.join("\n"));
        };

        self.controller.select_instruction(name)?;
        self.config.instruction = name.clone();
        Ok(format!("bot set to '{name}'"))
    }

    pub(crate) fn quit(&mut self, _args: &[String]) -> Result<String, CliError> {
        self.should_exit = true;
        let mut lines = Vec::new();

        if self.config.save_history_on_exit {
            match self.controller.active_id() {
                Some(id) if id != NEW_CONVERSATION_ID => {
                    if self.controller.save_active()? == SaveOutcome::Written {
                        lines.push(format!("saved '{id}'"));
                    }
                }
                _ => {}
            }
        }

        if self.config.save_config_on_exit {
            self.config.save(&self.config_path)?;
            lines.push(format!("saved config to {}", self.config_path.display()));
        }

        lines.push("bye".to_string());
        Ok(lines.join("\n"))
    }
}

/// Loads instructions from `dir`, or only the built-in default when `dir` does not exist.
pub fn load_instructions(dir: &Path) -> Result<InstructionSet, CliError> {
    if !dir.exists() {
        tracing::info!(dir = %dir.display(), "instruction directory not found; using built-in default");
        return Ok(InstructionSet::with_default());
    }
    Ok(InstructionSet::load_dir(dir)?)
}

fn conversation_id_arg(args: &[String], usage: &'static str) -> Result<String, CliError> {
    let id = args.join(" ");
    if id.is_empty() {
        return Err(CliError::Usage(usage));
    }
    Ok(id)
}

/// Accepts `name` or `name.json`.
fn history_name(name: &str) -> &str {
    name.strip_suffix(".json").unwrap_or(name)
}

/// Python-style index: negative values count from the end.
fn resolve_index(arg: &str, len: usize) -> Result<usize, CliError> {
    let index: i64 = arg
        .parse()
        .map_err(|_| CliError::Invalid(format!("'{arg}' is not a message index")))?;
    let len_i64 = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if index < 0 { len_i64 + index } else { index };

    if (0..len_i64).contains(&resolved) {
        usize::try_from(resolved)
            .map_err(|_| CliError::Invalid(format!("index {index} out of range")))
    } else {
        Err(CliError::Invalid(format!(
            "index {index} out of range for {len} messages"
        )))
    }
}

fn parse_history_size(value: &str) -> Result<Option<usize>, CliError> {
    match value {
        "none" | "null" | "all" => Ok(None),
        _ => value.parse().map(Some).map_err(|_| {
            CliError::Invalid(format!(
                "history_size must be a non-negative number or 'none', got '{value}'"
            ))
        }),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, CliError> {
    match value {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(CliError::Invalid(format!(
            "{key} must be true or false, got '{value}'"
        ))),
    }
}
