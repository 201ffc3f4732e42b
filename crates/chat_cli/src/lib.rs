//! Console front end for the `termchat` conversation engine.
//!
//! ## Provider bootstrap
//!
//! The provider is chosen by the `provider` config key, overridden by
//! `TERMCHAT_PROVIDER`:
//!
//! - `mock` for deterministic local runs (no API tokens are spent)
//! - `openai` for the chat completions API; requires `OPENAI_API_KEY`,
//!   and `OPENAI_BASE_URL` optionally points at a compatible endpoint
//!
//! ## Config file
//!
//! `TERMCHAT_CONFIG_PATH` (default `./termchat.json`) names a JSON file such as:
//!
//! ```json
//! {
//!   "provider": "openai",
//!   "model": "gpt-3.5-turbo",
//!   "instruction": "default",
//!   "history_size": 10,
//!   "paths": { "instructions": "bots", "history": "history", "saved": "saved" }
//! }
//! ```
//!
//! Every key is optional, unknown keys are rejected, and relative paths resolve
//! against the config file's directory. A missing file means all defaults.
//!
//! ## Logging
//!
//! `TERMCHAT_LOG` takes an `EnvFilter` directive; logs are written to stderr.

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod providers;
pub mod render;
pub mod repl;

pub use error::CliError;
pub use repl::Repl;
