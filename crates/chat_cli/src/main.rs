use std::io::{self, BufRead, Write};

use chat_cli::config::{config_path_from_env, AppConfig};
use chat_cli::logging::init_tracing;
use chat_cli::repl::{Repl, PROMPT};

fn main() -> io::Result<()> {
    init_tracing();

    let config_path = config_path_from_env();
    let mut config = AppConfig::load(&config_path).map_err(io::Error::other)?;
    config.apply_env_overrides(|key| std::env::var(key).ok());

    let mut repl = Repl::from_config(config, &config_path).map_err(io::Error::other)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", repl.banner())?;

    let mut lines = stdin.lock().lines();
    while !repl.should_exit() {
        write!(stdout, "{PROMPT}")?;
        stdout.flush()?;

        let Some(line) = lines.next() else {
            // EOF behaves like /quit so exit-time saves still happen.
            let output = repl.handle_line("/quit");
            writeln!(stdout)?;
            writeln!(stdout, "{output}")?;
            break;
        };

        let output = repl.handle_line(&line?);
        if !output.is_empty() {
            writeln!(stdout, "{output}")?;
        }
    }

    Ok(())
}
