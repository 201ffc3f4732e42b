//! Saving single replies to numbered text files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CliError;

const OUTPUT_PREFIX: &str = "output_";
const OUTPUT_EXTENSION: &str = "txt";

/// Next free `output_NNN.txt` name in `dir`, one past the highest existing number.
pub fn next_output_name(dir: &Path) -> Result<String, CliError> {
    let highest = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().to_str().and_then(output_number))
            .max()
            .unwrap_or(0),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => 0,
        Err(error) => return Err(CliError::io("reading saved directory", dir, error)),
    };

    Ok(format!(
        "{OUTPUT_PREFIX}{:03}.{OUTPUT_EXTENSION}",
        highest.saturating_add(1)
    ))
}

/// Writes `text` to `dir/file_name`, or to the next numbered file when no name is given.
pub fn save_text(dir: &Path, file_name: Option<&str>, text: &str) -> Result<PathBuf, CliError> {
    let file_name = match file_name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => validate_file_name(name)?.to_string(),
        None => next_output_name(dir)?,
    };

    fs::create_dir_all(dir).map_err(|error| CliError::io("creating saved directory", dir, error))?;
    let path = dir.join(file_name);
    fs::write(&path, text).map_err(|error| CliError::io("writing saved reply", &path, error))?;
    tracing::debug!(path = %path.display(), "saved reply");
    Ok(path)
}

fn output_number(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix(OUTPUT_PREFIX)?
        .split('.')
        .next()?
        .parse()
        .ok()
}

fn validate_file_name(name: &str) -> Result<&str, CliError> {
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(CliError::Invalid(format!(
            "'{name}' is not a plain file name"
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_starts_at_one_and_follows_highest() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        assert_eq!(next_output_name(dir.path()).expect("name"), "output_001.txt");

        fs::write(dir.path().join("output_007.txt"), "x").expect("write output");
        fs::write(dir.path().join("output_002.txt"), "x").expect("write output");
        fs::write(dir.path().join("output_abc.txt"), "x").expect("write output");
        fs::write(dir.path().join("notes.txt"), "x").expect("write notes");

        assert_eq!(next_output_name(dir.path()).expect("name"), "output_008.txt");
    }

    #[test]
    fn missing_directory_is_created_on_save() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let saved = dir.path().join("saved");

        let path = save_text(&saved, None, "hello").expect("save should succeed");

        assert_eq!(path, saved.join("output_001.txt"));
        assert_eq!(fs::read_to_string(path).expect("read saved"), "hello");
    }

    #[test]
    fn explicit_names_are_used_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = save_text(dir.path(), Some("answer.md"), "# hi").expect("save should succeed");
        assert_eq!(path, dir.path().join("answer.md"));

        let error = save_text(dir.path(), Some("../escape.txt"), "x").expect_err("path must fail");
        assert!(matches!(error, CliError::Invalid(_)));
    }
}
