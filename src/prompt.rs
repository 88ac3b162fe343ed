//! Line-based console prompts used before the UI starts.

use crate::error::{Result, ShortlistError};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartChoice {
    Resume,
    New,
}

/// Asks questions on `output` and reads answers from `input`
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    #[cfg(test)]
    pub(crate) fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }

    pub fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{} ", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(ShortlistError::Prompt("input closed".to_string()));
        }
        Ok(line.trim().to_string())
    }

    /// Offers to resume the saved session; re-asks until the answer is 1 or 2
    pub fn choose_start(&mut self, saved_root: &Path) -> Result<StartChoice> {
        self.say(&format!("A saved session exists for {}", saved_root.display()))?;
        loop {
            self.say("1. Resume last operation")?;
            self.say("2. Start new operation")?;
            match self.ask("Choose 1 or 2:")?.as_str() {
                "1" => return Ok(StartChoice::Resume),
                "2" => return Ok(StartChoice::New),
                other => self.say(&format!("Invalid choice '{}'", other))?,
            }
        }
    }

    /// Asks for an existing directory of images
    pub fn ask_images_dir(&mut self) -> Result<PathBuf> {
        loop {
            let answer = self.ask("Enter path to images directory:")?;
            if answer.is_empty() {
                continue;
            }
            let path = expand_tilde(&answer);
            if path.is_dir() {
                return Ok(path);
            }
            self.say(&format!("Not a directory: {}", path.display()))?;
        }
    }

    /// Asks for the output directory; it is created later if missing
    pub fn ask_output_dir(&mut self) -> Result<PathBuf> {
        loop {
            let answer = self.ask("Enter path to shortlist output directory:")?;
            if answer.is_empty() {
                continue;
            }
            let path = expand_tilde(&answer);
            if path.exists() && !path.is_dir() {
                self.say(&format!("Not a directory: {}", path.display()))?;
                continue;
            }
            return Ok(path);
        }
    }
}

/// Expands a leading `~` to the home directory
pub fn expand_tilde(input: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (input, home) {
        ("~", Some(home)) => home,
        (s, Some(home)) if s.starts_with("~/") => home.join(&s[2..]),
        (s, _) => PathBuf::from(s),
    }
}
