use crate::error::{ApolloError, Result};
use crossterm::style::{Color, Stylize};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Success => "SUCCESS",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }

    fn color(self) -> Color {
        match self {
            Level::Success => Color::Green,
            Level::Info => Color::Cyan,
            Level::Warning => Color::Yellow,
            Level::Error => Color::Red,
        }
    }
}

pub fn msg(level: Level, text: impl AsRef<str>) {
    let line = format!("[{}] {}", level.label(), text.as_ref());
    println!("{}", line.with(level.color()));
}

pub fn success(text: impl AsRef<str>) {
    msg(Level::Success, text)
}

pub fn info(text: impl AsRef<str>) {
    msg(Level::Info, text)
}

pub fn warning(text: impl AsRef<str>) {
    msg(Level::Warning, text)
}

pub fn error(text: impl AsRef<str>) {
    msg(Level::Error, text)
}

pub fn heading(text: impl AsRef<str>) {
    println!("{}", text.as_ref().bold());
}

pub fn glyph(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

/// Line-oriented prompts for the interactive commands.
pub struct Prompter {
    editor: DefaultEditor,
}

impl Prompter {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new()
            .map_err(|e| ApolloError::tool_failure("terminal", e.to_string()))?;
        Ok(Self { editor })
    }

    /// Read one trimmed line. Ctrl-C and Ctrl-D become `Interrupted`.
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(line.trim().to_string()),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                Err(ApolloError::Interrupted)
            }
            Err(e) => Err(ApolloError::tool_failure("terminal", e.to_string())),
        }
    }

    /// `[y/N]` question; only `y`/`Y` confirms.
    pub fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Ok(is_yes(&self.ask(&format!("{prompt} [y/N]: "))?))
    }
}

pub fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Cut to `max` characters, never splitting a code point.
pub fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_y_confirms() {
        assert!(is_yes("y"));
        assert!(is_yes(" Y "));
        assert!(!is_yes("yes"));
        assert!(!is_yes("n"));
        assert!(!is_yes(""));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 3), "hel");
        assert_eq!(truncate("Добавлено", 3), "Доб");
    }
}
