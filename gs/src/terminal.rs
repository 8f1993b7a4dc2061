//! Terminal input/output for the conversation

use std::io;

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

/// Where questions go and answers come from
pub trait UserIo {
    /// Show `question` and read one line; EOF and Ctrl+C read as empty
    fn ask(&mut self, question: &str) -> io::Result<String>;

    /// Report progress without waiting for input
    fn status(&mut self, message: &str) {
        let _ = message;
    }
}

/// Interactive terminal backed by rustyline
pub struct TerminalIo {
    editor: DefaultEditor,
}

impl TerminalIo {
    pub fn new() -> io::Result<Self> {
        let editor = DefaultEditor::new().map_err(|e| io::Error::other(format!("Failed to initialize readline: {}", e)))?;
        Ok(Self { editor })
    }

    /// Read a line with the given prompt, treating EOF and Ctrl+C as empty
    pub fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let line = line.trim().to_string();
                if !line.is_empty() {
                    let _ = self.editor.add_history_entry(&line);
                }
                Ok(line)
            }
            Err(ReadlineError::Interrupted) => {
                debug!("read_line: interrupted");
                println!("^C");
                Ok(String::new())
            }
            Err(ReadlineError::Eof) => {
                debug!("read_line: eof");
                println!();
                Ok(String::new())
            }
            Err(ReadlineError::Io(e)) => Err(e),
            Err(err) => Err(io::Error::other(format!("Readline error: {}", err))),
        }
    }
}

impl UserIo for TerminalIo {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        println!("\n{} {}", "Agent:".bright_cyan().bold(), question);
        self.read_line(&format!("{} ", "You:".bright_green().bold()))
    }

    fn status(&mut self, message: &str) {
        println!("{} {}", "•".yellow(), message);
    }
}
