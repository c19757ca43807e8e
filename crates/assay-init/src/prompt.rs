//! Operator interaction
//!
//! The wizard talks to the operator only through [`Prompter`]. The console
//! implementation renders questions click-style (`Question [default]: `);
//! [`ScriptedPrompter`] runs the same rendering over canned answers and keeps
//! the transcript.

use std::fmt::Write as _;
use std::io::{self, BufRead, Cursor, StdinLock, Stdout, Write};

use crate::error::{Result, WizardError};

/// Questions and messages for the operator
pub trait Prompter {
    /// Print a message
    ///
    /// # Errors
    /// Returns error if the output cannot be written
    fn say(&mut self, text: &str) -> Result<()>;

    /// Ask for free text; an empty answer takes `default`
    ///
    /// Without a default an empty answer is returned as-is.
    ///
    /// # Errors
    /// Returns error if input ends or the terminal fails
    fn prompt(&mut self, question: &str, default: Option<&str>) -> Result<String>;

    /// Ask a yes/no question
    ///
    /// # Errors
    /// Returns error if input ends or the terminal fails
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool>;

    /// Ask for one of `choices`; returns its zero-based index
    ///
    /// # Errors
    /// Returns error if input ends or the terminal fails
    fn choose(&mut self, question: &str, choices: &[&str], default: usize) -> Result<usize>;
}

/// Line-oriented prompter over any reader and writer
#[derive(Debug)]
pub struct ConsolePrompter<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompter<StdinLock<'static>, Stdout> {
    /// Prompter on the process terminal
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompter<R, W> {
    /// Prompter over `input` and `output`
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, rendered: &str) -> Result<String> {
        write!(self.output, "{rendered}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(WizardError::InputClosed);
        }
        let answer = line.trim_end_matches(['\n', '\r']).to_string();
        // Echo so the transcript reads like a terminal session
        writeln!(self.output, "{answer}")?;
        Ok(answer.trim().to_string())
    }

    fn invalid(&mut self) -> Result<()> {
        writeln!(self.output, "Error: invalid input")?;
        Ok(())
    }
}

impl<R: BufRead, W: Write> Prompter for ConsolePrompter<R, W> {
    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{text}")?;
        Ok(())
    }

    fn prompt(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        let rendered = match default {
            Some(default) => format!("{question} [{default}]: "),
            None => format!("{question}: "),
        };
        let answer = self.ask(&rendered)?;
        Ok(match default {
            Some(default) if answer.is_empty() => default.to_string(),
            _ => answer,
        })
    }

    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let answer = self.ask(&format!("{question} {hint}: "))?;
            match answer.to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.invalid()?,
            }
        }
    }

    fn choose(&mut self, question: &str, choices: &[&str], default: usize) -> Result<usize> {
        let mut rendered = format!("{question}\n");
        for (i, choice) in choices.iter().enumerate() {
            let _ = writeln!(rendered, "    {}. {choice}", i + 1);
        }
        let _ = write!(rendered, ": [{}]: ", default + 1);
        loop {
            let answer = self.ask(&rendered)?;
            if answer.is_empty() {
                return Ok(default);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=choices.len()).contains(&n) => return Ok(n - 1),
                _ => self.invalid()?,
            }
        }
    }
}

/// Prompter answering from a fixed script, for tests and automation
///
/// Each answer is one line; an empty line accepts the default.
#[derive(Debug)]
pub struct ScriptedPrompter {
    inner: ConsolePrompter<Cursor<Vec<u8>>, Vec<u8>>,
}

impl ScriptedPrompter {
    /// Prompter replaying `answers` in order
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut script = String::new();
        for answer in answers {
            script.push_str(answer.as_ref());
            script.push('\n');
        }
        Self {
            inner: ConsolePrompter::new(Cursor::new(script.into_bytes()), Vec::new()),
        }
    }

    /// Everything written so far, answers included
    #[must_use]
    pub fn transcript(&self) -> String {
        String::from_utf8_lossy(&self.inner.output).into_owned()
    }

    /// Check if every scripted answer was consumed
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        let cursor = &self.inner.input;
        usize::try_from(cursor.position()).map_or(true, |pos| pos >= cursor.get_ref().len())
    }
}

impl Prompter for ScriptedPrompter {
    fn say(&mut self, text: &str) -> Result<()> {
        self.inner.say(text)
    }

    fn prompt(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        self.inner.prompt(question, default)
    }

    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        self.inner.confirm(question, default)
    }

    fn choose(&mut self, question: &str, choices: &[&str], default: usize) -> Result<usize> {
        self.inner.choose(question, choices, default)
    }
}
