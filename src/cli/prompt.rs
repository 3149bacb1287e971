//! Operator prompts.

use std::io::{self, BufRead, IsTerminal, Write};

use tracing::warn;

use crate::error::Error;

/// Line-based question/answer channel with the operator.
pub trait Prompt {
    /// Ask `question` and return the answer without its line terminator.
    ///
    /// `Ok(None)` means no answer is available (end of input, or no
    /// terminal to ask on).
    fn ask(&mut self, question: &str) -> Result<Option<String>, Error>;
}

/// Prompt reading from any buffered reader.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn ask(&mut self, question: &str) -> Result<Option<String>, Error> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(strip_line_ending(&line).to_string()))
    }
}

/// Prompt on the process's stdin/stdout.
///
/// Refuses to read when stdin is not a terminal, so an unattended run never
/// waits on input nobody will type. The installed hook redirects stdin from
/// `/dev/tty` to keep this working inside `git commit`.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&mut self, question: &str) -> Result<Option<String>, Error> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            warn!(question = question.trim(), "stdin is not a terminal, no answer");
            return Ok(None);
        }
        LinePrompt::new(stdin.lock(), io::stdout()).ask(question)
    }
}

fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
