use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use smuff_core::DeployError;

/// Verdict of a validator on one line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer<T> {
    Accept(T),
    Reject(String),
}

enum PromptState<T> {
    Prompt,
    Validate(String),
    Accept(T),
    Reject(String),
}

/// Line-oriented question/answer loop over any reader and writer.
///
/// Every question runs `Prompt -> Validate -> Accept | Reject`, and a
/// rejection prints its reason and goes back to `Prompt`. End of input is
/// the only way out other than an accepted answer.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{line}").context("failed to write prompt output")
    }

    pub fn ask<T>(
        &mut self,
        question: &str,
        mut validate: impl FnMut(&str) -> Answer<T>,
    ) -> Result<T> {
        let mut state = PromptState::Prompt;
        loop {
            state = match state {
                PromptState::Prompt => {
                    write!(self.output, "{question} ").context("failed to write prompt")?;
                    self.output.flush().context("failed to flush prompt")?;
                    PromptState::Validate(self.read_line()?)
                }
                PromptState::Validate(line) => match validate(line.trim()) {
                    Answer::Accept(value) => PromptState::Accept(value),
                    Answer::Reject(reason) => PromptState::Reject(reason),
                },
                PromptState::Accept(value) => return Ok(value),
                PromptState::Reject(reason) => {
                    self.say(&reason)?;
                    PromptState::Prompt
                }
            };
        }
    }

    /// Yes/no question; anything other than y/yes/n/no is asked again.
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        self.ask(&format!("{question} [y/n]:"), parse_yes_no)
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("failed to read from standard input")?;
        if read == 0 {
            return Err(DeployError::InputClosed.into());
        }
        Ok(line)
    }
}

pub(crate) fn parse_yes_no(value: &str) -> Answer<bool> {
    match value.to_ascii_lowercase().as_str() {
        "y" | "yes" => Answer::Accept(true),
        "n" | "no" => Answer::Accept(false),
        _ => Answer::Reject("Please answer 'y' or 'n'.".to_string()),
    }
}
