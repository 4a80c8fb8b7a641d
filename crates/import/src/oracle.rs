use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::mpsc;
use tally_core::Money;
use thiserror::Error;

/// Categories offered when a merchant matches no rule.
pub const DEFAULT_CHOICES: &[&str] = &[
    "Food",
    "Travel",
    "Shopping",
    "Utilities",
    "Healthcare",
    "Entertainment",
    "Services",
    "Payment",
];

/// Outcome of asking an oracle about an unmatched merchant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Selected(String),
    /// No answer; the caller falls back to the default category.
    Cancelled,
}

/// Decision source consulted for merchants no rule covers.
pub trait ClassificationOracle {
    fn resolve(&mut self, merchant: &str, amount: Money, choices: &[String]) -> Decision;
}

impl<O: ClassificationOracle + ?Sized> ClassificationOracle for &mut O {
    fn resolve(&mut self, merchant: &str, amount: Money, choices: &[String]) -> Decision {
        (**self).resolve(merchant, amount, choices)
    }
}

impl<O: ClassificationOracle + ?Sized> ClassificationOracle for Box<O> {
    fn resolve(&mut self, merchant: &str, amount: Money, choices: &[String]) -> Decision {
        (**self).resolve(merchant, amount, choices)
    }
}

// ── Non-interactive oracles ───────────────────────────────────────────────────

/// Always cancels, so every unmatched merchant gets the default category.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptDefault;

impl ClassificationOracle for AcceptDefault {
    fn resolve(&mut self, _merchant: &str, _amount: Money, _choices: &[String]) -> Decision {
        Decision::Cancelled
    }
}

/// Replays a fixed list of decisions and records every question asked.
/// Cancels once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    script: VecDeque<Decision>,
    pub asked: Vec<(String, Money)>,
}

impl ScriptedOracle {
    pub fn new(script: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            script: script.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    /// Shorthand for a script of selections.
    pub fn selecting<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(categories.into_iter().map(|c| Decision::Selected(c.into())))
    }
}

impl ClassificationOracle for ScriptedOracle {
    fn resolve(&mut self, merchant: &str, amount: Money, _choices: &[String]) -> Decision {
        self.asked.push((merchant.to_string(), amount));
        self.script.pop_front().unwrap_or(Decision::Cancelled)
    }
}

// ── Interactive prompt ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Please enter a valid number")]
    NotANumber,
    #[error("Please enter a number between 1 and {0}")]
    OutOfRange(usize),
}

/// Parses a 1-based menu selection into an index into `count` choices.
pub fn parse_selection(input: &str, count: usize) -> Result<usize, SelectionError> {
    let n: i64 = input.trim().parse().map_err(|_| SelectionError::NotANumber)?;
    if n >= 1 && (n as u64) <= count as u64 {
        Ok((n - 1) as usize)
    } else {
        Err(SelectionError::OutOfRange(count))
    }
}

/// One unit of terminal input seen by [`PromptOracle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
    Line(String),
    /// The user pressed the interrupt key while the prompt was waiting.
    Interrupted,
    /// No more input will arrive.
    Closed,
}

/// Blocking source of [`PromptEvent`]s.
pub trait PromptInput {
    fn next_event(&mut self) -> PromptEvent;
}

/// Adapts a line reader. End of input and read errors close the stream.
pub struct LineInput<R>(pub R);

impl<R: BufRead> PromptInput for LineInput<R> {
    fn next_event(&mut self) -> PromptEvent {
        let mut line = String::new();
        match self.0.read_line(&mut line) {
            Ok(0) => PromptEvent::Closed,
            Ok(_) => PromptEvent::Line(line),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read category selection");
                PromptEvent::Closed
            }
        }
    }
}

/// Events produced by another thread (a stdin reader plus a signal listener).
impl PromptInput for mpsc::Receiver<PromptEvent> {
    fn next_event(&mut self) -> PromptEvent {
        self.recv().unwrap_or(PromptEvent::Closed)
    }
}

/// Numbered-menu prompt. An interrupt or the end of input cancels.
pub struct PromptOracle<I, W> {
    input: I,
    output: W,
}

impl<R: BufRead, W: Write> PromptOracle<LineInput<R>, W> {
    pub fn from_reader(reader: R, output: W) -> Self {
        Self::new(LineInput(reader), output)
    }
}

impl<I: PromptInput, W: Write> PromptOracle<I, W> {
    pub fn new(input: I, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_inner(self) -> (I, W) {
        (self.input, self.output)
    }

    fn ask(&mut self, merchant: &str, amount: Money, choices: &[String]) -> std::io::Result<Decision> {
        writeln!(self.output)?;
        writeln!(self.output, "Unknown transaction found: '{merchant}: {amount}'")?;
        writeln!(self.output, "Available categories:")?;
        for (i, choice) in choices.iter().enumerate() {
            writeln!(self.output, "  {}. {choice}", i + 1)?;
        }

        loop {
            write!(self.output, "Select category (1-{}): ", choices.len())?;
            self.output.flush()?;

            let line = match self.input.next_event() {
                PromptEvent::Line(line) => line,
                PromptEvent::Interrupted => {
                    writeln!(self.output)?;
                    writeln!(self.output, "Interrupted, using the default category for '{merchant}'")?;
                    return Ok(Decision::Cancelled);
                }
                PromptEvent::Closed => return Ok(Decision::Cancelled),
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_selection(&line, choices.len()) {
                Ok(idx) => return Ok(Decision::Selected(choices[idx].clone())),
                Err(e) => writeln!(self.output, "{e}")?,
            }
        }
    }
}

impl<I: PromptInput, W: Write> ClassificationOracle for PromptOracle<I, W> {
    fn resolve(&mut self, merchant: &str, amount: Money, choices: &[String]) -> Decision {
        if choices.is_empty() {
            return Decision::Cancelled;
        }
        match self.ask(merchant, amount, choices) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(error = %e, merchant, "category prompt failed");
                Decision::Cancelled
            }
        }
    }
}
