//! Error accumulator threaded through device operations.
//!
//! Multi-step operations keep going when one step fails. Each failure is
//! recorded here with the name of the operation that produced it, and the
//! caller decides afterwards whether the count is fatal.

use std::fmt;

/// Caller-owned error count and message log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    messages: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of errors recorded so far.
    pub fn count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_ok(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Record `err` as a failure of `operation`.
    ///
    /// The message reads `In <operation>(): <err>`.
    pub fn record(&mut self, operation: &str, err: impl fmt::Display) {
        let message = format!("In {}(): {}", operation, err);
        tracing::warn!("{}", message);
        self.messages.push(message);
    }

    /// Unwrap `result`, recording its error under `operation` if it failed.
    pub fn check<T, E>(&mut self, operation: &str, result: Result<T, E>) -> Option<T>
    where
        E: fmt::Display,
    {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.record(operation, err);
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// All messages, one per line.
impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for message in &self.messages {
            writeln!(f, "{}", message)?;
        }
        Ok(())
    }
}
