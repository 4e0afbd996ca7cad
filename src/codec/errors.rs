//! Error accumulation policies.
//!
//! The engines only produce a list of problems; what happens to it is chosen by the caller
//! per message through an [`ErrorSink`].

use log::warn;

/// Collects non-fatal problems found while encoding or decoding one message.
pub trait ErrorSink {
    fn append(&mut self, message: String);

    fn append_all(&mut self, messages: Vec<String>) {
        for message in messages {
            self.append(message);
        }
    }

    /// `true` when the collected problems must fail the operation.
    fn has_errors(&self) -> bool;

    /// Problems that fail the operation (empty for downgrading sinks).
    fn errors(&self) -> &[String];
}

/// Collects everything; any entry fails the operation.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<String>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }
}

impl ErrorSink for ErrorList {
    fn append(&mut self, message: String) {
        self.errors.push(message);
    }

    fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }
}

/// Side channel for warnings raised while processing a message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportingContext {
    warnings: Vec<String>,
}

impl ReportingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

/// Downgrades every problem to a warning in a [`ReportingContext`]; never fails.
pub struct WarningReport<'a> {
    context: &'a mut ReportingContext,
}

impl<'a> WarningReport<'a> {
    pub fn new(context: &'a mut ReportingContext) -> Self {
        Self { context }
    }
}

impl ErrorSink for WarningReport<'_> {
    fn append(&mut self, message: String) {
        self.context.warning(message);
    }

    fn has_errors(&self) -> bool {
        false
    }

    fn errors(&self) -> &[String] {
        &[]
    }
}

/// Logs problems as warnings and drops them; never fails.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl ErrorSink for LoggingSink {
    fn append(&mut self, message: String) {
        warn!("A warning was reported: {}", message);
    }

    fn append_all(&mut self, messages: Vec<String>) {
        if messages.is_empty() {
            return;
        }
        warn!(
            "{} warning(s) were reported: {}",
            messages.len(),
            messages.join("; ")
        );
    }

    fn has_errors(&self) -> bool {
        false
    }

    fn errors(&self) -> &[String] {
        &[]
    }
}
