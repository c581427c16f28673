use super::{CommandSink, SinkError};
use crate::resolver::ResolvedCommand;
use std::io::Write;
use tracing::info;

/// Reports every command as a tracing event
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl CommandSink for LogSink {
    fn emit(&mut self, command: &ResolvedCommand) -> Result<(), SinkError> {
        info!("Command: {}", command);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Writes one line per command to a writer, stdout by default
pub struct StdoutSink<W: Write + Send + 'static = std::io::Stdout> {
    writer: W,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            writer: std::io::stdout(),
        }
    }
}

impl<W: Write + Send + 'static> StdoutSink<W> {
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send + 'static> CommandSink for StdoutSink<W> {
    fn emit(&mut self, command: &ResolvedCommand) -> Result<(), SinkError> {
        writeln!(self.writer, "{}", command)
            .and_then(|_| self.writer.flush())
            .map_err(|e| SinkError::WriteError(e.to_string()))
    }

    fn name(&self) -> &str {
        "stdout"
    }
}
