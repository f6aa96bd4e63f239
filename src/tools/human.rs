//! Human-in-the-loop tool
//!
//! Lets an agent put a question to the person at the terminal and read the
//! answer back as its observation.

use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};

use super::Tool;

struct Terminal {
    reader: Box<dyn BufRead + Send>,
    writer: Box<dyn Write + Send>,
}

impl Terminal {
    fn ask(&mut self, question: &str) -> Result<String> {
        writeln!(self.writer, "\n{}", question)?;
        self.writer.flush()?;

        let mut answer = String::new();
        if self.reader.read_line(&mut answer)? == 0 {
            return Err(Error::HumanInputClosed);
        }
        Ok(answer.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Asks the human at the terminal
pub struct HumanInput {
    terminal: Arc<Mutex<Terminal>>,
}

impl HumanInput {
    /// Talk over the process's stdin/stdout
    pub fn stdio() -> Self {
        Self::with_io(BufReader::new(std::io::stdin()), std::io::stdout())
    }

    pub fn with_io(
        reader: impl BufRead + Send + 'static,
        writer: impl Write + Send + 'static,
    ) -> Self {
        Self {
            terminal: Arc::new(Mutex::new(Terminal {
                reader: Box::new(reader),
                writer: Box::new(writer),
            })),
        }
    }
}

#[async_trait]
impl Tool for HumanInput {
    fn name(&self) -> &str {
        "human"
    }

    fn description(&self) -> &str {
        "You can ask a human for guidance when you think you got stuck or you are not \
         sure what to do next. The input should be a question for the human."
    }

    async fn run(&self, input: &str) -> Result<String> {
        let terminal = self.terminal.clone();
        let question = input.trim().to_string();

        // Terminal reads block; keep them off the async workers
        let answer = tokio::task::spawn_blocking(move || terminal.lock().ask(&question))
            .await
            .map_err(|e| Error::Internal(format!("Human input task failed: {}", e)))??;

        debug!(chars = answer.len(), "Human answered");
        Ok(answer)
    }
}
