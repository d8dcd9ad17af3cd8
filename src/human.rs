use std::{
    io::{BufRead, Write},
    sync::Arc,
};

use thiserror::Error;

/// Custom human intervention: receives the current task, returns the human's answer.
pub type HumanHandler = Arc<dyn Fn(&str) -> String + Send + Sync>;

pub const PARALLEL_PROMPT: &str = "Enter your response: ";
pub const SEQUENTIAL_PROMPT: &str = "Enter the next task: ";

#[derive(Debug, Error)]
pub enum HumanInputError {
    #[error("Failed to read human input: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Human input task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

/// Print `prompt` and block (off the async executor) until a line arrives on stdin.
pub async fn prompt_stdin(prompt: &'static str) -> Result<String, HumanInputError> {
    tokio::task::spawn_blocking(move || {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;
        read_response(std::io::stdin().lock())
    })
    .await?
}

fn read_response(mut reader: impl BufRead) -> Result<String, HumanInputError> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
