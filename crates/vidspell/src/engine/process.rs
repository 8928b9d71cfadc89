use std::process::{Output, Stdio};
use std::time::Duration;

use log::debug;
use tokio::process::Command;

use crate::error::{ExtractionError, TranscriptionError};

/// How a child process failed.
#[derive(Debug)]
pub enum CommandFailure {
    Spawn(std::io::Error),
    Exit { status: String, stderr: String },
    Timeout(Duration),
}

/// Runs `program` to completion, killing it when `limit` elapses.
pub async fn run_with_timeout(
    program: &str,
    args: &[String],
    limit: Duration,
) -> Result<Output, CommandFailure> {
    debug!("Running {} {}", program, args.join(" "));

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(CommandFailure::Spawn)?;

    let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(result) => result.map_err(CommandFailure::Spawn)?,
        Err(_) => return Err(CommandFailure::Timeout(limit)),
    };

    if output.status.success() {
        Ok(output)
    } else {
        Err(CommandFailure::Exit {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl CommandFailure {
    pub fn into_extraction_error(self, program: &str) -> ExtractionError {
        match self {
            CommandFailure::Spawn(source) => ExtractionError::Spawn {
                program: program.to_string(),
                source,
            },
            CommandFailure::Exit { status, stderr } => ExtractionError::ExitStatus {
                program: program.to_string(),
                status,
                stderr,
            },
            CommandFailure::Timeout(limit) => ExtractionError::Timeout(limit),
        }
    }

    pub fn into_transcription_error(self, program: &str) -> TranscriptionError {
        match self {
            CommandFailure::Spawn(source) => TranscriptionError::Spawn {
                program: program.to_string(),
                source,
            },
            CommandFailure::Exit { status, stderr } => TranscriptionError::ExitStatus {
                program: program.to_string(),
                status,
                stderr,
            },
            CommandFailure::Timeout(limit) => TranscriptionError::Timeout(limit),
        }
    }
}
