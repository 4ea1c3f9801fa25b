use std::ffi::OsStr;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::logging;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{program} was not found; install it and make sure it is on PATH")]
    NotFound { program: String },
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("{program} produced output that is not UTF-8")]
    InvalidOutput { program: String },
}

#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Runs `program` to completion, feeding `input` on stdin. A non-zero exit
/// status is an error carrying the captured stderr.
pub fn run<I, S>(program: &Path, args: I, input: &[u8]) -> Result<CommandOutput, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let name = program.display().to_string();
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    logging::debug(format!("running {:?}", command));

    let mut child = command.spawn().map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ToolError::NotFound {
                program: name.clone(),
            }
        } else {
            ToolError::Spawn {
                program: name.clone(),
                source,
            }
        }
    })?;

    // stdin is fed from its own thread while stdout/stderr drain, so a tool
    // that fills a pipe before reading all of its input cannot block us.
    let stdin = child.stdin.take();
    let output = std::thread::scope(|scope| {
        if let Some(mut stdin) = stdin {
            let name = &name;
            scope.spawn(move || {
                // Tools that do not read stdin close the pipe early; their exit
                // status still decides the outcome.
                if let Err(err) = stdin.write_all(input) {
                    logging::debug(format!("{} closed stdin early: {}", name, err));
                }
            });
        }
        child.wait_with_output()
    })
    .map_err(|source| ToolError::Spawn {
        program: name.clone(),
        source,
    })?;
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        return Err(ToolError::Failed {
            program: name,
            status: output.status.to_string(),
            stderr,
        });
    }

    Ok(CommandOutput {
        stdout: output.stdout,
        stderr,
    })
}

pub fn probe_version(program: &Path) -> Result<String, ToolError> {
    let output = run(program, ["--version"], &[])?;
    let stdout = String::from_utf8(output.stdout).map_err(|_| ToolError::InvalidOutput {
        program: program.display().to_string(),
    })?;
    Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
}
