//! Child process management for a single prediction run (spawn/collect/exit).

use std::{ffi::OsStr, io, process::ExitStatus};

use log::{debug, error};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader},
    process::{Child, ChildStderr, ChildStdout, Command},
};

use crate::execution::ExecutionFailure;

pub mod python;

/// One spawned process plus its output pipes.
///
/// The child is killed if this is dropped before it exits, which is what
/// happens when the HTTP client goes away mid-request.
pub struct ProcessInvocation {
    child: Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
    label: String,
}

#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
}

impl ProcessInvocation {
    pub fn spawn<I, S>(program: &str, args: I) -> Result<Self, ExecutionFailure>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| ExecutionFailure::Spawn {
            program: program.to_string(),
            source,
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecutionFailure::Io(missing_pipe("stdout")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExecutionFailure::Io(missing_pipe("stderr")))?;

        let label = match child.id() {
            Some(pid) => format!("{}[{}]", program, pid),
            None => program.to_string(),
        };
        debug!("spawned {}", label);

        Ok(Self {
            child,
            stdout,
            stderr,
            label,
        })
    }

    /// Collect all of stdout, log stderr as it arrives, then wait for exit.
    pub async fn wait(mut self) -> Result<ProcessOutput, ExecutionFailure> {
        let mut stdout = Vec::new();
        let (read, ()) = tokio::join!(
            self.stdout.read_to_end(&mut stdout),
            log_stderr(&self.label, &mut self.stderr),
        );
        read.map_err(ExecutionFailure::Io)?;

        let status = self.child.wait().await.map_err(ExecutionFailure::Io)?;
        debug!("{} exited with {} ({} bytes on stdout)", self.label, status, stdout.len());
        Ok(ProcessOutput { status, stdout })
    }
}

async fn log_stderr<R: AsyncRead + Unpin>(label: &str, stderr: R) {
    let mut reader = BufReader::new(stderr);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => error!("{} stderr: {}", label, String::from_utf8_lossy(&line).trim_end()),
            Err(e) => {
                // Keep the pipe drained so the child never blocks on a full buffer.
                debug!("{} stderr unreadable: {}", label, e);
                let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
                break;
            }
        }
    }
}

fn missing_pipe(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, format!("child {} was not captured", name))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stdout_is_concatenated_across_writes() {
        let inv = ProcessInvocation::spawn(
            "/bin/sh",
            ["-c", "printf '{\"a\":'; sleep 0.05; printf '1}'; echo oops >&2"],
        )
        .unwrap();
        let out = inv.wait().await.unwrap();
        assert!(out.status.success());
        assert_eq!(out.stdout, b"{\"a\":1}");
    }

    #[tokio::test]
    async fn exit_code_is_reported() {
        let inv = ProcessInvocation::spawn("/bin/sh", ["-c", "echo partial; exit 3"]).unwrap();
        let out = inv.wait().await.unwrap();
        assert_eq!(out.status.code(), Some(3));
        assert_eq!(out.stdout, b"partial\n");
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_failure() {
        let err = ProcessInvocation::spawn("/definitely/not/a/program", ["[]"])
            .err()
            .unwrap();
        assert!(matches!(err, ExecutionFailure::Spawn { .. }), "got: {err:?}");
    }
}
