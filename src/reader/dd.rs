use super::{BlockReader, ReadError};
use crate::config::BlockSize;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::runtime::{Builder, Handle};
use tokio_util::sync::CancellationToken;

/// Matches the transfer line: "10485760 bytes (10 MB, 10 MiB) copied, ..."
static BYTES_COPIED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\d+) bytes").expect("Invalid dd summary regex"));

/// Runs `dd if=<path> of=/dev/null bs=<block>` per file
///
/// Cancellation kills the child, which is the only way to stop a read that is
/// stuck inside the kernel on an unresponsive mount.
#[derive(Debug, Clone)]
pub struct DdReader {
    program: PathBuf,
}

impl DdReader {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, path: &Path, block_size: &BlockSize, cancel: &CancellationToken) -> Result<u64, ReadError> {
        let mut child = Command::new(&self.program)
            .arg(input_arg(path))
            .arg("of=/dev/null")
            .arg(format!("bs={}", block_size.bytes()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        let stderr_pipe = child.stderr.take();

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                tracing::debug!(path = %path.display(), "Killing dd after cancellation");
                let _ = child.kill().await;
                return Err(ReadError::Cancelled);
            }
        };

        // dd echoes the path back in its messages, which need not be UTF-8
        let mut raw = Vec::new();
        if let Some(mut pipe) = stderr_pipe {
            pipe.read_to_end(&mut raw).await?;
        }
        let stderr = String::from_utf8_lossy(&raw);

        if !status.success() {
            let reason = stderr
                .lines()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("dd exited unsuccessfully")
                .trim()
                .to_string();
            return Err(ReadError::Failed(reason));
        }

        Ok(parse_bytes_copied(&stderr).unwrap_or(0))
    }
}

impl Default for DdReader {
    fn default() -> Self {
        Self::with_program("dd")
    }
}

impl BlockReader for DdReader {
    /// Must be called from a blocking thread, never from inside an async task
    fn read_file(&self, path: &Path, block_size: &BlockSize, cancel: &CancellationToken) -> Result<u64, ReadError> {
        let read = self.run(path, block_size, cancel);
        match Handle::try_current() {
            Ok(handle) => handle.block_on(read),
            Err(_) => Builder::new_current_thread().enable_all().build()?.block_on(read),
        }
    }
}

/// `if=<path>` built from the raw path so non-UTF-8 names reach dd intact
fn input_arg(path: &Path) -> OsString {
    let mut arg = OsString::from("if=");
    arg.push(path.as_os_str());
    arg
}

fn parse_bytes_copied(stderr: &str) -> Option<u64> {
    BYTES_COPIED_REGEX
        .captures(stderr)
        .and_then(|caps| caps[1].parse().ok())
}
