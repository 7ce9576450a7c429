use crate::domain::ports::{EmbeddedProcess, MessageChannel, ProcessHandle, ProcessHost};
use crate::domain::protocol::MethodCall;
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Environment variable through which a child learns the channel name.
pub const CHANNEL_ENV: &str = "PAYFAST_BRIDGE_CHANNEL";

/// Upper bound for one inbound line. Outcome messages are tiny.
const MAX_LINE_LEN: usize = 64 * 1024;

/// A bridge channel carried as newline-delimited JSON over a byte stream.
///
/// Each line is one `{"method": ..., "arguments": ...}` object.
pub struct LineChannel<R, W> {
    reader: R,
    writer: W,
    line: Vec<u8>,
}

impl<R, W> LineChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: Vec::new(),
        }
    }

    /// Reads the next line into `self.line` without buffering more than
    /// `MAX_LINE_LEN` bytes. Returns `false` at end of stream.
    async fn read_bounded_line(&mut self) -> Result<bool> {
        self.line.clear();
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(!self.line.is_empty());
            }

            let (chunk, complete) = match available.iter().position(|&b| b == b'\n') {
                Some(end) => (&available[..=end], true),
                None => (available, false),
            };
            if self.line.len() + chunk.len() > MAX_LINE_LEN {
                return Err(BridgeError::Channel(format!(
                    "inbound line exceeds {MAX_LINE_LEN} bytes"
                )));
            }

            self.line.extend_from_slice(chunk);
            let consumed = chunk.len();
            self.reader.consume(consumed);
            if complete {
                return Ok(true);
            }
        }
    }
}

#[async_trait]
impl<R, W> MessageChannel for LineChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, call: MethodCall) -> Result<()> {
        let mut bytes = serde_json::to_vec(&call)?;
        bytes.push(b'\n');
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<MethodCall>> {
        loop {
            if !self.read_bounded_line().await? {
                return Ok(None);
            }

            let trimmed = self.line.trim_ascii();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_slice::<MethodCall>(trimmed) {
                Ok(call) => return Ok(Some(call)),
                Err(e) => warn!(error = %e, "skipping malformed bridge line"),
            }
        }
    }
}

pub type ChildChannel = LineChannel<BufReader<ChildStdout>, ChildStdin>;

/// Starts the embedded payment process as a child program.
///
/// The child reads calls on stdin and writes its own calls to stdout; stderr is
/// inherited.
#[derive(Debug, Clone)]
pub struct ChildProcessHost {
    program: String,
    args: Vec<String>,
}

impl ChildProcessHost {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Builds a host from a full command line, program first.
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone()).args(args.iter().cloned()))
    }
}

#[async_trait]
impl ProcessHost for ChildProcessHost {
    async fn start(&self, channel_name: &str) -> Result<EmbeddedProcess> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(CHANNEL_ENV, channel_name)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::Channel("child stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Channel("child stdout not captured".to_string()))?;

        debug!(program = %self.program, pid = ?child.id(), channel = channel_name, "embedded process started");

        Ok(EmbeddedProcess {
            channel: Box::new(LineChannel::new(BufReader::new(stdout), stdin)),
            handle: Arc::new(ChildProcessHandle {
                child: Mutex::new(child),
            }),
        })
    }
}

/// Handle to a child embedded process; shutting down kills it if still running.
pub struct ChildProcessHandle {
    child: Mutex<Child>,
}

#[async_trait]
impl ProcessHandle for ChildProcessHandle {
    async fn shutdown(&self) -> Result<()> {
        let mut child = self.child.lock().await;
        if child.try_wait()?.is_none() {
            child.kill().await?;
        }
        Ok(())
    }
}
