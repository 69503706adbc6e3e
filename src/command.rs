use std::io;
use std::process::Stdio;

use bytes::BytesMut;
use futures::StreamExt;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::process::Command as TokioCommand;
use tokio_util::codec::{Decoder, FramedRead};
use uuid::Uuid;

use crate::rules::Rule;

/// Longer lines are logged in pieces of this size.
const MAX_LINE_LENGTH: usize = 16 * 1024;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Could not start command {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A command that was started. Nothing waits on it.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub id: Uuid,
    pub program: String,
    pub args: Vec<String>,
    pub pid: Option<u32>,
}

/// Arguments are whitespace delimited; an empty string means no arguments.
pub fn split_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(str::to_string).collect()
}

/// Launches rule commands as detached child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandDispatcher {
    verbose: bool,
}

impl CommandDispatcher {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn dispatch(&self, rule: &Rule) -> Result<Dispatched, DispatchError> {
        let id = Uuid::new_v4();
        let args = split_args(&rule.args);

        let mut c = TokioCommand::new(&rule.cmd);
        c.args(&args).stdin(Stdio::null());

        if self.verbose {
            c.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            c.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let mut child = c.spawn().map_err(|source| DispatchError::Spawn {
            program: rule.cmd.clone(),
            source,
        })?;
        let pid = child.id();

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(id, "stdout", stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(id, "stderr", stderr));
        }

        let program = rule.cmd.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    tracing::debug!(dispatch_id = %id, "{program} exited with {status}");
                }
                Ok(status) => {
                    tracing::info!(dispatch_id = %id, "{program} exited with {status}");
                }
                Err(e) => {
                    tracing::error!(dispatch_id = %id, "Could not wait for {program}: {e}");
                }
            }
        });

        Ok(Dispatched {
            id,
            program: rule.cmd.clone(),
            args,
            pid,
        })
    }
}

/// Splits child output on `\n` without ever failing on its content: bytes
/// that are not UTF-8 are replaced and overlong lines are cut into chunks.
#[derive(Debug, Default)]
struct OutputLineCodec {
    searched: usize,
}

fn to_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

impl Decoder for OutputLineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        let window = src.len().min(MAX_LINE_LENGTH);
        if let Some(offset) = src[self.searched..window].iter().position(|b| *b == b'\n') {
            let newline = self.searched + offset;
            self.searched = 0;
            let line = src.split_to(newline + 1);
            return Ok(Some(to_line(&line[..newline])));
        }

        if src.len() >= MAX_LINE_LENGTH {
            self.searched = 0;
            let chunk = src.split_to(MAX_LINE_LENGTH);
            return Ok(Some(to_line(&chunk)));
        }

        self.searched = src.len();
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }

        self.searched = 0;
        let rest = src.split_to(src.len());
        Ok(Some(to_line(&rest)))
    }
}

/// Logs every line of `reader` until the pipe closes.
async fn forward_lines<R>(id: Uuid, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(reader, OutputLineCodec::default());

    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => tracing::info!(dispatch_id = %id, stream, "> {line}"),
            Err(e) => {
                tracing::warn!(dispatch_id = %id, stream, "Could not read output: {e}");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn rule(cmd: &str, args: &str) -> Rule {
        Rule {
            cmd: cmd.to_string(),
            args: args.to_string(),
        }
    }

    async fn wait_for_file(path: &std::path::Path) -> bool {
        for _ in 0..50 {
            if path.exists() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        false
    }

    #[test]
    fn empty_args_yield_no_arguments() {
        assert!(split_args("").is_empty());
        assert!(split_args("   ").is_empty());
    }

    #[test]
    fn args_split_on_spaces() {
        assert_eq!(split_args("a b"), vec!["a", "b"]);
        assert_eq!(split_args("deploy  --env prod"), vec!["deploy", "--env", "prod"]);
    }

    #[tokio::test]
    async fn dispatch_passes_split_arguments() {
        let dispatched = CommandDispatcher::new(false)
            .dispatch(&rule("echo", "deployed"))
            .unwrap();

        assert_eq!(dispatched.program, "echo");
        assert_eq!(dispatched.args, vec!["deployed"]);
        assert!(dispatched.pid.is_some());
    }

    #[tokio::test]
    async fn dispatch_runs_the_command() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");

        CommandDispatcher::new(false)
            .dispatch(&rule("touch", marker.to_str().unwrap()))
            .unwrap();

        assert!(wait_for_file(&marker).await);
    }

    #[tokio::test]
    async fn verbose_dispatch_drains_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("noisy.sh");
        let marker = dir.path().join("done");
        std::fs::write(
            &script,
            format!(
                "i=0\nwhile [ $i -lt 2000 ]; do echo out $i; echo err $i >&2; i=$((i+1)); done\ntouch {}\n",
                marker.display()
            ),
        )
        .unwrap();

        CommandDispatcher::new(true)
            .dispatch(&rule("sh", script.to_str().unwrap()))
            .unwrap();

        assert!(wait_for_file(&marker).await);
    }

    #[tokio::test]
    async fn verbose_dispatch_survives_non_utf8_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("latin1.sh");
        let marker = dir.path().join("done");
        std::fs::write(
            &script,
            format!(
                "printf 'caf\\351\\n'\nsleep 0.5\ni=0\nwhile [ $i -lt 200 ]; do echo line $i; i=$((i+1)); done\ntouch {}\n",
                marker.display()
            ),
        )
        .unwrap();

        CommandDispatcher::new(true)
            .dispatch(&rule("sh", script.to_str().unwrap()))
            .unwrap();

        assert!(wait_for_file(&marker).await);
    }

    #[test]
    fn codec_replaces_invalid_utf8() {
        let mut codec = OutputLineCodec::default();
        let mut buf = BytesMut::from(&b"caf\xe9\r\nnext"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("caf\u{fffd}".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), Some("next".to_string()));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn codec_chunks_lines_without_newline() {
        let mut codec = OutputLineCodec::default();
        let mut buf = BytesMut::from(vec![b'x'; MAX_LINE_LENGTH + 10].as_slice());

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.len(), MAX_LINE_LENGTH);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("x".repeat(10)));
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let result = CommandDispatcher::new(true).dispatch(&rule("/definitely/not/a/binary", ""));

        assert!(matches!(result, Err(DispatchError::Spawn { .. })));
    }
}
