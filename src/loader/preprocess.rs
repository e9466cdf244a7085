//! Macro expansion of templated descriptor sources.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};

use crate::error::{ConfigError, ConfigResult, ExternalError};

use super::LoaderConfig;

/// Interval between exit checks while a preprocessor runs.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long to wait for output pipes to drain after the process exited.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Expands a templated descriptor source into serialized text.
pub trait Preprocessor {
    /// Expands `source` with the given `-D` macros and returns the output.
    fn expand(&self, source: &Path, macros: &[String]) -> ConfigResult<String>;
}

impl<P: Preprocessor + ?Sized> Preprocessor for &P {
    fn expand(&self, source: &Path, macros: &[String]) -> ConfigResult<String> {
        (**self).expand(source, macros)
    }
}

/// Runs an external preprocessor program (`cpp -P` by default).
///
/// The command line is `<program> <args...> <macros...> <source>`.
#[derive(Debug, Clone)]
pub struct CommandPreprocessor {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandPreprocessor {
    /// Runs the program, arguments and timeout of `config`.
    #[must_use]
    pub fn new(config: &LoaderConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: config.timeout,
        }
    }

    fn command_line(&self, source: &Path, macros: &[String]) -> Vec<String> {
        let mut line = Vec::with_capacity(self.args.len() + macros.len() + 2);
        line.push(self.program.clone());
        line.extend(self.args.iter().cloned());
        line.extend(macros.iter().cloned());
        line.push(source.display().to_string());
        line
    }
}

impl Default for CommandPreprocessor {
    fn default() -> Self {
        Self::new(&LoaderConfig::default())
    }
}

impl Preprocessor for CommandPreprocessor {
    fn expand(&self, source: &Path, macros: &[String]) -> ConfigResult<String> {
        let line = self.command_line(source, macros);
        let command = line.join(" ");
        tracing::info!(%command, "running preprocessor");

        let mut child = Command::new(&self.program)
            .args(&line[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExternalError::Preprocess {
                command: command.clone(),
                status: "not started".to_string(),
                stderr: e.to_string(),
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match wait_until(&mut child, self.timeout.map(|t| Instant::now() + t)) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                let duration_ms = self
                    .timeout
                    .map_or(0, |t| t.as_millis().min(u128::from(u64::MAX)) as u64);
                tracing::warn!(%command, duration_ms, "preprocessor timed out");
                return Err(ExternalError::PreprocessTimeout {
                    command,
                    duration_ms,
                }
                .into());
            }
            Err(e) => {
                let _ = child.kill();
                return Err(ExternalError::Preprocess {
                    command,
                    status: "unknown".to_string(),
                    stderr: e.to_string(),
                }
                .into());
            }
        };

        let stdout = collect(&stdout)?;
        let stderr = collect(&stderr)?;
        if !status.success() {
            return Err(ExternalError::Preprocess {
                command,
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim_end().to_string(),
            }
            .into());
        }

        String::from_utf8(stdout).map_err(|e| {
            ExternalError::Preprocess {
                command,
                status: status.to_string(),
                stderr: format!("output is not UTF-8: {e}"),
            }
            .into()
        })
    }
}

/// Reads a pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<std::io::Result<Vec<u8>>> {
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = match pipe {
            Some(mut pipe) => pipe.read_to_end(&mut buf).map(|_| buf),
            None => Ok(buf),
        };
        let _ = tx.send(result);
    });
    rx
}

fn collect(rx: &Receiver<std::io::Result<Vec<u8>>>) -> ConfigResult<Vec<u8>> {
    match rx.recv_timeout(DRAIN_TIMEOUT) {
        Ok(result) => result.map_err(|e| ConfigError::internal(format!("read preprocessor output: {e}"))),
        Err(RecvTimeoutError::Timeout) => Err(ConfigError::internal("preprocessor output did not close")),
        Err(RecvTimeoutError::Disconnected) => Err(ConfigError::internal("preprocessor reader exited")),
    }
}

/// Polls the child until it exits or `deadline` passes (`Ok(None)`).
fn wait_until(child: &mut Child, deadline: Option<Instant>) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn preprocessor(program: &str, args: &[&str], timeout: Option<Duration>) -> CommandPreprocessor {
        CommandPreprocessor {
            program: program.to_string(),
            args: args.iter().map(|s| (*s).to_string()).collect(),
            timeout,
        }
    }

    #[test]
    fn test_command_line_order() {
        let pre = CommandPreprocessor::default();
        let line = pre.command_line(Path::new("lpjml.js"), &["-DFROM_RESTART".to_string()]);
        assert_eq!(line, vec!["cpp", "-P", "-DFROM_RESTART", "lpjml.js"]);
    }

    #[test]
    fn test_captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("lpjml.js");
        std::fs::write(&source, "{\"sim_name\": \"x\"}").unwrap();

        let out = preprocessor("cat", &[], Some(Duration::from_secs(10)))
            .expand(&source, &[])
            .unwrap();
        assert_eq!(out, "{\"sim_name\": \"x\"}");
    }

    #[test]
    fn test_nonzero_exit_carries_status_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.js");
        let err = preprocessor("cat", &[], None).expand(&missing, &[]).unwrap_err();
        match err {
            ConfigError::External(ExternalError::Preprocess { status, stderr, .. }) => {
                assert!(status.contains('1'), "{status}");
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_timeout_kills_process() {
        let started = Instant::now();
        // The source path lands in `$0` of the shell script.
        let err = preprocessor("sh", &["-c", "sleep 30"], Some(Duration::from_millis(100)))
            .expand(Path::new("lpjml.js"), &[])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::External(ExternalError::PreprocessTimeout { duration_ms: 100, .. })
        ));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_missing_program() {
        let err = preprocessor("definitely-not-a-preprocessor", &[], None)
            .expand(Path::new("x"), &[])
            .unwrap_err();
        assert!(err.is_external());
    }
}
