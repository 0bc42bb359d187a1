// ABOUTME: Shell task runner executing commands through `sh -c`
// ABOUTME: Captures output incrementally, optionally echoes it, and kills its process group on timeout

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{wrong_kind, RunnerContext, RunnerResult, TaskRunner};
use crate::parser::{ShellTask, TaskKind, TaskType};
use crate::template;

/// How long to keep reading pipes after the child is gone. Grandchildren may hold them open.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(250);

pub struct ShellRunner;

#[derive(Debug, Clone, Copy)]
enum Echo {
    Stdout,
    Stderr,
}

impl Echo {
    async fn write(self, chunk: &[u8]) {
        // Echo failures must not affect the task
        match self {
            Echo::Stdout => {
                let mut out = tokio::io::stdout();
                let _ = out.write_all(chunk).await;
                let _ = out.flush().await;
            }
            Echo::Stderr => {
                let mut err = tokio::io::stderr();
                let _ = err.write_all(chunk).await;
                let _ = err.flush().await;
            }
        }
    }
}

type Captured = Arc<Mutex<Vec<u8>>>;

#[async_trait]
impl TaskRunner for ShellRunner {
    fn task_type(&self) -> TaskType {
        TaskType::Shell
    }

    async fn execute(&self, task: &TaskKind, context: &RunnerContext) -> RunnerResult {
        match task {
            TaskKind::Shell(shell) => self.run(shell, context).await,
            other => wrong_kind(TaskType::Shell, other),
        }
    }
}

impl ShellRunner {
    async fn run(&self, shell: &ShellTask, context: &RunnerContext) -> RunnerResult {
        let command = template::interpolate(&shell.command, &context.environment);
        info!("Executing shell task: {} - {}", context.task_id, command);

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&command)
            .envs(template::interpolate_map(
                &shell.environment,
                &context.environment,
            ))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so a timeout also reaches backgrounded grandchildren
        #[cfg(unix)]
        cmd.process_group(0);

        if let Some(ref cwd) = shell.cwd {
            let cwd = template::interpolate(&cwd.to_string_lossy(), &context.environment);
            cmd.current_dir(PathBuf::from(cwd));
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn shell task {}: {}", context.task_id, e);
                return RunnerResult::failure(format!("Failed to spawn shell command: {}", e));
            }
        };

        let stdout = Captured::default();
        let stderr = Captured::default();
        let stdout_pump = child.stdout.take().map(|pipe| {
            tokio::spawn(pump(
                pipe,
                Arc::clone(&stdout),
                shell.live_output.then_some(Echo::Stdout),
            ))
        });
        let stderr_pump = child.stderr.take().map(|pipe| {
            tokio::spawn(pump(
                pipe,
                Arc::clone(&stderr),
                shell.live_output.then_some(Echo::Stderr),
            ))
        });

        let waited = timeout(context.timeout, child.wait()).await;

        if waited.is_err() {
            warn!(
                "Shell task {} exceeded {}ms, killing it",
                context.task_id,
                context.timeout.as_millis()
            );
            if let Err(e) = kill_process_group(child.id()) {
                debug!("Process group kill failed for {}: {}", context.task_id, e);
            }
            if let Err(e) = child.kill().await {
                debug!("Kill after timeout failed for {}: {}", context.task_id, e);
            }
        }

        drain(stdout_pump).await;
        drain(stderr_pump).await;
        let stdout = collect(&stdout).await;
        let stderr = collect(&stderr).await;

        match waited {
            Err(_) => RunnerResult::failure(format!(
                "Task timeout after {}ms",
                context.timeout.as_millis()
            ))
            .with_output(stdout, stderr, None),
            Ok(Err(e)) => RunnerResult::failure(format!("Failed to wait for shell command: {}", e))
                .with_output(stdout, stderr, None),
            Ok(Ok(status)) => match status.code() {
                Some(0) => {
                    debug!("Shell task {} exited successfully", context.task_id);
                    RunnerResult::success(JsonValue::String(stdout.clone())).with_output(
                        stdout,
                        stderr,
                        Some(0),
                    )
                }
                Some(code) => RunnerResult::failure(format!(
                    "Shell command failed with exit code {}",
                    code
                ))
                .with_output(stdout, stderr, Some(code)),
                None => RunnerResult::failure("Shell command terminated by signal")
                    .with_output(stdout, stderr, None),
            },
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) -> std::io::Result<()> {
    let Some(pgid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return Ok(());
    };
    // SAFETY: kill(2) takes plain integers and touches no memory of ours
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) -> std::io::Result<()> {
    Ok(())
}

async fn pump<R>(mut reader: R, sink: Captured, echo: Option<Echo>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                sink.lock().await.extend_from_slice(&buf[..n]);
                if let Some(echo) = echo {
                    echo.write(&buf[..n]).await;
                }
            }
        }
    }
}

async fn drain(pump: Option<JoinHandle<()>>) {
    if let Some(mut handle) = pump {
        if timeout(OUTPUT_DRAIN_GRACE, &mut handle).await.is_err() {
            handle.abort();
        }
    }
}

async fn collect(captured: &Captured) -> String {
    String::from_utf8_lossy(&captured.lock().await).into_owned()
}
