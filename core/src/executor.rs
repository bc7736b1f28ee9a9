use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::command::BuildStep;
use crate::error::ReleaseError;

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub duration: f64,
    pub exit_code: Option<i32>,
    pub failure_reason: Option<String>,
}

/// Runs one step to completion, forwarding stdout and stderr line by line to
/// `output_callback`. The child is killed if the returned future is dropped.
pub async fn execute_step<F>(
    step: &BuildStep,
    mut output_callback: F,
) -> Result<ExecutionResult, ReleaseError>
where
    F: FnMut(String) + Send + 'static,
{
    let start = Instant::now();

    let mut child = Command::new(&step.program)
        .args(&step.args)
        .current_dir(&step.cwd)
        .envs(&step.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ReleaseError::io("Failed to spawn", &step.program, e))?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let stdout_task = child.stdout.take().map(|stdout| {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                let _ = tx.send(line);
            }
        })
    });

    let stderr_task = child.stderr.take().map(|stderr| {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                let _ = tx.send(line);
            }
        })
    });

    drop(tx);

    let callback_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            output_callback(line);
        }
    });

    let status = child
        .wait()
        .await
        .map_err(|e| ReleaseError::io("Failed to wait for", &step.program, e))?;

    for task in [stdout_task, stderr_task].into_iter().flatten() {
        let _ = task.await;
    }
    let _ = callback_task.await;

    let exit_code = status.code();
    let failure_reason = if status.success() {
        None
    } else {
        Some(describe_failure(&status))
    };

    Ok(ExecutionResult {
        success: status.success(),
        duration: start.elapsed().as_secs_f64(),
        exit_code,
        failure_reason,
    })
}

/// Runs steps in order and stops at the first unsuccessful one.
pub async fn execute_steps<F>(
    steps: &[BuildStep],
    output_callback: F,
) -> Result<Vec<ExecutionResult>, ReleaseError>
where
    F: FnMut(String) + Send + 'static + Clone,
{
    let mut results = Vec::new();

    for step in steps {
        let result = execute_step(step, output_callback.clone()).await?;
        let success = result.success;
        results.push(result);

        if !success {
            break;
        }
    }

    Ok(results)
}

#[cfg(unix)]
fn describe_failure(status: &std::process::ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;

    if let Some(signal) = status.signal() {
        let signal_name = match signal {
            1 => "SIGHUP",
            2 => "SIGINT",
            6 => "SIGABRT",
            9 => "SIGKILL",
            11 => "SIGSEGV",
            15 => "SIGTERM",
            _ => "unknown signal",
        };
        return format!("Signal {} ({})", signal, signal_name);
    }

    status
        .code()
        .map(|code| format!("Exit code {}", code))
        .unwrap_or_else(|| "Abnormal termination".to_string())
}

#[cfg(not(unix))]
fn describe_failure(status: &std::process::ExitStatus) -> String {
    status
        .code()
        .map(|code| format!("Exit code {}", code))
        .unwrap_or_else(|| "Abnormal termination".to_string())
}
