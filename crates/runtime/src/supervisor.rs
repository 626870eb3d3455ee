// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parent-side worker lifecycle: spawn, deadline, drain, classify.

use crate::fault;
use crate::forward;
use crate::memory;
use crate::spawn::{self, SpawnError, WorkerSpawnConfig};
use airlift_client::ClientError;
use airlift_core::{AirdropEvent, EventType, OutboundEventType, RuntimeOptions};
use airlift_wire::{read_frame, write_frame, ParentMessage, WorkerInput, WorkerMessage};
use std::os::unix::process::ExitStatusExt;
use std::time::Duration;
use tokio::io::AsyncReadExt;

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("spawn error: {0}")]
    Spawn(#[from] SpawnError),
    #[error("client error: {0}")]
    Client(#[from] ClientError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// How the worker process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerTermination {
    /// Exited on its own with this code.
    Exited(i32),
    /// Died to this signal.
    Signaled(i32),
    /// Killed by the supervisor after the grace period.
    DeadlineKilled,
    /// No worker was spawned (unrecognized event type).
    NotSpawned,
}

/// What one invocation produced.
#[derive(Debug)]
pub struct InvocationOutcome {
    /// Event the worker delivered itself, if any.
    pub emitted: Option<OutboundEventType>,
    /// Fault event the supervisor synthesized, if any.
    pub synthesized: Option<OutboundEventType>,
    pub termination: WorkerTermination,
}

/// Complete an invocation without spawning a worker.
///
/// Deletion starts map to their "done" events so a connector with no
/// deletion logic still answers; anything else is a fault.
pub async fn run_no_script(
    event: AirdropEvent,
    options: RuntimeOptions,
) -> Result<InvocationOutcome, SupervisorError> {
    let outbound = match airlift_core::routing::no_script_done_for(event.event_type) {
        Some(done) => {
            fault::post_event(&event, &options, done, airlift_core::EventData::default())
                .await?;
            done
        }
        None => {
            fault::synthesize_fault(&event, &options, "No worker implementation available")
                .await?
        }
    };

    Ok(InvocationOutcome {
        emitted: None,
        synthesized: Some(outbound),
        termination: WorkerTermination::NotSpawned,
    })
}

/// Run one worker for one incoming event, returning after the terminal
/// event is guaranteed: either the worker emitted or a fault was
/// synthesized. Exactly one outbound event per invocation.
pub async fn run_worker(
    event: AirdropEvent,
    options: RuntimeOptions,
    spawn_config: WorkerSpawnConfig,
) -> Result<InvocationOutcome, SupervisorError> {
    if event.event_type == EventType::Unknown {
        tracing::error!("unrecognized event type, no worker spawned");
        let fault =
            fault::synthesize_fault(&event, &options, "Unrecognized event type").await?;
        return Ok(InvocationOutcome {
            emitted: None,
            synthesized: Some(fault),
            termination: WorkerTermination::NotSpawned,
        });
    }

    let mut child = spawn::spawn_worker(&spawn_config)?;
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other("worker stdin not piped"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("worker stdout not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("worker stderr not piped"))?;
    let stderr_tail = tokio::spawn(collect_stderr_tail(stderr));

    let input = WorkerInput { event: event.clone(), options: options.clone() };
    if let Err(e) = write_frame(&mut stdin, &input).await {
        tracing::error!(error = %e, "failed to hand input to worker");
    }

    // Frame reading runs in its own task: reading a frame is not
    // cancel-safe, and the select below must be free to fire timers
    // mid-frame.
    let (frames_tx, mut frames) = tokio::sync::mpsc::unbounded_channel();
    let reader = tokio::spawn(async move {
        let mut stdout = stdout;
        loop {
            match read_frame::<_, WorkerMessage>(&mut stdout).await {
                Ok(Some(message)) => {
                    if frames_tx.send(message).is_err() {
                        break;
                    }
                }
                // EOF or a torn frame both mean the worker is going away.
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "worker stream error");
                    break;
                }
            }
        }
    });

    let mut emitted: Option<OutboundEventType> = None;
    let mut deadline_fired = false;
    let mut killed_for_deadline = false;

    let deadline = tokio::time::sleep(options.deadline());
    tokio::pin!(deadline);
    // Armed only after the deadline fires.
    let grace = tokio::time::sleep(FAR_FUTURE);
    tokio::pin!(grace);

    loop {
        tokio::select! {
            message = frames.recv() => match message {
                Some(WorkerMessage::Emitted { event_type }) => {
                    tracing::info!(%event_type, "worker emitted");
                    emitted = Some(event_type);
                }
                Some(WorkerMessage::Log(frame)) => forward::forward_log(&frame),
                Some(WorkerMessage::Done) => {}
                None => break,
            },
            _ = &mut deadline, if !deadline_fired => {
                deadline_fired = true;
                tracing::warn!("worker deadline expired, sending exit signal");
                if write_frame(&mut stdin, &ParentMessage::Exit).await.is_err() {
                    // Pipe already gone; skip straight to the kill.
                    grace.as_mut().reset(tokio::time::Instant::now());
                } else {
                    grace.as_mut()
                        .reset(tokio::time::Instant::now() + options.grace_period());
                }
            }
            _ = &mut grace, if deadline_fired && !killed_for_deadline => {
                tracing::warn!("worker did not drain within grace period, terminating");
                killed_for_deadline = true;
                let _ = child.start_kill();
            }
        }
    }

    drop(stdin);
    let _ = reader.await;
    // The pipe is closed, so the worker is expected to exit promptly; a
    // worker that lingers past the grace period is killed like a
    // deadline overrun.
    let wait_ceiling = options.grace_period().max(Duration::from_secs(1));
    let status = match tokio::time::timeout(wait_ceiling, child.wait()).await {
        Ok(status) => status?,
        Err(_) => {
            tracing::warn!("worker closed its pipe but did not exit, terminating");
            killed_for_deadline = true;
            let _ = child.start_kill();
            child.wait().await?
        }
    };
    let stderr_tail = stderr_tail.await.unwrap_or_default();

    let termination = if killed_for_deadline {
        WorkerTermination::DeadlineKilled
    } else if let Some(code) = status.code() {
        WorkerTermination::Exited(code)
    } else {
        WorkerTermination::Signaled(status.signal().unwrap_or_default())
    };
    tracing::info!(?termination, "worker exited");

    // At-most-one invariant: a worker that already emitted gets no
    // synthesized event, whatever its exit looked like.
    let synthesized = if emitted.is_some() {
        None
    } else {
        let oom = !killed_for_deadline
            && memory::is_oom_termination(
                &stderr_tail,
                status.signal(),
                spawn_config.apply_memory_limit,
            );
        let message =
            if oom { "Worker exceeded memory limit" } else { "Worker exited the process" };
        if !stderr_tail.is_empty() {
            tracing::debug!(stderr = %stderr_tail, "worker stderr tail");
        }
        Some(fault::synthesize_fault(&event, &options, message).await?)
    };

    Ok(InvocationOutcome { emitted, synthesized, termination })
}

const FAR_FUTURE: Duration = Duration::from_secs(86_400);

const STDERR_TAIL_BYTES: usize = 64 * 1024;

/// Capture the trailing bytes of the worker's stderr for exit
/// classification.
async fn collect_stderr_tail(mut stderr: tokio::process::ChildStderr) -> String {
    let mut tail = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match stderr.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&chunk[..n]);
                if tail.len() > STDERR_TAIL_BYTES {
                    let cut = tail.len() - STDERR_TAIL_BYTES;
                    tail.drain(..cut);
                }
            }
        }
    }
    String::from_utf8_lossy(&tail).into_owned()
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
