// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-worker bootstrap: read the input frame, build the adapter, run the
//! task under a timeout-aware context, and never leak an uncaught error
//! to the host runtime.

use crate::adapter::{Adapter, ParentLink};
use crate::error::TaskError;
use crate::logging::{self, ForwardLayer};
use crate::state::ConnectorState;
use airlift_client::{build_client, ArtifactsClient, HttpConfig, MappersClient, StateClient};
use airlift_core::state::AdapterState;
use airlift_core::routing;
use airlift_wire::{read_frame, write_frame, ParentMessage, WorkerInput, WorkerMessage};
use async_trait::async_trait;
use serde_json::json;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A connector task. `execute` runs the user-supplied body; `on_timeout`
/// must wrap up with a progress or delay emission when the supervisor
/// signals the deadline.
#[async_trait]
pub trait WorkerTask<S: ConnectorState>: Send + Sync + 'static {
    async fn execute(&self, adapter: Arc<Adapter<S>>) -> Result<(), TaskError>;
    async fn on_timeout(&self, adapter: Arc<Adapter<S>>);
}

/// How the worker process should terminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Exit 0: clean completion or a drained timeout.
    Clean,
    /// Exit 1: the supervisor synthesizes the fault event.
    Fault,
}

impl WorkerExit {
    pub fn code(self) -> ExitCode {
        match self {
            WorkerExit::Clean => ExitCode::SUCCESS,
            WorkerExit::Fault => ExitCode::FAILURE,
        }
    }
}

/// Entry point a connector's worker binary calls from `main`.
///
/// Installs the frame-forwarding logger, then drives the harness over
/// the process's stdin/stdout pipes.
pub async fn run<S: ConnectorState>(task: Arc<dyn WorkerTask<S>>) -> ExitCode {
    let (tx, rx) = mpsc::unbounded_channel();
    let layer = ForwardLayer::new(tx.clone());
    let log_context = layer.context_handle();

    use tracing_subscriber::prelude::*;
    let _ = tracing_subscriber::registry().with(layer).try_init();

    run_with_io(task, tokio::io::stdin(), tokio::io::stdout(), tx, rx, log_context)
        .await
        .code()
}

/// Harness body, parameterized over the pipe endpoints for testability.
pub async fn run_with_io<S, R, W>(
    task: Arc<dyn WorkerTask<S>>,
    reader: R,
    writer: W,
    tx: mpsc::UnboundedSender<WorkerMessage>,
    rx: mpsc::UnboundedReceiver<WorkerMessage>,
    log_context: logging::LogContext,
) -> WorkerExit
where
    S: ConnectorState,
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer_shutdown = CancellationToken::new();
    let writer_handle = spawn_writer(writer, rx, writer_shutdown.clone());

    let mut reader = reader;
    let input: WorkerInput = match read_frame(&mut reader).await {
        Ok(Some(input)) => input,
        Ok(None) => {
            tracing::error!("worker input frame missing, exiting");
            return finish(WorkerExit::Fault, tx, writer_shutdown, writer_handle).await;
        }
        Err(e) => {
            tracing::error!(error = %e, "worker input frame unreadable, exiting");
            return finish(WorkerExit::Fault, tx, writer_shutdown, writer_handle).await;
        }
    };

    let event = input.event;
    let options = input.options;
    logging::fill_context(&log_context, &event);
    tracing::info!(event_type = %event.event_type, "worker starting");

    let http = match build_client(&HttpConfig::default()) {
        Ok(http) => http,
        Err(e) => {
            tracing::error!(error = %e, "http client construction failed");
            return finish(WorkerExit::Fault, tx, writer_shutdown, writer_handle).await;
        }
    };
    let retry = crate::adapter::retry_policy_from(&options);
    let token = event.execution_metadata.devrev_token.clone();
    let endpoint = event.execution_metadata.devrev_endpoint.clone();
    let state_client =
        StateClient::new(http.clone(), event.event_context.worker_data_url.clone(), &token)
            .with_retry(retry.clone());

    // Stateless events start from initial state; everything else loads,
    // and a load failure is fatal before the task starts.
    let initial_state: AdapterState<S> = if routing::is_stateless(event.event_type) {
        AdapterState::default()
    } else {
        match state_client.get().await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(error = %e, "initial state load failed");
                return finish(WorkerExit::Fault, tx, writer_shutdown, writer_handle).await;
            }
        }
    };

    let adapter = Adapter::new(
        event,
        options,
        initial_state,
        http.clone(),
        state_client,
        ArtifactsClient::new(http.clone(), &endpoint, &token).with_retry(retry.clone()),
        MappersClient::new(http, &endpoint, &token).with_retry(retry),
        ParentLink::new(tx.clone()),
    );

    // Listener for the one parent subject: the soft-timeout exit signal.
    let exit_signal = CancellationToken::new();
    let listener = tokio::spawn({
        let exit_signal = exit_signal.clone();
        async move {
            while let Ok(Some(message)) = read_frame::<_, ParentMessage>(&mut reader).await {
                match message {
                    ParentMessage::Exit => {
                        exit_signal.cancel();
                        break;
                    }
                }
            }
        }
    });

    eprintln!("DEBUG: before spawn exec");
    let mut exec = tokio::spawn({
        let task = Arc::clone(&task);
        let adapter = Arc::clone(&adapter);
        async move {
            eprintln!("DEBUG: task.execute starting");
            let r = logging::user_context(task.execute(adapter)).await;
            eprintln!("DEBUG: task.execute finished: {:?}", r.is_ok());
            r
        }
    });
    eprintln!("DEBUG: after spawn exec");

    // The drain signal covers both the parent's exit message and the
    // adapter's own soft-timeout (artifact metadata over the size
    // threshold). Biased so a drain that races task completion still
    // routes through on_timeout.
    let drain = adapter.state_handle().drain_signal().clone();
    eprintln!("DEBUG: entering select");
    let code = tokio::select! {
        biased;
        _ = async {
            tokio::select! {
                _ = exit_signal.cancelled() => (),
                _ = drain.cancelled() => (),
            }
        } => {
            eprintln!("DEBUG: drain/exit branch");
            adapter.handle_timeout();
            // Let the running task settle; its errors no longer matter.
            let _ = exec.await;
            logging::user_context(task.on_timeout(Arc::clone(&adapter))).await;
            adapter.freeze();
            adapter.parent().send(WorkerMessage::Done);
            WorkerExit::Clean
        }
        _ = adapter.parent().exit_requested().cancelled() => {
            eprintln!("DEBUG: exit_requested branch");
            exec.abort();
            let _ = exec.await;
            WorkerExit::Fault
        }
        result = &mut exec => {
            eprintln!("DEBUG: exec branch result={:?}", result.is_ok());
            match result {
            // Soft timeout landed while the task was finishing; the
            // terminal event still comes from on_timeout.
            Ok(Ok(())) if adapter.is_timeout()
                && !adapter.has_emitted()
                && !adapter.parent().exit_requested().is_cancelled() =>
            {
                logging::user_context(task.on_timeout(Arc::clone(&adapter))).await;
                adapter.freeze();
                adapter.parent().send(WorkerMessage::Done);
                WorkerExit::Clean
            }
            other => task_completed(other, &adapter),
            }
        },
    };
    eprintln!("DEBUG: select done, code={:?}", code);

    listener.abort();
    drop(adapter);
    finish(code, tx, writer_shutdown, writer_handle).await
}

fn task_completed<S: ConnectorState>(
    result: Result<Result<(), TaskError>, tokio::task::JoinError>,
    adapter: &Arc<Adapter<S>>,
) -> WorkerExit {
    match result {
        Ok(Ok(())) => {
            if adapter.parent().exit_requested().is_cancelled() {
                return WorkerExit::Fault;
            }
            if !adapter.has_emitted() {
                tracing::warn!("task finished without emitting");
            }
            adapter.parent().send(WorkerMessage::Done);
            WorkerExit::Clean
        }
        Ok(Err(error)) => {
            tracing::error!(
                error = %serde_json::to_string(&describe_task_error(&error))
                    .unwrap_or_else(|_| error.to_string()),
                "task failed"
            );
            WorkerExit::Fault
        }
        Err(join_error) => {
            tracing::error!(error = %join_error, "task aborted abnormally");
            WorkerExit::Fault
        }
    }
}

/// Flatten a task error for the parent log. HTTP errors keep their
/// structure instead of collapsing into a display string.
fn describe_task_error(error: &TaskError) -> serde_json::Value {
    if let Some(http) = error.downcast_ref::<reqwest::Error>() {
        json!({
            "kind": "http",
            "status": http.status().map(|s| s.as_u16()),
            "url": http.url().map(|u| u.to_string()),
            "is_network_error": http.is_connect() || http.is_timeout(),
        })
    } else {
        json!({ "message": error.to_string() })
    }
}

fn spawn_writer<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<WorkerMessage>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                message = rx.recv() => match message {
                    Some(message) => {
                        if write_frame(&mut writer, &message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = shutdown.cancelled() => {
                    // Drain whatever is still queued, then stop.
                    while let Ok(message) = rx.try_recv() {
                        if write_frame(&mut writer, &message).await.is_err() {
                            break;
                        }
                    }
                    break;
                }
            }
        }
    })
}

async fn finish(
    code: WorkerExit,
    tx: mpsc::UnboundedSender<WorkerMessage>,
    writer_shutdown: CancellationToken,
    writer_handle: tokio::task::JoinHandle<()>,
) -> WorkerExit {
    drop(tx);
    writer_shutdown.cancel();
    let _ = writer_handle.await;
    code
}

#[cfg(test)]
#[path = "harness_tests.rs"]
mod tests;
