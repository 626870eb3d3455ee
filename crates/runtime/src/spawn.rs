// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process creation with resource limits applied.

use crate::memory;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("worker spawn failed: {0}")]
    Io(#[from] std::io::Error),
}

/// How to start the worker process for one invocation.
#[derive(Debug, Clone)]
pub struct WorkerSpawnConfig {
    /// Program the worker runs; it must speak the frame protocol on its
    /// stdin/stdout.
    pub worker_path: PathBuf,
    pub args: Vec<String>,
    /// Extra environment for the worker process.
    pub env: Vec<(String, String)>,
    /// Heap budget in MiB, enforced as an address-space rlimit.
    pub worker_heap_size_mb: u64,
    /// Disable the rlimit (used by tests that need unconstrained shells).
    pub apply_memory_limit: bool,
}

impl WorkerSpawnConfig {
    pub fn new(worker_path: impl Into<PathBuf>) -> Self {
        Self {
            worker_path: worker_path.into(),
            args: Vec::new(),
            env: Vec::new(),
            worker_heap_size_mb: airlift_core::options::DEFAULT_WORKER_HEAP_MB,
            apply_memory_limit: true,
        }
    }
}

/// Spawn the worker with piped stdio and, on Unix, the address-space cap
/// installed before exec.
pub fn spawn_worker(config: &WorkerSpawnConfig) -> Result<Child, SpawnError> {
    let mut command = Command::new(&config.worker_path);
    command
        .args(&config.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in &config.env {
        command.env(key, value);
    }

    if config.apply_memory_limit {
        let limit = memory::address_space_limit_bytes(config.worker_heap_size_mb);
        // pre_exec runs in the forked child before exec; setrlimit there
        // caps the worker without affecting the supervisor.
        unsafe {
            command.pre_exec(move || {
                nix::sys::resource::setrlimit(
                    nix::sys::resource::Resource::RLIMIT_AS,
                    limit,
                    limit,
                )
                .map_err(std::io::Error::from)
            });
        }
    }

    let child = command.spawn()?;
    tracing::info!(
        worker_path = %config.worker_path.display(),
        heap_mb = config.worker_heap_size_mb,
        max_old_generation_mb = memory::max_old_generation_mb(config.worker_heap_size_mb),
        memory_limit = config.apply_memory_limit,
        "worker spawned"
    );
    Ok(child)
}
