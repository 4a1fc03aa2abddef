//! Unix socket lifecycle.
//!
//! The API is served on a filesystem socket that other software may delete
//! while the helper runs. [`SocketManager`] owns that socket:
//!
//! ```text
//! Unbound ──start()──► Bound(gen 1) ──recheck(), file missing──► Bound(gen 2) ──► ...
//!                          │                                         │
//!                          └──────────── shutdown() ◄────────────────┘
//! ```
//!
//! On rebinding the previous generation is retired rather than closed. It
//! keeps serving whatever connections it already has and is stopped after
//! `retire_after` (or at shutdown). Dropping a tokio listener never unlinks
//! its path, so retiring an old generation cannot remove the new socket file.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use parking_lot::RwLock;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default socket path.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/sysproxy-helper.sock";

/// World read/write so an unprivileged caller can connect.
pub const DEFAULT_SOCKET_MODE: u32 = 0o666;

/// Time in-flight requests get to finish at shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Delay before checking that a rebound socket file is in place.
pub const DEFAULT_VERIFY_DELAY: Duration = Duration::from_millis(100);

/// How long a replaced listener keeps running before it is stopped.
pub const DEFAULT_RETIRE_AFTER: Duration = Duration::from_secs(30);

/// Socket configuration.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Filesystem path of the socket.
    pub path: PathBuf,
    /// Permission bits applied after every bind.
    pub mode: u32,
    /// Grace period for in-flight requests at shutdown.
    pub shutdown_grace: Duration,
    /// Delay before verifying a rebound socket.
    pub verify_delay: Duration,
    /// When to stop a replaced listener (`None` keeps it until shutdown).
    pub retire_after: Option<Duration>,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SOCKET_PATH),
            mode: DEFAULT_SOCKET_MODE,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            verify_delay: DEFAULT_VERIFY_DELAY,
            retire_after: Some(DEFAULT_RETIRE_AFTER),
        }
    }
}

impl SocketConfig {
    /// Creates a config for a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Sets the shutdown grace period.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Sets the rebind verification delay.
    pub fn with_verify_delay(mut self, delay: Duration) -> Self {
        self.verify_delay = delay;
        self
    }

    /// Sets when replaced listeners are stopped.
    pub fn with_retire_after(mut self, retire_after: Option<Duration>) -> Self {
        self.retire_after = retire_after;
        self
    }
}

/// Socket lifecycle errors.
#[derive(Debug, Error)]
pub enum SocketError {
    /// A stale file at the socket path could not be removed.
    #[error("failed to remove existing socket file {path}: {source}")]
    Cleanup { path: PathBuf, source: io::Error },

    /// Binding the listener failed.
    #[error("failed to bind {path}: {source}")]
    Bind { path: PathBuf, source: io::Error },

    /// Setting socket permissions failed.
    #[error("failed to set socket permissions on {path}: {source}")]
    Permissions { path: PathBuf, source: io::Error },

    /// The socket file was not present after rebinding.
    #[error("socket file {path} missing after rebinding")]
    Verify { path: PathBuf },

    /// `start` was called twice.
    #[error("socket already started")]
    AlreadyStarted,

    /// The manager has been shut down.
    #[error("socket manager is shut down")]
    ShutDown,
}

/// The endpoint the router is currently reachable on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEndpoint {
    pub path: PathBuf,
    /// Starts at 1 and increments on every rebinding.
    pub generation: u64,
}

/// Result of a recheck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecheckOutcome {
    /// The socket file was still there; nothing changed.
    Present,
    /// The socket file was missing and a new listener now serves it.
    Rebound { generation: u64 },
}

/// One bound listener and the task serving it.
struct Serving {
    endpoint: SocketEndpoint,
    stop: Arc<watch::Sender<bool>>,
    task: JoinHandle<()>,
}

impl Serving {
    fn stop(&self) {
        self.stop.send_replace(true);
    }
}

#[derive(Default)]
struct Generations {
    current: Option<Serving>,
    retired: Vec<Serving>,
    last: u64,
    closed: bool,
}

/// Owns the listening socket, its rebinding and its removal.
pub struct SocketManager {
    config: SocketConfig,
    router: Router,
    /// Serializes start, rebinding and shutdown.
    generations: Mutex<Generations>,
    /// Snapshot for readers; only written while `generations` is held.
    current: RwLock<Option<SocketEndpoint>>,
}

impl std::fmt::Debug for SocketManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketManager")
            .field("config", &self.config)
            .field("current", &*self.current.read())
            .finish()
    }
}

impl SocketManager {
    /// Creates an unbound manager serving `router`.
    pub fn new(config: SocketConfig, router: Router) -> Self {
        Self {
            config,
            router,
            generations: Mutex::new(Generations::default()),
            current: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// The endpoint currently serving, if any.
    pub fn current(&self) -> Option<SocketEndpoint> {
        self.current.read().clone()
    }

    /// Removes any stale file, binds the socket and starts serving.
    pub async fn start(&self) -> Result<SocketEndpoint, SocketError> {
        let mut generations = self.generations.lock().await;
        if generations.closed {
            return Err(SocketError::ShutDown);
        }
        if generations.current.is_some() {
            return Err(SocketError::AlreadyStarted);
        }

        let path = &self.config.path;
        remove_path(path).map_err(|source| SocketError::Cleanup {
            path: path.clone(),
            source,
        })?;

        let serving = self.bind_and_serve(generations.last + 1)?;
        generations.last = serving.endpoint.generation;
        let endpoint = serving.endpoint.clone();
        generations.current = Some(serving);
        *self.current.write() = Some(endpoint.clone());

        info!(path = %path.display(), "Socket created successfully");
        Ok(endpoint)
    }

    /// Rebinds the socket if its file has disappeared.
    pub async fn recheck(&self) -> Result<RecheckOutcome, SocketError> {
        let mut generations = self.generations.lock().await;
        if generations.closed {
            return Err(SocketError::ShutDown);
        }

        let path = &self.config.path;
        if socket_file_present(path).await {
            debug!(path = %path.display(), "Socket file exists, no need to recreate");
            return Ok(RecheckOutcome::Present);
        }

        info!(path = %path.display(), "Socket file not found, recreating listener");

        if let Err(e) = remove_path(path) {
            warn!(path = %path.display(), error = %e, "Failed to remove socket remnants");
        }

        let serving = self.bind_and_serve(generations.last + 1)?;
        let generation = serving.endpoint.generation;
        generations.last = generation;
        *self.current.write() = Some(serving.endpoint.clone());

        if let Some(previous) = generations.current.replace(serving) {
            self.retire(&mut generations, previous);
        }

        tokio::time::sleep(self.config.verify_delay).await;
        if !socket_file_present(path).await {
            warn!(path = %path.display(), "Socket file verification failed");
            return Err(SocketError::Verify { path: path.clone() });
        }

        info!(path = %path.display(), generation, "Successfully recreated listener and socket file");
        Ok(RecheckOutcome::Rebound { generation })
    }

    /// Stops accepting, waits up to the grace period, then removes the socket file.
    pub async fn shutdown(&self) {
        let mut generations = self.generations.lock().await;
        generations.closed = true;

        let serving: Vec<Serving> = generations
            .current
            .take()
            .into_iter()
            .chain(generations.retired.drain(..))
            .collect();
        *self.current.write() = None;

        for s in &serving {
            s.stop();
        }

        let mut tasks: Vec<JoinHandle<()>> = serving.into_iter().map(|s| s.task).collect();
        let grace = self.config.shutdown_grace;
        let drained = tokio::time::timeout(grace, futures::future::join_all(tasks.iter_mut())).await;
        if drained.is_err() {
            warn!(
                grace_secs = grace.as_secs_f64(),
                "Grace period elapsed with requests in flight, aborting"
            );
            for task in &tasks {
                task.abort();
            }
        }

        let path = &self.config.path;
        match remove_path(path) {
            Ok(()) => info!(path = %path.display(), "Socket file removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove socket file"),
        }
    }

    fn bind_and_serve(&self, generation: u64) -> Result<Serving, SocketError> {
        let path = &self.config.path;

        let listener = UnixListener::bind(path).map_err(|source| SocketError::Bind {
            path: path.clone(),
            source,
        })?;

        if let Err(source) =
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(self.config.mode))
        {
            drop(listener);
            return Err(SocketError::Permissions {
                path: path.clone(),
                source,
            });
        }

        let (stop, mut stop_rx) = watch::channel(false);
        let router = self.router.clone();
        let task = tokio::spawn(async move {
            let stopped = async move {
                let _ = stop_rx.wait_for(|stop| *stop).await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(stopped)
                .await
            {
                error!(generation, error = %e, "Server error");
            }
            debug!(generation, "Listener stopped");
        });

        debug!(path = %path.display(), generation, "Listener bound");
        Ok(Serving {
            endpoint: SocketEndpoint {
                path: path.clone(),
                generation,
            },
            stop: Arc::new(stop),
            task,
        })
    }

    fn retire(&self, generations: &mut Generations, previous: Serving) {
        generations.retired.retain(|s| !s.task.is_finished());

        let generation = previous.endpoint.generation;
        match self.config.retire_after {
            Some(after) => {
                info!(generation, after_secs = after.as_secs_f64(), "Old listener will be stopped after quiescence");
                let stop = Arc::clone(&previous.stop);
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    stop.send_replace(true);
                    debug!(generation, "Retired listener stopped");
                });
            }
            None => info!(generation, "Old listener will exit at shutdown"),
        }

        generations.retired.push(previous);
    }
}

async fn socket_file_present(path: &Path) -> bool {
    match tokio::fs::symlink_metadata(path).await {
        Ok(_) => true,
        Err(e) => e.kind() != io::ErrorKind::NotFound,
    }
}

/// Removes whatever is at `path`; a missing path is fine.
fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}
