//! Chat TCP server.
//!
//! Accepts connections on the main runtime and hands each socket to an I/O
//! worker. A sweeper task closes sessions whose heartbeat has lapsed and
//! republishes the online count after every pass.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::connection::{run_connection, SessionLimits};
use super::load::LoadReporter;
use super::logic::ChatLogic;
use super::registry::SessionRegistry;
use super::worker_pool::IoWorkerPool;
use crate::application::services::DirectoryApi;
use crate::config::ChatSettings;
use crate::domain::LoadStore;
use crate::infrastructure::metrics;

/// How long shutdown waits for open sessions to flush and unregister.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ChatServer {
    listener: TcpListener,
    settings: ChatSettings,
    logic: Arc<ChatLogic>,
    workers: IoWorkerPool,
}

impl ChatServer {
    /// Bind the listener and start the I/O workers.
    pub async fn bind(
        settings: ChatSettings,
        directory: Arc<dyn DirectoryApi>,
        loads: Arc<dyn LoadStore>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(settings.bind_addr()).await?;
        let workers = IoWorkerPool::new(settings.workers)?;

        let registry = Arc::new(SessionRegistry::new());
        let reporter = Arc::new(LoadReporter::new(
            settings.name.clone(),
            loads,
            Arc::clone(&registry),
        ));
        let logic = Arc::new(ChatLogic::new(registry, directory, reporter));

        Ok(Self {
            listener,
            settings,
            logic,
            workers,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(self.logic.registry())
    }

    /// Serve until `shutdown` resolves, then close every session, clear this
    /// server's load counter and stop the workers.
    pub async fn run_until_stopped<F>(mut self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let reporter = Arc::clone(self.logic.reporter());
        reporter.start().await;
        info!(
            server = %self.settings.name,
            addr = %self.local_addr()?,
            workers = self.workers.size(),
            "Chat server listening"
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let sweeper = spawn_sweeper(
            Arc::clone(&self.logic),
            self.settings.sweep_interval(),
            self.settings.heartbeat_timeout(),
            stop_rx,
        );

        let limits = SessionLimits::from(&self.settings);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.dispatch(stream, peer, limits),
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
            }
        }

        let _ = stop_tx.send(true);
        if let Err(e) = sweeper.await {
            error!(error = %e, "Sweeper task failed");
        }

        let registry = self.registry();
        let closing = registry.close_all();
        debug!(sessions = closing, "Closing sessions");
        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
            while !registry.is_empty() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        if drained.is_err() {
            warn!(remaining = registry.len(), "Sessions still open after drain timeout");
        }

        reporter.stop().await;
        self.workers.shutdown();
        info!(server = %self.settings.name, "Chat server stopped");
        Ok(())
    }

    /// Move an accepted socket onto the next worker's runtime.
    fn dispatch(&self, stream: TcpStream, peer: SocketAddr, limits: SessionLimits) {
        let std_stream = match stream.into_std() {
            Ok(s) => s,
            Err(e) => {
                warn!(%peer, error = %e, "Failed to detach accepted socket");
                return;
            }
        };
        if let Err(e) = std_stream.set_nodelay(true) {
            debug!(%peer, error = %e, "Failed to set TCP_NODELAY");
        }

        let logic = Arc::clone(&self.logic);
        self.workers.spawn(async move {
            match TcpStream::from_std(std_stream) {
                Ok(stream) => run_connection(stream, peer, logic, limits).await,
                Err(e) => warn!(%peer, error = %e, "Failed to attach socket to worker"),
            }
        });
    }
}

/// Periodically close sessions whose heartbeat has lapsed.
pub fn spawn_sweeper(
    logic: Arc<ChatLogic>,
    every: Duration,
    threshold: Duration,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let expired = logic.registry().sweep(Instant::now(), threshold);
                    if !expired.is_empty() {
                        info!(count = expired.len(), "Closed sessions with expired heartbeats");
                        for _ in &expired {
                            metrics::record_session_close("heartbeat_timeout");
                        }
                    }
                    logic.reporter().report().await;
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("Heartbeat sweeper stopped");
    })
}
