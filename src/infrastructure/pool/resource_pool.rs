//! Generic resource pool with periodic health checking.
//!
//! Resources are either idle in the pool or checked out through a
//! [`PooledConnection`] guard, never both. Dropping the guard releases the
//! resource. Closing the pool wakes every waiter with `None`.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::PoolError;
use crate::config::PoolSettings;
use crate::infrastructure::metrics;

/// Creates and probes one kind of backing resource.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: Send + 'static;

    /// Label used in logs and metrics.
    fn name(&self) -> &str;

    /// Open a brand-new resource with the original connection parameters.
    async fn connect(&self) -> Result<Self::Connection, PoolError>;

    /// Cheap liveness check on an idle resource.
    async fn probe(&self, conn: &mut Self::Connection) -> Result<(), PoolError>;
}

/// Pool sizing and health-check cadence.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Fixed number of resources the pool maintains
    pub size: usize,
    /// Idle resources unused for at least this long are probed
    pub staleness: Duration,
    /// Interval of the background health checker
    pub check_interval: Duration,
}

impl PoolConfig {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            staleness: Duration::from_secs(5),
            check_interval: Duration::from_secs(60),
        }
    }

    pub fn from_settings(size: u32, settings: &PoolSettings) -> Self {
        Self {
            size: size as usize,
            staleness: settings.staleness(),
            check_interval: settings.check_interval(),
        }
    }
}

/// Snapshot of a pool's occupancy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    pub capacity: usize,
    pub idle: usize,
    pub checked_out: usize,
    pub pending_failures: usize,
    pub stopped: bool,
}

/// Outcome of one health-check cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthReport {
    pub probed: usize,
    pub failed: usize,
    pub reconnected: usize,
}

struct PooledResource<T> {
    conn: T,
    last_used: Instant,
}

impl<T> PooledResource<T> {
    fn new(conn: T) -> Self {
        Self {
            conn,
            last_used: Instant::now(),
        }
    }
}

struct PoolState<T> {
    idle: VecDeque<PooledResource<T>>,
    checked_out: usize,
    stopped: bool,
}

struct PoolInner<C: Connector> {
    connector: C,
    config: PoolConfig,
    state: Mutex<PoolState<C::Connection>>,
    /// Signalled once per released resource
    available: Notify,
    /// Signalled once when the pool closes
    shutdown: Notify,
    /// Dead resources awaiting reconnection
    failures: AtomicUsize,
}

impl<C: Connector> PoolInner<C> {
    /// Put a resource back without touching its timestamp.
    fn return_idle(&self, resource: PooledResource<C::Connection>) {
        let mut state = self.state.lock();
        state.checked_out = state.checked_out.saturating_sub(1);
        if state.stopped {
            return;
        }
        state.idle.push_back(resource);
        drop(state);
        self.available.notify_one();
    }

    fn release(&self, mut resource: PooledResource<C::Connection>) {
        resource.last_used = Instant::now();
        self.return_idle(resource);
    }

    fn discard_broken(&self) {
        let stopped = {
            let mut state = self.state.lock();
            state.checked_out = state.checked_out.saturating_sub(1);
            state.stopped
        };
        if !stopped {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn status(&self) -> PoolStatus {
        let state = self.state.lock();
        PoolStatus {
            capacity: self.config.size,
            idle: state.idle.len(),
            checked_out: state.checked_out,
            pending_failures: self.failures.load(Ordering::SeqCst),
            stopped: state.stopped,
        }
    }
}

/// Bounded pool of resources produced by a [`Connector`].
pub struct ResourcePool<C: Connector> {
    inner: Arc<PoolInner<C>>,
}

impl<C: Connector> Clone for ResourcePool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> std::fmt::Debug for ResourcePool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("name", &self.inner.connector.name())
            .field("status", &self.inner.status())
            .finish()
    }
}

impl<C: Connector> ResourcePool<C> {
    /// Fill a new pool with `config.size` resources.
    ///
    /// Resources that fail to connect are counted as failures and retried by
    /// the first health-check cycle, so a pool can start partially filled.
    pub async fn new(connector: C, config: PoolConfig) -> Self {
        let mut idle = VecDeque::with_capacity(config.size);
        let mut failures = 0;

        for _ in 0..config.size {
            match connector.connect().await {
                Ok(conn) => idle.push_back(PooledResource::new(conn)),
                Err(e) => {
                    warn!(pool = connector.name(), error = %e, "Initial connection failed");
                    failures += 1;
                }
            }
        }

        info!(
            pool = connector.name(),
            size = config.size,
            connected = idle.len(),
            "Resource pool created"
        );

        Self {
            inner: Arc::new(PoolInner {
                connector,
                config,
                state: Mutex::new(PoolState {
                    idle,
                    checked_out: 0,
                    stopped: false,
                }),
                available: Notify::new(),
                shutdown: Notify::new(),
                failures: AtomicUsize::new(failures),
            }),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.connector.name()
    }

    pub fn connector(&self) -> &C {
        &self.inner.connector
    }

    /// Wait for an idle resource.
    ///
    /// Returns `None` once the pool is closed, including for callers that
    /// were already waiting when `close` ran.
    pub async fn acquire(&self) -> Option<PooledConnection<C>> {
        loop {
            // Register interest before inspecting the queue so a release
            // between the check and the await is not missed.
            let notified = self.inner.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.inner.state.lock();
                if state.stopped {
                    return None;
                }
                if let Some(resource) = state.idle.pop_front() {
                    state.checked_out += 1;
                    return Some(PooledConnection {
                        pool: Arc::clone(&self.inner),
                        resource: Some(resource),
                    });
                }
            }

            notified.await;
        }
    }

    /// Hand a resource back to the idle set. Same as dropping the guard.
    pub fn release(&self, conn: PooledConnection<C>) {
        drop(conn);
    }

    /// Probe every idle resource that has sat unused past the staleness
    /// threshold. Dead resources are dropped and counted for [`reconnect`].
    ///
    /// [`reconnect`]: Self::reconnect
    pub async fn health_check(&self) -> HealthReport {
        let mut report = HealthReport::default();
        let target = {
            let state = self.inner.state.lock();
            if state.stopped {
                return report;
            }
            state.idle.len()
        };

        let now = Instant::now();
        for _ in 0..target {
            let mut resource = {
                let mut state = self.inner.state.lock();
                if state.stopped {
                    break;
                }
                match state.idle.pop_front() {
                    Some(resource) => {
                        state.checked_out += 1;
                        resource
                    }
                    None => break,
                }
            };

            if now.saturating_duration_since(resource.last_used) < self.inner.config.staleness {
                self.inner.return_idle(resource);
                continue;
            }

            report.probed += 1;
            match self.inner.connector.probe(&mut resource.conn).await {
                Ok(()) => {
                    resource.last_used = now;
                    self.inner.return_idle(resource);
                }
                Err(e) => {
                    warn!(pool = self.name(), error = %e, "Pooled resource failed liveness probe");
                    metrics::record_pool_probe_failure(self.name());
                    report.failed += 1;
                    drop(resource);
                    self.inner.discard_broken();
                }
            }
        }

        report
    }

    /// Replace dead resources, one connect attempt per counted failure.
    ///
    /// A failed attempt ends the cycle; the remaining failures stay counted
    /// for the next cycle.
    pub async fn reconnect(&self) -> usize {
        let mut restored = 0;

        while self.inner.failures.load(Ordering::SeqCst) > 0 {
            {
                let state = self.inner.state.lock();
                if state.stopped {
                    break;
                }
                if state.idle.len() + state.checked_out >= self.inner.config.size {
                    self.inner.failures.store(0, Ordering::SeqCst);
                    break;
                }
            }

            match self.inner.connector.connect().await {
                Ok(conn) => {
                    {
                        let mut state = self.inner.state.lock();
                        if state.stopped {
                            break;
                        }
                        state.idle.push_back(PooledResource::new(conn));
                    }
                    self.inner.available.notify_one();
                    let _ = self.inner.failures.fetch_update(
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                        |n| n.checked_sub(1),
                    );
                    restored += 1;
                    info!(pool = self.name(), "Pooled resource reconnected");
                }
                Err(e) => {
                    warn!(pool = self.name(), error = %e, "Reconnect failed, retrying next cycle");
                    break;
                }
            }
        }

        restored
    }

    /// One full cycle: probe stale resources, then replace dead ones.
    pub async fn maintain(&self) -> HealthReport {
        let mut report = self.health_check().await;
        report.reconnected = self.reconnect().await;
        let status = self.status();
        metrics::set_pool_status(self.name(), status.idle, status.checked_out);
        report
    }

    /// Run [`maintain`](Self::maintain) every `check_interval` until the pool closes.
    pub fn spawn_health_checker(&self) -> JoinHandle<()> {
        let pool = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(pool.inner.config.check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // Skip first immediate tick

            loop {
                let shutdown = pool.inner.shutdown.notified();
                if pool.is_closed() {
                    break;
                }

                tokio::select! {
                    _ = ticker.tick() => {
                        let report = pool.maintain().await;
                        debug!(
                            pool = pool.name(),
                            probed = report.probed,
                            failed = report.failed,
                            reconnected = report.reconnected,
                            "Pool health check finished"
                        );
                    }
                    _ = shutdown => break,
                }
            }

            debug!(pool = pool.name(), "Pool health checker stopped");
        })
    }

    /// Stop the pool. Waiters return `None`, idle resources are dropped,
    /// and resources released later are discarded. Idempotent.
    pub fn close(&self) {
        let drained = {
            let mut state = self.inner.state.lock();
            if state.stopped {
                return;
            }
            state.stopped = true;
            std::mem::take(&mut state.idle)
        };

        self.inner.failures.store(0, Ordering::SeqCst);
        self.inner.available.notify_waiters();
        self.inner.shutdown.notify_waiters();
        info!(pool = self.name(), dropped = drained.len(), "Resource pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().stopped
    }

    pub fn status(&self) -> PoolStatus {
        self.inner.status()
    }
}

/// Type-erased view of a pool, for callers that watch pools of different
/// resource types side by side.
#[async_trait]
pub trait ManagedPool: Send + Sync {
    fn name(&self) -> &str;

    fn status(&self) -> PoolStatus;

    /// Run one health-check pass now.
    async fn check(&self) -> HealthReport;

    fn close(&self);
}

#[async_trait]
impl<C: Connector> ManagedPool for ResourcePool<C> {
    fn name(&self) -> &str {
        ResourcePool::name(self)
    }

    fn status(&self) -> PoolStatus {
        ResourcePool::status(self)
    }

    async fn check(&self) -> HealthReport {
        self.health_check().await
    }

    fn close(&self) {
        ResourcePool::close(self)
    }
}

/// A checked-out resource. Returns to the pool when dropped.
pub struct PooledConnection<C: Connector> {
    pool: Arc<PoolInner<C>>,
    resource: Option<PooledResource<C::Connection>>,
}

impl<C: Connector> PooledConnection<C> {
    /// Drop a resource the caller found to be dead. The pool replaces it on
    /// its next reconnect cycle.
    pub fn invalidate(mut self) {
        if self.resource.take().is_some() {
            warn!(pool = self.pool.connector.name(), "Pooled resource invalidated by caller");
            self.pool.discard_broken();
        }
    }
}

impl<C: Connector> Deref for PooledConnection<C> {
    type Target = C::Connection;

    fn deref(&self) -> &Self::Target {
        match &self.resource {
            Some(resource) => &resource.conn,
            None => unreachable!("pooled resource is present until the guard is consumed"),
        }
    }
}

impl<C: Connector> DerefMut for PooledConnection<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.resource {
            Some(resource) => &mut resource.conn,
            None => unreachable!("pooled resource is present until the guard is consumed"),
        }
    }
}

impl<C: Connector> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.pool.release(resource);
        }
    }
}
