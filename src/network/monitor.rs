//! Process-wide connectivity tracker.

use super::source::ConnectivitySource;
use super::state::{ConnectionQuality, NetworkState};
use crate::Result;
use arc_swap::ArcSwap;
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

type Listener = Arc<dyn Fn(&NetworkState) + Send + Sync>;

/// Tracks connectivity and notifies subscribers on change.
///
/// Constructed once at startup with [`NetworkMonitor::init`], which seeds the
/// state from one fetch before any listener can fire, then follows the source's
/// change stream for the life of the process. Other components receive the
/// monitor by `Arc` rather than reading a global.
pub struct NetworkMonitor {
    state: ArcSwap<NetworkState>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
    online_tx: watch::Sender<bool>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

/// Handle returned by [`NetworkMonitor::add_listener`]. The listener stays
/// registered while the handle is alive and is removed when it is dropped.
#[must_use = "dropping a Subscription removes its listener"]
pub struct Subscription {
    id: u64,
    monitor: Weak<NetworkMonitor>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.upgrade() {
            monitor.remove_listener(self.id);
        }
    }
}

impl NetworkMonitor {
    /// A monitor with a fixed initial state and no platform source attached.
    pub fn with_state(initial: NetworkState) -> Arc<Self> {
        let (online_tx, _rx) = watch::channel(initial.is_online());
        Arc::new(Self {
            state: ArcSwap::from_pointee(initial),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            online_tx,
            pump: Mutex::new(None),
        })
    }

    /// Seed from `source.fetch()` and follow `source.changes()` until shutdown.
    pub async fn init(source: Arc<dyn ConnectivitySource>) -> Result<Arc<Self>> {
        // Subscribe before fetching so no change between the two is lost.
        let mut changes = source.changes();
        let initial = source.fetch().await?;
        info!(
            online = initial.is_online(),
            transport = ?initial.transport,
            "network monitor initialised"
        );
        let monitor = Self::with_state(initial);

        let weak = Arc::downgrade(&monitor);
        let handle = tokio::spawn(async move {
            while let Some(state) = changes.next().await {
                match weak.upgrade() {
                    Some(m) => m.update(state),
                    None => break,
                }
            }
            debug!("connectivity change stream ended");
        });
        *monitor.pump.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        Ok(monitor)
    }

    /// Apply a platform callback. Listeners fire only when the snapshot changed.
    pub fn update(&self, next: NetworkState) {
        let prev = self.state.swap(Arc::new(next.clone()));
        if *prev == next {
            return;
        }
        debug!(
            online = next.is_online(),
            transport = ?next.transport,
            quality = ?next.quality(),
            "network state changed"
        );
        let online = next.is_online();
        self.online_tx.send_if_modified(|v| {
            let changed = *v != online;
            *v = online;
            changed
        });

        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(&next);
        }
    }

    pub fn current_state(&self) -> NetworkState {
        self.state.load().as_ref().clone()
    }

    pub fn is_online(&self) -> bool {
        self.state.load().is_online()
    }

    pub fn connection_quality(&self) -> ConnectionQuality {
        self.state.load().quality()
    }

    pub fn add_listener<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(&NetworkState) + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(listener)));
        Subscription {
            id,
            monitor: Arc::downgrade(self),
        }
    }

    fn remove_listener(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(lid, _)| *lid != id);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Receiver that wakes whenever online/offline flips.
    pub fn watch_online(&self) -> watch::Receiver<bool> {
        self.online_tx.subscribe()
    }

    /// Stop following the platform source.
    pub fn shutdown(&self) {
        if let Some(handle) = self.pump.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
