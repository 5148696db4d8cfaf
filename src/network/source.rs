//! Platform connectivity adapters.

use super::state::NetworkState;
use crate::Result;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::watch;

/// A platform API delivering connectivity snapshots and change events.
#[async_trait]
pub trait ConnectivitySource: Send + Sync {
    /// Point-in-time fetch.
    async fn fetch(&self) -> Result<NetworkState>;

    /// Every subsequent change, in order.
    fn changes(&self) -> BoxStream<'static, NetworkState>;
}

/// Connectivity driven by explicit calls; used by platform glue and tests.
pub struct ManualConnectivity {
    tx: watch::Sender<NetworkState>,
}

impl ManualConnectivity {
    pub fn new(initial: NetworkState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn set(&self, state: NetworkState) {
        self.tx.send_replace(state);
    }

    pub fn current(&self) -> NetworkState {
        self.tx.borrow().clone()
    }
}

#[async_trait]
impl ConnectivitySource for ManualConnectivity {
    async fn fetch(&self) -> Result<NetworkState> {
        Ok(self.current())
    }

    fn changes(&self) -> BoxStream<'static, NetworkState> {
        let rx = self.tx.subscribe();
        stream::unfold(rx, |mut rx| async move {
            rx.changed().await.ok()?;
            let state = rx.borrow_and_update().clone();
            Some((state, rx))
        })
        .boxed()
    }
}

/// A fixed snapshot that never changes (e.g. a CLI that assumes connectivity).
pub struct StaticConnectivity {
    state: NetworkState,
}

impl StaticConnectivity {
    pub fn new(state: NetworkState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ConnectivitySource for StaticConnectivity {
    async fn fetch(&self) -> Result<NetworkState> {
        Ok(self.state.clone())
    }

    fn changes(&self) -> BoxStream<'static, NetworkState> {
        stream::pending().boxed()
    }
}
