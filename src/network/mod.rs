//! 网络状态模块：跟踪连接状态、推送变更通知并评估连接质量。
//!
//! # Network State Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`NetworkMonitor`] | Tracks connectivity; listeners; derived quality |
//! | [`NetworkState`] | Snapshot: connected / reachable / transport |
//! | [`ConnectivitySource`] | Platform adapter trait (fetch + change stream) |
//! | [`ManualConnectivity`] | Explicitly driven source for glue code and tests |
//! | [`StaticConnectivity`] | Source that never changes |
//!
//! Network-classified errors are built with [`crate::Error::network`].

mod monitor;
mod source;
mod state;

pub use monitor::{NetworkMonitor, Subscription};
pub use source::{ConnectivitySource, ManualConnectivity, StaticConnectivity};
pub use state::{CellularGeneration, ConnectionQuality, NetworkState, TransportType};
