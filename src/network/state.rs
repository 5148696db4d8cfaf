//! Connectivity snapshot and derived quality.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    None,
    Unknown,
    Wifi,
    Ethernet,
    Cellular,
    Bluetooth,
    Vpn,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellularGeneration {
    #[serde(rename = "2g")]
    G2,
    #[serde(rename = "3g")]
    G3,
    #[serde(rename = "4g")]
    G4,
    #[serde(rename = "5g")]
    G5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionQuality {
    Offline,
    Poor,
    Good,
    Excellent,
}

/// Point-in-time connectivity as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    pub is_connected: bool,
    pub is_internet_reachable: bool,
    pub transport: TransportType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cellular_generation: Option<CellularGeneration>,
}

impl NetworkState {
    pub fn offline() -> Self {
        Self {
            is_connected: false,
            is_internet_reachable: false,
            transport: TransportType::None,
            cellular_generation: None,
        }
    }

    pub fn online(transport: TransportType) -> Self {
        Self {
            is_connected: true,
            is_internet_reachable: true,
            transport,
            cellular_generation: None,
        }
    }

    pub fn cellular(generation: CellularGeneration) -> Self {
        Self {
            cellular_generation: Some(generation),
            ..Self::online(TransportType::Cellular)
        }
    }

    pub fn is_online(&self) -> bool {
        self.is_connected && self.is_internet_reachable
    }

    /// Quality is a pure function of the snapshot.
    pub fn quality(&self) -> ConnectionQuality {
        if !self.is_online() {
            return ConnectionQuality::Offline;
        }
        match self.transport {
            TransportType::Wifi | TransportType::Ethernet => ConnectionQuality::Excellent,
            TransportType::Cellular => match self.cellular_generation {
                Some(CellularGeneration::G2) | Some(CellularGeneration::G3) => {
                    ConnectionQuality::Poor
                }
                _ => ConnectionQuality::Good,
            },
            TransportType::Vpn => ConnectionQuality::Good,
            _ => ConnectionQuality::Poor,
        }
    }
}

impl Default for NetworkState {
    fn default() -> Self {
        Self::offline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_online_requires_connected_and_reachable() {
        let mut s = NetworkState::online(TransportType::Wifi);
        assert!(s.is_online());
        s.is_internet_reachable = false;
        assert!(!s.is_online());
        assert_eq!(s.quality(), ConnectionQuality::Offline);
    }

    #[test]
    fn test_quality_by_transport() {
        assert_eq!(
            NetworkState::online(TransportType::Ethernet).quality(),
            ConnectionQuality::Excellent
        );
        assert_eq!(
            NetworkState::cellular(CellularGeneration::G5).quality(),
            ConnectionQuality::Good
        );
        assert_eq!(
            NetworkState::cellular(CellularGeneration::G3).quality(),
            ConnectionQuality::Poor
        );
        assert_eq!(
            NetworkState::online(TransportType::Cellular).quality(),
            ConnectionQuality::Good
        );
        assert_eq!(
            NetworkState::online(TransportType::Bluetooth).quality(),
            ConnectionQuality::Poor
        );
        assert_eq!(NetworkState::offline().quality(), ConnectionQuality::Offline);
    }
}
