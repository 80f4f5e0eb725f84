//! Types that mirror the dashboard backend's JSON schema, plus the frames
//! exchanged on the live-data channel.

use serde::{Deserialize, Serialize};

/// One bandwidth measurement for one interface at one instant.
///
/// Produced by validation and immutable afterwards; `timestamp` is RFC 3339
/// UTC with millisecond precision, so lexicographic order equals temporal
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub interface: String,
    #[serde(rename = "rxBits")]
    pub rx_bits: f64,
    #[serde(rename = "txBits")]
    pub tx_bits: f64,
    pub timestamp: String,
}

/// A sample as it arrives on the wire, decoded from a single envelope item
/// during validation. Fields are optional or loosely typed; anything this
/// shape cannot absorb is a per-item drop, not a batch failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSample {
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(default, rename = "rxBits")]
    pub rx_bits: Option<serde_json::Value>,
    #[serde(default, rename = "txBits")]
    pub tx_bits: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// The unit delivered on the live-data channel: either a bare array of
/// samples or a wrapper whose `timestamp`/`interval` act as fallbacks for
/// items that omit their own.
///
/// Items stay raw JSON here and are decoded one by one during validation,
/// so a structurally broken item (`null`, a number where a string belongs)
/// is dropped on its own and never fails the whole envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Wrapped {
        data: Vec<serde_json::Value>,
        #[serde(default)]
        timestamp: Option<String>,
        #[serde(default)]
        interval: Option<u64>,
    },
    Bare(Vec<serde_json::Value>),
}

/// The single logical live-data interest: delivery interval plus an
/// interface filter (empty = all currently active interfaces).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeOptions {
    #[serde(rename = "interval")]
    pub interval_ms: u64,
    pub interfaces: Vec<String>,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            interfaces: Vec::new(),
        }
    }
}

/// Outbound frames, tagged by event name on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum ClientFrame {
    #[serde(rename = "subscribe-bandwidth")]
    Subscribe { data: SubscribeOptions },
    #[serde(rename = "unsubscribe-bandwidth")]
    Unsubscribe,
}

/// Inbound frames. Anything but `bandwidth-data` is informational.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event")]
pub enum ServerFrame {
    #[serde(rename = "bandwidth-data")]
    BandwidthData { data: Envelope },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        data: serde_json::Value,
    },
    #[serde(rename = "warning")]
    Warning {
        #[serde(default)]
        data: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

/// Transport session state, owned exclusively by the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Snapshot of the session, readable by consumers at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Monotonically increasing id of the established connection, if any.
    pub connection_id: Option<u64>,
    /// Consecutive failed attempts since the last successful handshake.
    pub attempts: u32,
}

impl ConnectionStatus {
    pub fn connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Which half of a duplex measurement a series plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Rx,
    Tx,
}

/// One plottable line: points are aligned to the dataset's shared axis and
/// `None` marks a gap that must render as a break, not a flat segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub interface: String,
    pub direction: Direction,
    pub color: String,
    pub dashed: bool,
    pub points: Vec<Option<f64>>,
}

/// Chart-ready projection: one shared ascending timestamp axis plus RX/TX
/// series per interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

/// Scalar summary over a window of samples. All zeros for an empty window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_rx: f64,
    pub total_tx: f64,
    pub avg_rx: f64,
    pub avg_tx: f64,
    pub max_rx: f64,
    pub max_tx: f64,
}
