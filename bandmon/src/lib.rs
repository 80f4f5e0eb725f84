//! bandmon: real-time router bandwidth telemetry over WebSocket.
//!
//! Pipeline: transport frame -> validation -> subscription delivery ->
//! bounded multi-interface aggregation -> chart projection and summaries.
//! The transport reconnects on its own with bounded backoff and reissues
//! the live-data subscription after every reconnect.

pub mod aggregate;
pub mod app;
pub mod connection;
pub mod history;
pub mod profiles;
pub mod stats;
pub mod subscription;
pub mod types;
pub mod validate;

pub use app::LiveFeed;
pub use connection::{ConnectError, ConnectOptions, ConnectionManager};
pub use subscription::SubscriptionController;
pub use types::{
    ChartDataset, ConnectionState, ConnectionStatus, Envelope, Sample, StatsSummary,
    SubscribeOptions,
};
