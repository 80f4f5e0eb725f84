//! High-level feed facade: one connection, one subscription, one aggregator.
//! This is the surface a dashboard view consumes; it only reads snapshots
//! and never touches buffers or connection state directly.

use std::sync::{Arc, Mutex};

use crate::aggregate::TimeSeriesAggregator;
use crate::connection::{ConnectError, ConnectOptions, ConnectionManager};
use crate::stats;
use crate::types::{ChartDataset, ConnectionStatus, Sample, StatsSummary, SubscribeOptions};

pub struct LiveFeed {
    conn: ConnectionManager,
    subscribe_opts: SubscribeOptions,
    agg: Arc<Mutex<TimeSeriesAggregator>>,
}

impl LiveFeed {
    pub fn new(connect_opts: ConnectOptions, subscribe_opts: SubscribeOptions) -> Self {
        Self {
            conn: ConnectionManager::new(connect_opts),
            subscribe_opts,
            agg: Arc::new(Mutex::new(TimeSeriesAggregator::new())),
        }
    }

    pub fn connect(&self, endpoint: &str) -> Result<(), ConnectError> {
        self.conn.connect(endpoint)
    }

    /// Drop the subscription and tear the transport down. Idempotent.
    pub fn disconnect(&self) {
        self.conn.subscription().unsubscribe();
        self.conn.disconnect();
    }

    /// Register the live-update consumer. Every validated batch is folded
    /// into the aggregator before the handler runs, so the handler can read
    /// a projection that already includes the batch it was called for.
    pub fn on_live_update<F>(&self, mut handler: F)
    where
        F: FnMut(&[Sample]) + Send + 'static,
    {
        let agg = self.agg.clone();
        self.conn
            .subscription()
            .subscribe(self.subscribe_opts.clone(), move |batch: &[Sample]| {
                agg.lock().unwrap().append(batch);
                handler(batch);
            });
    }

    /// Preload history fetched out of band (the REST history endpoint) so
    /// the chart is not empty until the first live batch arrives.
    pub fn seed_history(&self, samples: &[Sample]) {
        self.agg.lock().unwrap().append(samples);
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.conn.status()
    }

    pub fn projected_series(&self) -> ChartDataset {
        self.agg.lock().unwrap().project()
    }

    pub fn summary(&self) -> StatsSummary {
        let agg = self.agg.lock().unwrap();
        stats::summarize(agg.combined())
    }
}

impl Default for LiveFeed {
    fn default() -> Self {
        Self::new(ConnectOptions::default(), SubscribeOptions::default())
    }
}
