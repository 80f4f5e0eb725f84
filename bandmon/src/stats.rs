//! Scalar summaries over a sample window.

use crate::types::{Sample, StatsSummary};

/// Totals, averages and maxima over a window, typically the aggregator's
/// combined history. Linear in the (bounded) window size and recomputed on
/// demand. An empty window yields the all-zero summary.
pub fn summarize<'a, I>(samples: I) -> StatsSummary
where
    I: IntoIterator<Item = &'a Sample>,
{
    let mut count = 0usize;
    let mut summary = StatsSummary::default();

    for sample in samples {
        count += 1;
        summary.total_rx += sample.rx_bits;
        summary.total_tx += sample.tx_bits;
        summary.max_rx = summary.max_rx.max(sample.rx_bits);
        summary.max_tx = summary.max_tx.max(sample.tx_bits);
    }

    if count > 0 {
        summary.avg_rx = summary.total_rx / count as f64;
        summary.avg_tx = summary.total_tx / count as f64;
    }
    summary
}
