//! StatsCalculator: totals, averages and maxima over a bounded window.

use bandmon::stats::summarize;
use bandmon::types::{Sample, StatsSummary};

fn sample(rx: f64, tx: f64) -> Sample {
    Sample {
        interface: "ether1".to_string(),
        rx_bits: rx,
        tx_bits: tx,
        timestamp: "2024-05-01T10:00:00.000Z".to_string(),
    }
}

#[test]
fn empty_window_yields_all_zeros() {
    let summary = summarize(std::iter::empty::<&Sample>());
    assert_eq!(summary, StatsSummary::default());
    assert_eq!(summary.avg_rx, 0.0);
    assert_eq!(summary.avg_tx, 0.0);
}

#[test]
fn totals_averages_and_maxima() {
    let window = vec![sample(10.0, 2.0), sample(20.0, 4.0), sample(30.0, 6.0)];
    let summary = summarize(&window);
    assert_eq!(summary.total_rx, 60.0);
    assert_eq!(summary.total_tx, 12.0);
    assert_eq!(summary.avg_rx, 20.0);
    assert_eq!(summary.avg_tx, 4.0);
    assert_eq!(summary.max_rx, 30.0);
    assert_eq!(summary.max_tx, 6.0);
}

#[test]
fn single_sample_window() {
    let window = vec![sample(7.5, 1.5)];
    let summary = summarize(&window);
    assert_eq!(summary.total_rx, 7.5);
    assert_eq!(summary.avg_rx, 7.5);
    assert_eq!(summary.max_tx, 1.5);
}
