//! Multi-interface time-series aggregation: unordered validated samples in,
//! aligned bounded chart dataset out.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::history::SampleRing;
use crate::types::{ChartDataset, Direction, Sample, Series};

/// Per-interface retention, the chart's visible window.
pub const DEFAULT_INTERFACE_CAP: usize = 30;
/// Combined-history retention used for longer-range statistics.
pub const DEFAULT_COMBINED_CAP: usize = 100;

/// RX/TX color pair for one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceStyle {
    pub rx: &'static str,
    pub tx: &'static str,
}

// The router's well-known interfaces keep their fixed dashboard colors.
const KNOWN_STYLES: &[(&str, InterfaceStyle)] = &[
    ("ether1", InterfaceStyle { rx: "#3B82F6", tx: "#93C5FD" }),
    ("wlan1", InterfaceStyle { rx: "#10B981", tx: "#86EFAC" }),
    ("bridge", InterfaceStyle { rx: "#F59E0B", tx: "#FCD34D" }),
];

const FALLBACK_PALETTE: &[InterfaceStyle] = &[
    InterfaceStyle { rx: "#EF4444", tx: "#FCA5A5" },
    InterfaceStyle { rx: "#8B5CF6", tx: "#C4B5FD" },
    InterfaceStyle { rx: "#EC4899", tx: "#F9A8D4" },
    InterfaceStyle { rx: "#14B8A6", tx: "#5EEAD4" },
    InterfaceStyle { rx: "#6366F1", tx: "#A5B4FC" },
    InterfaceStyle { rx: "#6B7280", tx: "#9CA3AF" },
];

/// Style for an interface name. Known names use the fixed table; unknown
/// names get a stable palette pick derived from a hash of the name, so
/// re-renders never flicker colors.
pub fn style_for(interface: &str) -> InterfaceStyle {
    for (name, style) in KNOWN_STYLES {
        if *name == interface {
            return *style;
        }
    }
    FALLBACK_PALETTE[(fnv1a(interface) % FALLBACK_PALETTE.len() as u64) as usize]
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in s.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Bounded per-interface buffers plus a combined history, with an aligned
/// chart projection. Buffers are owned here exclusively; consumers only read
/// [`TimeSeriesAggregator::project`] snapshots.
#[derive(Debug)]
pub struct TimeSeriesAggregator {
    per_interface: BTreeMap<String, SampleRing>,
    combined: SampleRing,
    interface_cap: usize,
}

impl TimeSeriesAggregator {
    pub fn new() -> Self {
        Self::with_caps(DEFAULT_INTERFACE_CAP, DEFAULT_COMBINED_CAP)
    }

    pub fn with_caps(interface_cap: usize, combined_cap: usize) -> Self {
        Self {
            per_interface: BTreeMap::new(),
            combined: SampleRing::new(combined_cap),
            interface_cap,
        }
    }

    /// Route each sample into its interface's buffer (created on first sight
    /// of a new interface) and into the combined history. Both buffers evict
    /// FIFO at capacity and keep only the latest sample per
    /// `(interface, timestamp)` key.
    pub fn append(&mut self, samples: &[Sample]) {
        for sample in samples {
            self.per_interface
                .entry(sample.interface.clone())
                .or_insert_with(|| SampleRing::new(self.interface_cap))
                .push(sample.clone());
            self.combined.push(sample.clone());
        }
    }

    /// The combined history window, oldest first.
    pub fn combined(&self) -> impl Iterator<Item = &Sample> {
        self.combined.iter()
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &str> {
        self.per_interface.keys().map(String::as_str)
    }

    /// Number of retained samples for one interface.
    pub fn interface_len(&self, interface: &str) -> usize {
        self.per_interface.get(interface).map_or(0, SampleRing::len)
    }

    /// Build the rendering view: the union of timestamps across all
    /// per-interface buffers sorted ascending becomes the shared axis, and
    /// every interface contributes one RX and one TX series aligned to it.
    /// An interface with no sample at an axis timestamp gets an explicit
    /// `None` gap there; nothing is interpolated or carried forward.
    pub fn project(&self) -> ChartDataset {
        let mut axis: BTreeSet<&str> = BTreeSet::new();
        for ring in self.per_interface.values() {
            for sample in ring.iter() {
                axis.insert(sample.timestamp.as_str());
            }
        }
        let labels: Vec<String> = axis.iter().map(|ts| (*ts).to_owned()).collect();

        let mut series = Vec::with_capacity(self.per_interface.len() * 2);
        for (interface, ring) in &self.per_interface {
            let by_ts: HashMap<&str, &Sample> =
                ring.iter().map(|s| (s.timestamp.as_str(), s)).collect();
            let style = style_for(interface);

            series.push(Series {
                interface: interface.clone(),
                direction: Direction::Rx,
                color: style.rx.to_owned(),
                dashed: false,
                points: labels
                    .iter()
                    .map(|ts| by_ts.get(ts.as_str()).map(|s| s.rx_bits))
                    .collect(),
            });
            series.push(Series {
                interface: interface.clone(),
                direction: Direction::Tx,
                color: style.tx.to_owned(),
                dashed: true,
                points: labels
                    .iter()
                    .map(|ts| by_ts.get(ts.as_str()).map(|s| s.tx_bits))
                    .collect(),
            });
        }

        ChartDataset { labels, series }
    }
}

impl Default for TimeSeriesAggregator {
    fn default() -> Self {
        Self::new()
    }
}
