//! Validation and normalization of raw envelopes into chart-ready samples.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::types::{Envelope, RawSample, Sample};

/// Outcome of validating one envelope: surviving samples in input order,
/// plus how many items were dropped. The count is for observability only;
/// callers never branch on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validated {
    pub samples: Vec<Sample>,
    pub dropped: usize,
}

/// Filter and normalize an envelope. Structurally broken items and items
/// missing an interface name or carrying non-numeric bit counts are
/// dropped, never coerced; valid siblings survive. Timestamps
/// resolve item -> envelope -> now, first parseable wins, and are rewritten
/// as RFC 3339 UTC with millisecond precision.
pub fn validate(envelope: &Envelope) -> Validated {
    validate_at(envelope, Utc::now())
}

/// Same as [`validate`] with an explicit clock for the final timestamp
/// fallback, so tests stay deterministic.
pub fn validate_at(envelope: &Envelope, now: DateTime<Utc>) -> Validated {
    let (items, envelope_ts) = match envelope {
        Envelope::Wrapped { data, timestamp, .. } => (data.as_slice(), timestamp.as_deref()),
        Envelope::Bare(items) => (items.as_slice(), None),
    };

    let envelope_ts = envelope_ts.and_then(normalize_ts);
    let now_ts = format_ts(now);

    let mut out = Validated::default();
    for value in items {
        // Decode per item: a malformed element drops alone instead of
        // failing its siblings.
        let item: RawSample = match serde_json::from_value(value.clone()) {
            Ok(item) => item,
            Err(_) => {
                out.dropped += 1;
                continue;
            }
        };
        match validate_item(&item, envelope_ts.as_deref(), &now_ts) {
            Some(sample) => out.samples.push(sample),
            None => out.dropped += 1,
        }
    }
    out
}

fn validate_item(item: &RawSample, envelope_ts: Option<&str>, now_ts: &str) -> Option<Sample> {
    let interface = item.interface.as_deref().filter(|s| !s.is_empty())?;
    let rx_bits = numeric_bits(item.rx_bits.as_ref()?)?;
    let tx_bits = numeric_bits(item.tx_bits.as_ref()?)?;

    let timestamp = item
        .timestamp
        .as_deref()
        .and_then(normalize_ts)
        .or_else(|| envelope_ts.map(str::to_owned))
        .unwrap_or_else(|| now_ts.to_owned());

    Some(Sample {
        interface: interface.to_owned(),
        rx_bits,
        tx_bits,
        timestamp,
    })
}

// Strings like "5000" are rejected on purpose: bit counts must arrive as
// JSON numbers, finite and non-negative.
fn numeric_bits(value: &serde_json::Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite() && *n >= 0.0)
}

fn normalize_ts(raw: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| format_ts(dt.with_timezone(&Utc)))
}

fn format_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
