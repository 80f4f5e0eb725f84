//! SampleValidator behavior: both envelope shapes, timestamp fallback
//! priority, and drop-not-coerce handling of malformed items.

use chrono::{TimeZone, Utc};

use bandmon::types::Envelope;
use bandmon::validate::{validate, validate_at};

fn parse_envelope(json: &str) -> Envelope {
    serde_json::from_str(json).expect("envelope json")
}

fn fixed_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

#[test]
fn bare_array_envelope_is_accepted() {
    let env = parse_envelope(
        r#"[{"interface":"ether1","rxBits":100,"txBits":50,"timestamp":"2024-05-01T10:00:00Z"}]"#,
    );
    let out = validate(&env);
    assert_eq!(out.dropped, 0);
    assert_eq!(out.samples.len(), 1);
    assert_eq!(out.samples[0].interface, "ether1");
    assert_eq!(out.samples[0].rx_bits, 100.0);
    assert_eq!(out.samples[0].tx_bits, 50.0);
}

#[test]
fn wrapped_envelope_is_accepted() {
    let env = parse_envelope(
        r#"{"data":[{"interface":"wlan1","rxBits":1,"txBits":2,"timestamp":"2024-05-01T10:00:00Z"}],"timestamp":"2024-05-01T09:00:00Z","interval":2000}"#,
    );
    let out = validate(&env);
    assert_eq!(out.samples.len(), 1);
    // Item timestamp wins over the envelope fallback.
    assert_eq!(out.samples[0].timestamp, "2024-05-01T10:00:00.000Z");
}

#[test]
fn non_numeric_bits_dropped_without_aborting_batch() {
    // Scenario: one bad item alongside one valid item.
    let env = parse_envelope(
        r#"{"data":[
            {"interface":"ether1","rxBits":"not-a-number","txBits":1,"timestamp":"2024-05-01T10:00:00Z"},
            {"interface":"ether1","rxBits":5,"txBits":1,"timestamp":"2024-05-01T10:00:02Z"}
        ]}"#,
    );
    let out = validate(&env);
    assert_eq!(out.samples.len(), 1);
    assert_eq!(out.dropped, 1);
    assert_eq!(out.samples[0].rx_bits, 5.0);
}

#[test]
fn structurally_broken_sibling_does_not_poison_batch() {
    // A wrong-typed field fails only its own item.
    let env = parse_envelope(
        r#"{"data":[
            {"interface":123,"rxBits":1,"txBits":1,"timestamp":"2024-05-01T10:00:00Z"},
            {"interface":"ether1","rxBits":5,"txBits":1,"timestamp":"2024-05-01T10:00:02Z"}
        ]}"#,
    );
    let out = validate(&env);
    assert_eq!(out.dropped, 1);
    assert_eq!(out.samples.len(), 1);
    assert_eq!(out.samples[0].interface, "ether1");
}

#[test]
fn null_and_non_object_items_drop_alone() {
    let env = parse_envelope(
        r#"[
            null,
            "garbage",
            {"interface":"lan1","rxBits":3,"txBits":1,"timestamp":"2024-05-01T10:00:00Z"}
        ]"#,
    );
    let out = validate(&env);
    assert_eq!(out.dropped, 2);
    assert_eq!(out.samples.len(), 1);
    assert_eq!(out.samples[0].interface, "lan1");
}

#[test]
fn missing_interface_is_dropped() {
    let env = parse_envelope(
        r#"[
            {"rxBits":5,"txBits":1,"timestamp":"2024-05-01T10:00:00Z"},
            {"interface":"","rxBits":5,"txBits":1,"timestamp":"2024-05-01T10:00:00Z"},
            {"interface":"lan1","rxBits":5,"txBits":1,"timestamp":"2024-05-01T10:00:00Z"}
        ]"#,
    );
    let out = validate(&env);
    assert_eq!(out.dropped, 2);
    assert_eq!(out.samples.len(), 1);
    assert_eq!(out.samples[0].interface, "lan1");
}

#[test]
fn negative_bits_are_dropped() {
    let env =
        parse_envelope(r#"[{"interface":"ether1","rxBits":-5,"txBits":1,"timestamp":"2024-05-01T10:00:00Z"}]"#);
    let out = validate(&env);
    assert_eq!(out.dropped, 1);
    assert!(out.samples.is_empty());
}

#[test]
fn envelope_timestamp_fills_missing_item_timestamp() {
    let env = parse_envelope(
        r#"{"data":[{"interface":"ether1","rxBits":1,"txBits":1}],"timestamp":"2024-05-01T08:30:00+02:00"}"#,
    );
    let out = validate_at(&env, fixed_now());
    // Normalized to UTC milliseconds.
    assert_eq!(out.samples[0].timestamp, "2024-05-01T06:30:00.000Z");
}

#[test]
fn current_time_is_last_resort_timestamp() {
    let env = parse_envelope(r#"[{"interface":"ether1","rxBits":1,"txBits":1}]"#);
    let out = validate_at(&env, fixed_now());
    assert_eq!(out.samples[0].timestamp, "2024-05-01T12:00:00.000Z");
}

#[test]
fn unparseable_item_timestamp_falls_through_to_envelope() {
    let env = parse_envelope(
        r#"{"data":[{"interface":"ether1","rxBits":1,"txBits":1,"timestamp":"yesterday"}],"timestamp":"2024-05-01T10:00:00Z"}"#,
    );
    let out = validate_at(&env, fixed_now());
    assert_eq!(out.dropped, 0);
    assert_eq!(out.samples[0].timestamp, "2024-05-01T10:00:00.000Z");
}

#[test]
fn surviving_items_keep_input_order() {
    let env = parse_envelope(
        r#"[
            {"interface":"b","rxBits":1,"txBits":1,"timestamp":"2024-05-01T10:00:02Z"},
            {"interface":"a","rxBits":1,"txBits":"bad","timestamp":"2024-05-01T10:00:00Z"},
            {"interface":"a","rxBits":1,"txBits":1,"timestamp":"2024-05-01T10:00:01Z"}
        ]"#,
    );
    let out = validate(&env);
    let order: Vec<&str> = out.samples.iter().map(|s| s.interface.as_str()).collect();
    assert_eq!(order, vec!["b", "a"]);
    assert_eq!(out.dropped, 1);
}
