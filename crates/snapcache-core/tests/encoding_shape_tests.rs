// Test suite for the published artifact shape
// Pins the exact byte layout consumers depend on: compact JSON, readAt
// first, collections in declared order, sorted payload keys.

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use snapcache_core::{CollectionScan, ScanSet, Snapshot};

fn scan(name: &str, kept: Value) -> CollectionScan {
    match kept {
        Value::Object(map) => CollectionScan {
            name: name.to_string(),
            kept: map,
            retired: Vec::new(),
        },
        other => panic!("expected object, got {:?}", other),
    }
}

#[test]
fn test_exact_artifact_bytes() {
    let read_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap();
    let scans = ScanSet {
        collections: vec![
            scan("Types", json!({"t1": {"name": "reef"}})),
            scan("Categories", json!({})),
        ],
    };

    let bytes = Snapshot::new(read_at, scans).encode().unwrap();
    let text = String::from_utf8(bytes).unwrap();

    assert_eq!(
        text,
        "{\"readAt\":\"2024-06-01T12:30:00.000000Z\",\
         \"Types\":{\"t1\":{\"name\":\"reef\"}},\
         \"Categories\":{}}"
    );
}

#[test]
fn test_payload_keys_sorted_regardless_of_arrival_order() {
    let read_at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    // serde_json::Map sorts on insert, so reversed insertion still encodes
    // identically.
    let mut reversed = serde_json::Map::new();
    reversed.insert("z".to_string(), json!(1));
    reversed.insert("a".to_string(), json!(2));
    let scans = ScanSet {
        collections: vec![scan("Types", json!({"t1": Value::Object(reversed)}))],
    };

    let text = String::from_utf8(Snapshot::new(read_at, scans).encode().unwrap()).unwrap();
    let a = text.find("\"a\":2").unwrap();
    let z = text.find("\"z\":1").unwrap();
    assert!(a < z);
}

#[test]
fn test_empty_scan_set_still_carries_read_at() {
    let read_at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let bytes = Snapshot::new(read_at, ScanSet::default()).encode().unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(value.as_object().unwrap().len(), 1);
    assert_eq!(value["readAt"], json!("2024-06-01T00:00:00.000000Z"));
}
