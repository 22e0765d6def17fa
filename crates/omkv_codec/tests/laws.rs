//! Property tests for the codec laws: record round-trip, encoding
//! determinism, and index-key order preservation.

use omkv_codec::{decode_record, encode_record, index_bytes, FieldValue, Record};
use proptest::prelude::*;

fn finite_f64() -> impl Strategy<Value = f64> {
    any::<f64>().prop_filter("finite", |f| f.is_finite())
}

fn field_value() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        ".{0,24}".prop_map(FieldValue::Str),
        any::<i64>().prop_map(FieldValue::Int),
        finite_f64().prop_map(FieldValue::Float),
        any::<bool>().prop_map(FieldValue::Bool),
        any::<i64>().prop_map(FieldValue::Timestamp),
        "\\{\"k\":[0-9]{1,4}\\}".prop_map(FieldValue::Json),
    ]
}

fn record() -> impl Strategy<Value = Record> {
    proptest::collection::btree_map("[a-z][a-z0-9_]{0,10}", field_value(), 0..8).prop_map(|map| {
        let mut record = Record::new();
        for (name, value) in map {
            record.set(name, value);
        }
        record
    })
}

proptest! {
    #[test]
    fn record_roundtrip(record in record()) {
        let bytes = encode_record(&record).unwrap();
        let decoded = decode_record(&bytes).unwrap();
        prop_assert_eq!(decoded, record);
    }

    #[test]
    fn encoding_is_deterministic(record in record()) {
        let a = encode_record(&record).unwrap();
        let b = encode_record(&record.clone()).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn int_index_keys_preserve_order(a in any::<i64>(), b in any::<i64>()) {
        let ka = index_bytes(&FieldValue::Int(a)).unwrap();
        let kb = index_bytes(&FieldValue::Int(b)).unwrap();
        prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
    }

    #[test]
    fn float_index_keys_preserve_order(a in finite_f64(), b in finite_f64()) {
        let ka = index_bytes(&FieldValue::Float(a)).unwrap();
        let kb = index_bytes(&FieldValue::Float(b)).unwrap();
        prop_assert_eq!(ka.cmp(&kb), a.total_cmp(&b));
    }

    #[test]
    fn string_index_keys_preserve_order(a in ".{0,16}", b in ".{0,16}") {
        let ka = index_bytes(&FieldValue::Str(a.clone())).unwrap();
        let kb = index_bytes(&FieldValue::Str(b.clone())).unwrap();
        prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
    }

    #[test]
    fn timestamp_index_keys_preserve_order(a in any::<i64>(), b in any::<i64>()) {
        let ka = index_bytes(&FieldValue::Timestamp(a)).unwrap();
        let kb = index_bytes(&FieldValue::Timestamp(b)).unwrap();
        prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
    }
}
