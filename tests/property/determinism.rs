//! Property-based tests for determinism guarantees

use kiln::cli::context_data::parse_context_pairs;
use kiln::context::Metadata;
use kiln::fingerprint::{compute_group_key, fingerprint};
use kiln::grouping::output_file_name;
use kiln::paths::resolve_identifier;
use kiln::staleness::{IgnoreKeysComparator, MetadataComparator};
use proptest::prelude::*;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}"
}

fn output_path() -> impl Strategy<Value = PathBuf> {
    prop::collection::vec(segment(), 1..4)
        .prop_map(|parts| Path::new("/ws/generated").join(parts.join("/")))
}

fn metadata() -> impl Strategy<Value = Metadata> {
    prop::collection::btree_map(segment(), any::<i64>(), 0..6).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect()
    })
}

proptest! {
    #[test]
    fn fingerprint_is_deterministic(content in any::<Vec<u8>>()) {
        prop_assert_eq!(fingerprint(&content), fingerprint(&content.clone()));
    }

    #[test]
    fn fingerprint_detects_single_byte_change(
        content in prop::collection::vec(any::<u8>(), 1..256),
        index in any::<prop::sample::Index>(),
    ) {
        let mut changed = content.clone();
        let i = index.index(changed.len());
        changed[i] = changed[i].wrapping_add(1);
        prop_assert_ne!(fingerprint(&content), fingerprint(&changed));
    }

    #[test]
    fn group_key_is_stable(outputs in prop::collection::vec(output_path(), 1..5)) {
        prop_assert_eq!(compute_group_key(&outputs), compute_group_key(&outputs.clone()));
    }

    #[test]
    fn group_key_depends_on_order(a in output_path(), b in output_path()) {
        prop_assume!(a != b);
        prop_assert_ne!(
            compute_group_key(&[a.clone(), b.clone()]),
            compute_group_key(&[b, a])
        );
    }

    #[test]
    fn group_key_ignores_redundant_components(parts in prop::collection::vec(segment(), 1..4)) {
        let clean = Path::new("/ws/generated").join(parts.join("/"));
        let noisy = Path::new("/ws/./generated/x/..").join(parts.join("/./"));
        prop_assert_eq!(
            compute_group_key(&[resolve_identifier(&clean)]),
            compute_group_key(&[resolve_identifier(&noisy)])
        );
    }

    #[test]
    fn output_name_drops_only_the_marker(stem in segment(), ext in segment()) {
        prop_assume!(stem != "tmpl" && ext != "tmpl");
        let input = PathBuf::from(format!("templates/{}.tmpl.{}", stem, ext));
        prop_assert_eq!(
            output_file_name(&input, Some("tmpl")),
            Some(OsString::from(format!("{}.{}", stem, ext)))
        );
        prop_assert_eq!(
            output_file_name(&input, None),
            Some(OsString::from(format!("{}.tmpl.{}", stem, ext)))
        );
    }

    #[test]
    fn float_metadata_survives_persistence(value in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        let meta: Metadata = std::iter::once(("scale".to_string(), Value::from(value))).collect();
        let restored = Metadata::from_json(&meta.to_json().unwrap()).unwrap();
        prop_assert_eq!(restored, meta);
    }

    #[test]
    fn comparator_is_reflexive(meta in metadata(), ignored in prop::collection::vec(segment(), 0..3)) {
        let comparator = IgnoreKeysComparator::new(ignored);
        prop_assert!(comparator.equivalent(&meta, &meta.clone()));
    }

    #[test]
    fn comparator_ignores_only_listed_keys(meta in metadata(), key in segment(), value in any::<i64>()) {
        let mut changed: Metadata = meta
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .chain(std::iter::once((key.clone(), Value::from(value))))
            .collect();
        let ignoring = IgnoreKeysComparator::new([key.clone()]);
        prop_assert!(ignoring.equivalent(&changed, &meta));

        changed = meta.without_keys(&[key.clone()]);
        let strict = IgnoreKeysComparator::default();
        prop_assert_eq!(strict.equivalent(&changed, &meta), meta.get(&key).is_none());
    }

    #[test]
    fn context_pairs_keep_value_text(key in segment(), value in "[ -~]{0,20}") {
        let pairs = vec![format!("{}={}", key, value)];
        let parsed = parse_context_pairs(&pairs).unwrap();
        prop_assert_eq!(parsed.get(&key), Some(&Value::String(value)));
    }

    #[test]
    fn repeated_context_keys_collect_in_order(key in segment(), values in prop::collection::vec("[a-z0-9]{0,6}", 2..5)) {
        let pairs: Vec<String> = values.iter().map(|v| format!("{}={}", key, v)).collect();
        let parsed = parse_context_pairs(&pairs).unwrap();
        let expected = Value::Array(values.into_iter().map(Value::String).collect());
        prop_assert_eq!(parsed.get(&key), Some(&expected));
    }
}
