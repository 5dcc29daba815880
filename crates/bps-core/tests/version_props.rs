use bps_core::{compare_versions, Checksum};
use proptest::prelude::*;
use serde_json::json;

fn version() -> impl Strategy<Value = String> {
    proptest::collection::vec(0u64..20, 1..4).prop_map(|segments| {
        segments
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".")
    })
}

proptest! {
    #[test]
    fn prop_compare_is_reflexive(v in version()) {
        prop_assert_eq!(compare_versions(&v, &v), std::cmp::Ordering::Equal);
    }

    #[test]
    fn prop_compare_is_antisymmetric(a in version(), b in version()) {
        prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
    }

    #[test]
    fn prop_trailing_zero_is_ignored(v in version()) {
        let padded = format!("{v}.0");
        prop_assert_eq!(compare_versions(&v, &padded), std::cmp::Ordering::Equal);
    }

    #[test]
    fn prop_checksum_ignores_key_order(a in any::<i64>(), b in ".*") {
        let first = json!({"a": a, "b": b.clone()});
        let mut second = serde_json::Map::new();
        second.insert("b".into(), json!(b));
        second.insert("a".into(), json!(a));
        prop_assert_eq!(Checksum::of_value(&first), Checksum::of_value(&second.into()));
    }
}
