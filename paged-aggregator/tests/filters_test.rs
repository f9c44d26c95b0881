use paged_aggregator::{derive_key, AggregatorError, FilterName, FilterState, Result, WorkMode};
use proptest::prelude::*;
use std::collections::BTreeMap;

const TEXT_FILTERS: [FilterName; 5] = [
    FilterName::Issuer,
    FilterName::Query,
    FilterName::Category,
    FilterName::Status,
    FilterName::Ordering,
];

fn build(assignments: &[(usize, String)]) -> FilterState {
    let mut filters = FilterState::new();
    for (index, value) in assignments {
        filters
            .set(TEXT_FILTERS[*index], value.clone())
            .expect("text filters accept any value");
    }
    filters
}

fn arb_values() -> impl Strategy<Value = BTreeMap<usize, String>> {
    prop::collection::btree_map(0..TEXT_FILTERS.len(), "[a-z0-9&=+%][a-z0-9 &=+%]{0,7}", 0..TEXT_FILTERS.len())
}

proptest! {
    #[test]
    fn prop_key_ignores_construction_order(
        (ordered, shuffled) in arb_values().prop_flat_map(|values| {
            let assignments: Vec<(usize, String)> = values.into_iter().collect();
            (Just(assignments.clone()), Just(assignments).prop_shuffle())
        })
    ) {
        prop_assert_eq!(build(&ordered).derive_key(), build(&shuffled).derive_key());
    }

    #[test]
    fn prop_distinct_filters_never_collide(a in arb_values(), b in arb_values()) {
        prop_assume!(a != b);
        let a: Vec<(usize, String)> = a.into_iter().collect();
        let b: Vec<(usize, String)> = b.into_iter().collect();
        prop_assert_ne!(build(&a).derive_key(), build(&b).derive_key());
    }
}

#[test]
fn test_key_uses_canonical_order() -> Result<()> {
    let filters = FilterState::from_pairs([("query", "rust"), ("issuer", "poap")])?;
    assert_eq!(filters.derive_key(), "issuer=poap&query=rust");
    assert_eq!(derive_key(&filters), filters.derive_key());
    Ok(())
}

#[test]
fn test_empty_value_is_the_same_as_unset() -> Result<()> {
    let unset = FilterState::new().with(FilterName::Issuer, "gitpoap")?;
    let empty = FilterState::new()
        .with(FilterName::Issuer, "gitpoap")?
        .with(FilterName::Query, "")?
        .with(FilterName::Category, "   ")?;

    assert_eq!(unset, empty);
    assert_eq!(unset.derive_key(), empty.derive_key());
    assert_eq!(FilterState::new().derive_key(), "");
    Ok(())
}

#[test]
fn test_setting_empty_clears_a_filter() -> Result<()> {
    let mut filters = FilterState::new().with(FilterName::Query, "designer")?;
    filters.set(FilterName::Query, "")?;
    assert!(filters.is_empty());
    assert_eq!(filters.get(FilterName::Query), None);
    Ok(())
}

#[test]
fn test_delimiters_in_values_are_encoded() -> Result<()> {
    let tricky = FilterState::new().with(FilterName::Issuer, "a&query=b")?;
    let split = FilterState::from_pairs([("issuer", "a"), ("query", "b")])?;

    assert_eq!(tricky.derive_key(), "issuer=a%26query%3Db");
    assert_ne!(tricky.derive_key(), split.derive_key());
    Ok(())
}

#[test]
fn test_unknown_filter_is_rejected() {
    let err = FilterState::from_pairs([("colour", "red")]).unwrap_err();
    assert!(matches!(err, AggregatorError::UnknownFilter { name } if name == "colour"));
}

#[test]
fn test_work_mode_is_normalised_and_checked() -> Result<()> {
    let filters = FilterState::from_pairs([("work_mode", "Remote")])?;
    assert_eq!(filters.get(FilterName::WorkMode), Some("remote"));
    assert_eq!(filters.work_mode(), Some(WorkMode::Remote));

    let err = FilterState::from_pairs([("work_mode", "moon")]).unwrap_err();
    assert!(matches!(err, AggregatorError::InvalidFilterValue { .. }));
    Ok(())
}

#[test]
fn test_filter_names_round_trip_through_strings() {
    for name in FilterName::ALL {
        let parsed: FilterName = name.as_str().parse().expect("canonical names parse");
        assert_eq!(parsed, name);
    }
}
