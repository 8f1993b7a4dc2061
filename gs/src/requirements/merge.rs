//! Combining two requirement snapshots

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::model::Requirement;

/// Merge `new` into `existing`, preferring non-empty values from `new`
///
/// Scalars are replaced only when `new` has something to say, spec maps are
/// unioned with `new` winning on collisions, sets are unioned, and the score
/// never decreases. Priorities are replaced wholesale since their order matters.
pub fn merge(existing: &Requirement, new: &Requirement) -> Requirement {
    debug!(
        existing_score = %existing.completeness_score,
        new_score = %new.completeness_score,
        "merge: called"
    );

    Requirement {
        product_category: prefer_non_empty(&new.product_category, &existing.product_category),
        budget: new.budget.clone().or_else(|| existing.budget.clone()),
        use_case: prefer_non_empty(&new.use_case, &existing.use_case),
        must_have_specs: union_map(&existing.must_have_specs, &new.must_have_specs),
        nice_to_have_specs: union_map(&existing.nice_to_have_specs, &new.nice_to_have_specs),
        deal_breakers: union_set(&existing.deal_breakers, &new.deal_breakers),
        preferred_brands: union_set(&existing.preferred_brands, &new.preferred_brands),
        excluded_brands: union_set(&existing.excluded_brands, &new.excluded_brands),
        priorities: if new.priorities.is_empty() {
            existing.priorities.clone()
        } else {
            new.priorities.clone()
        },
        completeness_score: existing.completeness_score.max(new.completeness_score),
        raw_input: format!("{}\n{}", existing.raw_input, new.raw_input).trim().to_string(),
    }
}

fn prefer_non_empty(new: &str, existing: &str) -> String {
    if new.is_empty() { existing } else { new }.to_string()
}

fn union_map(existing: &BTreeMap<String, String>, new: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut merged = existing.clone();
    merged.extend(new.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

fn union_set(existing: &BTreeSet<String>, new: &BTreeSet<String>) -> BTreeSet<String> {
    existing.union(new).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::BudgetConstraint;
    use proptest::prelude::*;

    fn laptop() -> Requirement {
        let mut req = Requirement {
            product_category: "gaming laptop".to_string(),
            use_case: "AAA games".to_string(),
            completeness_score: 0.3,
            raw_input: "gaming laptop".to_string(),
            priorities: vec!["performance".to_string(), "battery".to_string()],
            ..Default::default()
        };
        req.must_have_specs.insert("gpu".to_string(), "RTX 4060".to_string());
        req.deal_breakers.insert("glossy screen".to_string());
        req
    }

    #[test]
    fn test_new_budget_fills_gap() {
        let new = Requirement {
            budget: Some(BudgetConstraint::new(1500.0).unwrap()),
            completeness_score: 0.8,
            raw_input: "under $1500".to_string(),
            ..Default::default()
        };

        let merged = merge(&laptop(), &new);
        assert_eq!(merged.product_category, "gaming laptop");
        assert_eq!(merged.budget.as_ref().map(|b| b.max), Some(1500.0));
        assert_eq!(merged.completeness_score, 0.8);
        assert_eq!(merged.raw_input, "gaming laptop\nunder $1500");
    }

    #[test]
    fn test_spec_collision_new_wins() {
        let mut new = Requirement::default();
        new.must_have_specs.insert("gpu".to_string(), "RTX 4070".to_string());
        new.must_have_specs.insert("ram".to_string(), "32GB".to_string());

        let merged = merge(&laptop(), &new);
        assert_eq!(merged.must_have_specs["gpu"], "RTX 4070");
        assert_eq!(merged.must_have_specs["ram"], "32GB");
    }

    #[test]
    fn test_priorities_replaced_not_unioned() {
        let new = Requirement {
            priorities: vec!["weight".to_string()],
            ..Default::default()
        };
        assert_eq!(merge(&laptop(), &new).priorities, vec!["weight".to_string()]);
        assert_eq!(
            merge(&laptop(), &Requirement::default()).priorities,
            laptop().priorities
        );
    }

    #[test]
    fn test_score_never_decreases() {
        let new = Requirement {
            completeness_score: 0.1,
            ..Default::default()
        };
        assert_eq!(merge(&laptop(), &new).completeness_score, 0.3);
    }

    #[test]
    fn test_raw_input_with_empty_existing() {
        let merged = merge(&Requirement::default(), &Requirement::from_raw_input("4K TV"));
        assert_eq!(merged.raw_input, "4K TV");
    }

    fn word() -> impl Strategy<Value = String> {
        "[a-z]{1,8}"
    }

    prop_compose! {
        fn arb_requirement()(
            product_category in prop_oneof![Just(String::new()), word()],
            max in proptest::option::of(1.0f64..5000.0),
            use_case in prop_oneof![Just(String::new()), word()],
            must_have_specs in proptest::collection::btree_map(word(), word(), 0..4),
            nice_to_have_specs in proptest::collection::btree_map(word(), word(), 0..4),
            deal_breakers in proptest::collection::btree_set(word(), 0..5),
            preferred_brands in proptest::collection::btree_set(word(), 0..3),
            excluded_brands in proptest::collection::btree_set(word(), 0..3),
            priorities in proptest::collection::vec(word(), 0..3),
            completeness_score in 0.0f64..=1.0,
            raw_input in word(),
        ) -> Requirement {
            Requirement {
                product_category,
                budget: max.map(|m| BudgetConstraint::new(m).unwrap()),
                use_case,
                must_have_specs,
                nice_to_have_specs,
                deal_breakers,
                preferred_brands,
                excluded_brands,
                priorities,
                completeness_score,
                raw_input,
            }
        }
    }

    proptest! {
        #[test]
        fn prop_merge_score_is_max(a in arb_requirement(), b in arb_requirement()) {
            let merged = merge(&a, &b);
            prop_assert_eq!(merged.completeness_score, a.completeness_score.max(b.completeness_score));
        }

        #[test]
        fn prop_set_fields_never_shrink(a in arb_requirement(), b in arb_requirement()) {
            let merged = merge(&a, &b);
            prop_assert!(merged.deal_breakers.len() >= a.deal_breakers.len().max(b.deal_breakers.len()));
            prop_assert!(merged.preferred_brands.len() >= a.preferred_brands.len().max(b.preferred_brands.len()));
            prop_assert!(merged.excluded_brands.len() >= a.excluded_brands.len().max(b.excluded_brands.len()));
            prop_assert!(a.deal_breakers.is_subset(&merged.deal_breakers));
            prop_assert!(b.deal_breakers.is_subset(&merged.deal_breakers));
        }

        #[test]
        fn prop_merge_with_empty_like_is_identity(a in arb_requirement(), appended in "[a-z ]{0,10}") {
            let empty_like = Requirement {
                raw_input: appended.clone(),
                ..Default::default()
            };
            let merged = merge(&a, &empty_like);

            let expected_raw = format!("{}\n{}", a.raw_input, appended).trim().to_string();
            prop_assert_eq!(&merged.raw_input, &expected_raw);

            let mut without_raw = merged.clone();
            without_raw.raw_input = a.raw_input.clone();
            prop_assert_eq!(without_raw, a);
        }
    }
}
