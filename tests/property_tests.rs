//! Property-based tests for the mining core.
//!
//! Baskets are drawn over six items as bit masks, so a brute-force walk over
//! all 63 non-empty item subsets gives the reference supports.

use basketforge::{generate_rules, mine_frequent_itemsets, BasketMatrix, MiningParams};
use proptest::prelude::*;
use std::collections::BTreeMap;

const N_ITEMS: usize = 6;

fn item_name(index: usize) -> String {
    format!("I{index}")
}

fn basket_matrix(masks: &[u8]) -> BasketMatrix {
    BasketMatrix::from_baskets(masks.iter().enumerate().map(|(row, &mask)| {
        let items: Vec<String> = (0..N_ITEMS)
            .filter(|bit| mask & (1 << bit) != 0)
            .map(item_name)
            .collect();
        (format!("T{row:03}"), items)
    }))
}

/// Support of every item subset reaching `min_support`, by exhaustive counting
fn brute_force(masks: &[u8], min_support: f64) -> BTreeMap<Vec<String>, f64> {
    let mut frequent = BTreeMap::new();
    if masks.is_empty() {
        return frequent;
    }
    for subset in 1u8..(1 << N_ITEMS) {
        let count = masks.iter().filter(|&&mask| mask & subset == subset).count();
        let support = count as f64 / masks.len() as f64;
        if support >= min_support {
            let items: Vec<String> = (0..N_ITEMS)
                .filter(|bit| subset & (1 << bit) != 0)
                .map(item_name)
                .collect();
            frequent.insert(items, support);
        }
    }
    frequent
}

fn baskets() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..(1 << N_ITEMS), 0..24)
}

proptest! {
    #[test]
    fn prop_matches_brute_force(masks in baskets(), min_support in 0.05f64..=1.0) {
        let mined = mine_frequent_itemsets(&basket_matrix(&masks), &MiningParams::new(min_support)).unwrap();
        let mined: BTreeMap<Vec<String>, f64> =
            mined.iter().map(|itemset| (itemset.items, itemset.support)).collect();
        let expected = brute_force(&masks, min_support);

        prop_assert_eq!(mined.len(), expected.len());
        for (items, support) in &expected {
            let actual = mined.get(items);
            prop_assert!(actual.is_some(), "missing itemset {:?}", items);
            prop_assert!((actual.unwrap() - support).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_subsets_of_frequent_are_frequent(masks in baskets(), min_support in 0.05f64..=1.0) {
        let itemsets = mine_frequent_itemsets(&basket_matrix(&masks), &MiningParams::new(min_support)).unwrap();

        for itemset in itemsets.iter().filter(|itemset| itemset.len() >= 2) {
            for skip in 0..itemset.len() {
                let subset: Vec<&str> = itemset
                    .items
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| i != skip)
                    .map(|(_, item)| item.as_str())
                    .collect();
                let support = itemsets.support(&subset);
                prop_assert!(support.is_some(), "subset {:?} of {:?} missing", subset, itemset.items);
                prop_assert!(support.unwrap() >= itemset.support);
            }
        }
    }

    #[test]
    fn prop_rule_confidence_is_consistent(
        masks in baskets(),
        min_support in 0.05f64..=1.0,
        min_confidence in 0.0f64..=1.0,
    ) {
        let itemsets = mine_frequent_itemsets(&basket_matrix(&masks), &MiningParams::new(min_support)).unwrap();
        let rules = generate_rules(&itemsets, min_confidence).unwrap();

        for rule in &rules {
            prop_assert!((0.0..=1.0).contains(&rule.confidence));
            prop_assert!(rule.confidence >= min_confidence);
            prop_assert!(rule.lift >= 0.0);
            prop_assert!(rule.antecedent.iter().all(|item| !rule.consequent.contains(item)));

            let mut all: Vec<&str> = rule.items().collect();
            all.sort_unstable();
            let antecedent: Vec<&str> = rule.antecedent.iter().map(String::as_str).collect();
            let expected = itemsets.support(&all).unwrap() / itemsets.support(&antecedent).unwrap();
            prop_assert!((rule.confidence - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_mining_is_idempotent(masks in baskets(), min_support in 0.05f64..=1.0) {
        let basket = basket_matrix(&masks);
        let params = MiningParams::new(min_support);
        let first = mine_frequent_itemsets(&basket, &params).unwrap();
        let second = mine_frequent_itemsets(&basket, &params).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            generate_rules(&first, 0.0).unwrap(),
            generate_rules(&second, 0.0).unwrap()
        );
    }
}

#[test]
fn test_empty_transaction_contributes_zero_row() {
    let basket = BasketMatrix::from_baskets(vec![
        ("T1", vec!["A"]),
        ("T2", vec!["A"]),
        ("T3", vec![]),
    ]);
    let itemsets = mine_frequent_itemsets(&basket, &MiningParams::new(0.5)).unwrap();

    assert_eq!(itemsets.n_transactions(), 3);
    assert!((itemsets.support(&["A"]).unwrap() - 2.0 / 3.0).abs() < 1e-9);
}
