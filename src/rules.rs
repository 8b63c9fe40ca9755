//! Association rule generation and ranking

use std::cmp::Ordering;
use std::collections::HashSet;

use clap::ValueEnum;
use tracing::info;

use crate::apriori::FrequentItemsets;
use crate::error::BasketError;

/// Directional rule `antecedent -> consequent` derived from a frequent itemset
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationRule {
    pub antecedent: Vec<String>,
    pub consequent: Vec<String>,
    pub antecedent_support: f64,
    pub consequent_support: f64,
    /// Support of antecedent and consequent together
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    pub leverage: f64,
    /// Infinite when the rule always holds
    pub conviction: f64,
}

impl AssociationRule {
    /// Every item mentioned by the rule, antecedent first
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.antecedent
            .iter()
            .chain(&self.consequent)
            .map(String::as_str)
    }

    /// True when every item of the rule belongs to `allowed`
    pub fn only_uses(&self, allowed: &HashSet<String>) -> bool {
        self.items().all(|item| allowed.contains(item))
    }

    pub fn metric(&self, rank_by: RankBy) -> f64 {
        match rank_by {
            RankBy::Confidence => self.confidence,
            RankBy::Lift => self.lift,
            RankBy::Support => self.support,
        }
    }
}

/// Metric used to order rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RankBy {
    #[default]
    Confidence,
    Lift,
    Support,
}

/// Derive all rules reaching `min_confidence` from the frequent itemsets
///
/// Each itemset of size two or more is split into every non-empty proper
/// subset as antecedent and the remaining items as consequent.
///
/// # Errors
/// * `BasketError::InvalidThreshold` if `min_confidence` is outside [0, 1]
pub fn generate_rules(
    itemsets: &FrequentItemsets,
    min_confidence: f64,
) -> Result<Vec<AssociationRule>, BasketError> {
    validate_min_confidence(min_confidence)?;

    let mut rules = Vec::new();
    for (columns, support) in itemsets.indexed().filter(|(columns, _)| columns.len() >= 2) {
        let Some(full_mask) = 1u64.checked_shl(columns.len() as u32).map(|bit| bit - 1) else {
            continue;
        };

        for mask in 1..full_mask {
            let (antecedent, consequent): (Vec<(usize, usize)>, Vec<(usize, usize)>) = columns
                .iter()
                .copied()
                .enumerate()
                .partition(|&(i, _)| mask & (1 << i) != 0);
            let antecedent: Vec<usize> = antecedent.into_iter().map(|(_, col)| col).collect();
            let consequent: Vec<usize> = consequent.into_iter().map(|(_, col)| col).collect();

            // subsets of a frequent itemset are frequent themselves
            let (Some(antecedent_support), Some(consequent_support)) = (
                itemsets.support_of_columns(&antecedent),
                itemsets.support_of_columns(&consequent),
            ) else {
                continue;
            };

            let confidence = support / antecedent_support;
            if confidence < min_confidence {
                continue;
            }

            rules.push(AssociationRule {
                antecedent: itemsets.item_ids_of(&antecedent),
                consequent: itemsets.item_ids_of(&consequent),
                antecedent_support,
                consequent_support,
                support,
                confidence,
                lift: confidence / consequent_support,
                leverage: support - antecedent_support * consequent_support,
                conviction: conviction(consequent_support, confidence),
            });
        }
    }

    info!(rules = rules.len(), min_confidence, "association rules generated");
    Ok(rules)
}

pub fn validate_min_confidence(min_confidence: f64) -> Result<(), BasketError> {
    if (0.0..=1.0).contains(&min_confidence) {
        Ok(())
    } else {
        Err(BasketError::InvalidThreshold(min_confidence))
    }
}

fn conviction(consequent_support: f64, confidence: f64) -> f64 {
    if confidence >= 1.0 {
        f64::INFINITY
    } else {
        (1.0 - consequent_support) / (1.0 - confidence)
    }
}

/// Order rules by `rank_by` descending and keep at most `limit` of them.
///
/// Ties fall back to lift, then confidence, then the antecedent and
/// consequent item ids in lexicographic order.
pub fn rank_rules(
    mut rules: Vec<AssociationRule>,
    rank_by: RankBy,
    limit: Option<usize>,
) -> Vec<AssociationRule> {
    rules.sort_by(|a, b| compare_rules(a, b, rank_by));
    if let Some(limit) = limit {
        rules.truncate(limit);
    }
    rules
}

fn compare_rules(a: &AssociationRule, b: &AssociationRule, rank_by: RankBy) -> Ordering {
    b.metric(rank_by)
        .total_cmp(&a.metric(rank_by))
        .then_with(|| b.lift.total_cmp(&a.lift))
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| a.antecedent.cmp(&b.antecedent))
        .then_with(|| a.consequent.cmp(&b.consequent))
}
