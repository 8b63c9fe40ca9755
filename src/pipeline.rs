//! End-to-end analysis run: filter, rank sellers, encode, mine, derive rules

use std::collections::HashSet;

use tracing::{info, info_span};

use crate::apriori::{mine_frequent_itemsets, FrequentItemsets, MiningParams};
use crate::data::{
    filter_by_date, restrict_to_items, top_selling_items, DateRange, ItemCatalog, NamePolicy,
};
use crate::encode::{encode_transactions, validate_records, TransactionRecord};
use crate::rules::{generate_rules, rank_rules, validate_min_confidence, AssociationRule, RankBy};

/// Parameters of one analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub min_support: f64,
    pub min_confidence: f64,
    pub max_len: Option<usize>,
    /// Number of best-selling items kept for mining
    pub top_items: usize,
    /// Cap on the number of reported rules, `None` for all
    pub max_rules: Option<usize>,
    pub rank_by: RankBy,
    pub date_range: Option<DateRange>,
    pub name_policy: NamePolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_support: 0.01,
            min_confidence: 0.01,
            max_len: None,
            top_items: 15,
            max_rules: Some(15),
            rank_by: RankBy::Confidence,
            date_range: None,
            name_policy: NamePolicy::Placeholder,
        }
    }
}

impl AnalysisConfig {
    pub fn mining_params(&self) -> MiningParams {
        MiningParams::new(self.min_support).with_max_len(self.max_len)
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.mining_params().validate()?;
        validate_min_confidence(self.min_confidence)?;
        if self.top_items == 0 {
            anyhow::bail!("top_items must be at least 1");
        }
        Ok(())
    }
}

/// An item with its total sales and display name
#[derive(Debug, Clone, PartialEq)]
pub struct NamedItemSales {
    pub item_id: String,
    pub name: String,
    pub amount: f64,
}

/// A rule together with the display names of its items
#[derive(Debug, Clone, PartialEq)]
pub struct NamedRule {
    pub rule: AssociationRule,
    pub antecedent_names: Vec<String>,
    pub consequent_names: Vec<String>,
}

/// Everything produced by one run
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub top_items: Vec<NamedItemSales>,
    pub itemsets: FrequentItemsets,
    pub rules: Vec<NamedRule>,
    /// Transactions that contained at least one top-selling item
    pub n_transactions: usize,
}

/// Run the whole analysis over a snapshot of the transaction log
///
/// # Arguments
/// * `records` - Transaction log rows
/// * `catalog` - Item id to name lookup
/// * `config` - Thresholds, caps and filters for this run
///
/// # Returns
/// * Top sellers, frequent itemsets among them and the ranked rules
pub fn run_analysis(
    records: Vec<TransactionRecord>,
    catalog: &ItemCatalog,
    config: &AnalysisConfig,
) -> crate::Result<AnalysisReport> {
    let _span = info_span!("analysis").entered();
    config.validate()?;

    let records = match &config.date_range {
        Some(range) => filter_by_date(records, range),
        None => records,
    };
    validate_records(&records)?;

    let top_sales = top_selling_items(&records, config.top_items);
    let top_ids: HashSet<String> = top_sales.iter().map(|sales| sales.item_id.clone()).collect();
    info!(items = top_sales.len(), "selected top-selling items");

    let basket = encode_transactions(&restrict_to_items(&records, &top_ids))?;
    let itemsets = mine_frequent_itemsets(&basket, &config.mining_params())?;

    let rules: Vec<AssociationRule> = generate_rules(&itemsets, config.min_confidence)?
        .into_iter()
        .filter(|rule| rule.only_uses(&top_ids))
        .collect();
    let rules = rank_rules(rules, config.rank_by, config.max_rules);

    let top_items = top_sales
        .into_iter()
        .map(|sales| -> crate::Result<NamedItemSales> {
            Ok(NamedItemSales {
                name: catalog.resolve(&sales.item_id, config.name_policy)?,
                item_id: sales.item_id,
                amount: sales.amount,
            })
        })
        .collect::<crate::Result<Vec<_>>>()?;

    let rules: Vec<NamedRule> = rules
        .into_iter()
        .map(|rule| name_rule(rule, catalog, config.name_policy))
        .collect::<crate::Result<Vec<_>>>()?;

    Ok(AnalysisReport {
        top_items,
        n_transactions: basket.n_transactions(),
        itemsets,
        rules,
    })
}

fn name_rule(
    rule: AssociationRule,
    catalog: &ItemCatalog,
    policy: NamePolicy,
) -> crate::Result<NamedRule> {
    let names = |items: &[String]| {
        items
            .iter()
            .map(|item| catalog.resolve(item, policy))
            .collect::<Result<Vec<_>, _>>()
    };
    Ok(NamedRule {
        antecedent_names: names(&rule.antecedent)?,
        consequent_names: names(&rule.consequent)?,
        rule,
    })
}
