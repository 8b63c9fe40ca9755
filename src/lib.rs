//! BasketForge: market-basket analysis over retail transaction logs
//!
//! The core is a small pipeline: transaction rows are encoded into a boolean
//! basket matrix, frequent itemsets are mined level by level (Apriori), and
//! association rules are derived from them with confidence, lift, leverage
//! and conviction. Around it sit Polars-based loaders, date filtering,
//! best-seller ranking and console reporting.

pub mod apriori;
pub mod cli;
pub mod data;
pub mod encode;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod rules;

// Re-export public items for easier access
pub use apriori::{mine_frequent_itemsets, FrequentItemsets, Itemset, MiningParams};
pub use cli::Args;
pub use data::{
    filter_by_date, load_catalog, load_transactions, restrict_to_items, top_selling_items,
    DateRange, ItemCatalog, ItemSales, NamePolicy,
};
pub use encode::{encode_transactions, validate_records, BasketMatrix, TransactionRecord};
pub use error::BasketError;
pub use pipeline::{run_analysis, AnalysisConfig, AnalysisReport, NamedItemSales, NamedRule};
pub use rules::{generate_rules, rank_rules, AssociationRule, RankBy};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
