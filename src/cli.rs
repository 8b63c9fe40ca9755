//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{ArgAction, Parser};

use crate::data::{DateRange, NamePolicy};
use crate::pipeline::AnalysisConfig;
use crate::rules::RankBy;

/// Market-basket analysis: top sellers and association rules between them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the item catalog CSV (item_id, item_name)
    #[arg(long, default_value = "items.csv")]
    pub items: PathBuf,

    /// Path to the transaction log (.parquet or .csv with id, item_id, amount, date)
    #[arg(short, long, default_value = "transactions.parquet")]
    pub transactions: PathBuf,

    /// Minimum support of a frequent itemset, in (0, 1]
    #[arg(long, default_value = "0.01")]
    pub min_support: f64,

    /// Minimum confidence of a reported rule, in [0, 1]
    #[arg(long, default_value = "0.01")]
    pub min_confidence: f64,

    /// Largest itemset size to explore
    #[arg(long)]
    pub max_len: Option<usize>,

    /// Number of best-selling items to analyse
    #[arg(long, default_value = "15")]
    pub top_items: usize,

    /// Number of rules to report
    #[arg(long, default_value = "15")]
    pub max_rules: usize,

    /// Report every rule instead of the best `--max-rules`
    #[arg(long)]
    pub all_rules: bool,

    /// Metric used to rank rules
    #[arg(long, value_enum, default_value_t = RankBy::Confidence)]
    pub rank_by: RankBy,

    /// First transaction date to include (YYYY-MM-DD)
    #[arg(long, default_value = "2023-01-01")]
    pub from: String,

    /// Last transaction date to include (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub to: Option<String>,

    /// Analyse every transaction regardless of its date
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub all_dates: bool,

    /// Fail when an item id has no catalog entry instead of printing a placeholder
    #[arg(long)]
    pub strict_names: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Build the analysis configuration from the parsed flags
    pub fn to_config(&self) -> crate::Result<AnalysisConfig> {
        let date_range = if self.all_dates {
            None
        } else {
            let start = parse_date(&self.from)?;
            let end = match &self.to {
                Some(to) => parse_date(to)?,
                None => Local::now().date_naive(),
            };
            Some(DateRange::new(start, end)?)
        };

        let config = AnalysisConfig {
            min_support: self.min_support,
            min_confidence: self.min_confidence,
            max_len: self.max_len,
            top_items: self.top_items,
            max_rules: (!self.all_rules).then_some(self.max_rules),
            rank_by: self.rank_by,
            date_range,
            name_policy: if self.strict_names {
                NamePolicy::Strict
            } else {
                NamePolicy::Placeholder
            },
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_date(value: &str) -> crate::Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date '{}', expected YYYY-MM-DD", value))
}
