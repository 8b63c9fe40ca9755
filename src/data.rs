//! Data loading and transaction-log wrangling using Polars

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{info, warn};

use crate::encode::TransactionRecord;
use crate::error::BasketError;

/// How to render an item id that has no entry in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamePolicy {
    /// Substitute `<unknown item ID>` and log a warning
    #[default]
    Placeholder,
    /// Fail with `BasketError::UnknownItem`
    Strict,
}

/// Reference table mapping item ids to display names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemCatalog {
    names: BTreeMap<String, String>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry
    pub fn insert(&mut self, item_id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(item_id.into(), name.into());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name_of(&self, item_id: &str) -> Option<&str> {
        self.names.get(item_id).map(String::as_str)
    }

    /// Display name for an item under the given policy
    pub fn resolve(&self, item_id: &str, policy: NamePolicy) -> Result<String, BasketError> {
        match (self.name_of(item_id), policy) {
            (Some(name), _) => Ok(name.to_owned()),
            (None, NamePolicy::Strict) => Err(BasketError::UnknownItem(item_id.to_owned())),
            (None, NamePolicy::Placeholder) => {
                warn!(item_id, "item missing from catalog, using placeholder name");
                Ok(format!("<unknown item {item_id}>"))
            }
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ItemCatalog {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for (item_id, name) in iter {
            catalog.insert(item_id, name);
        }
        catalog
    }
}

/// Inclusive calendar date window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> crate::Result<Self> {
        if start > end {
            anyhow::bail!("Date range start {} is after its end {}", start, end);
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Total amount sold for one item
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSales {
    pub item_id: String,
    pub amount: f64,
}

/// Load the item catalog from a CSV file with `item_id` and `item_name` columns
pub fn load_catalog(path: impl AsRef<Path>) -> crate::Result<ItemCatalog> {
    let path = path.as_ref();
    let df = read_csv(path)?;

    let ids = string_column(&df, "item_id")?;
    let names = string_column(&df, "item_name")?;

    let catalog: ItemCatalog = ids
        .into_iter()
        .zip(names)
        .filter_map(|(id, name)| Some((id?, name.unwrap_or_default())))
        .collect();

    info!(items = catalog.len(), path = %path.display(), "loaded item catalog");
    Ok(catalog)
}

/// Load the transaction log from a `.parquet` or `.csv` file
///
/// Expected columns are `id`, `item_id`, `amount` and, optionally, `date`.
/// Amounts that are not numeric load as `None`; dates may be stored as Date,
/// Datetime or text starting with `YYYY-MM-DD`.
pub fn load_transactions(path: impl AsRef<Path>) -> crate::Result<Vec<TransactionRecord>> {
    let path = path.as_ref();
    let df = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("parquet") => read_parquet(path)?,
        Some(ext) if ext.eq_ignore_ascii_case("csv") => read_csv(path)?,
        _ => anyhow::bail!(
            "Unsupported transaction file (expected .parquet or .csv): {}",
            path.display()
        ),
    };

    let records = transactions_from_frame(&df)
        .with_context(|| format!("Invalid transaction table: {}", path.display()))?;
    info!(records = records.len(), path = %path.display(), "loaded transactions");
    Ok(records)
}

/// Convert a transaction DataFrame into records
pub fn transactions_from_frame(df: &DataFrame) -> crate::Result<Vec<TransactionRecord>> {
    let transaction_ids = string_column(df, "id")?;
    let item_ids = string_column(df, "item_id")?;
    let amounts = float_column(df, "amount")?;
    let has_dates = df.column("date").is_ok();
    if !has_dates {
        warn!("transaction table has no 'date' column; any date filter will drop every record");
    }
    let dates = if has_dates {
        string_column(df, "date")?
            .into_iter()
            .map(|value| value.as_deref().and_then(parse_date))
            .collect()
    } else {
        vec![None; df.height()]
    };

    Ok(transaction_ids
        .into_iter()
        .zip(item_ids)
        .zip(amounts)
        .zip(dates)
        .enumerate()
        .map(|(row, (((transaction_id, item_id), amount), date))| TransactionRecord {
            transaction_id,
            item_id,
            amount,
            date,
            source_row: Some(row),
        })
        .collect())
}

/// Keep records dated inside `range`; undated records are dropped
pub fn filter_by_date(records: Vec<TransactionRecord>, range: &DateRange) -> Vec<TransactionRecord> {
    let before = records.len();
    let kept: Vec<TransactionRecord> = records
        .into_iter()
        .filter(|record| record.date.is_some_and(|date| range.contains(date)))
        .collect();
    info!(
        kept = kept.len(),
        dropped = before - kept.len(),
        start = %range.start,
        end = %range.end,
        "filtered transactions by date"
    );
    if kept.is_empty() && before > 0 {
        warn!(
            dropped = before,
            start = %range.start,
            end = %range.end,
            "date filter removed every transaction; check the date column or pass --all-dates"
        );
    }
    kept
}

/// Items ranked by total amount sold, highest first
///
/// Ties go to the smaller item id: integer ids first in numeric order, then
/// the rest as text.
///
/// Records without an item id or a numeric amount are ignored here; the
/// encoder reports them.
pub fn top_selling_items(records: &[TransactionRecord], n: usize) -> Vec<ItemSales> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for record in records {
        if let (Some(item_id), Some(amount)) = (record.item_id.as_deref(), record.amount) {
            if amount.is_finite() {
                *totals.entry(item_id).or_insert(0.0) += amount;
            }
        }
    }

    let mut sales: Vec<ItemSales> = totals
        .into_iter()
        .map(|(item_id, amount)| ItemSales {
            item_id: item_id.to_owned(),
            amount,
        })
        .collect();
    sales.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| compare_item_ids(&a.item_id, &b.item_id))
    });
    sales.truncate(n);
    sales
}

/// Integer ids in numeric order, then every other id in text order
fn compare_item_ids(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Keep only records whose item belongs to `items`
pub fn restrict_to_items(
    records: &[TransactionRecord],
    items: &HashSet<String>,
) -> Vec<TransactionRecord> {
    records
        .iter()
        .filter(|record| {
            record
                .item_id
                .as_ref()
                .is_some_and(|item_id| items.contains(item_id))
        })
        .cloned()
        .collect()
}

/// Every column is read as text; callers cast the ones they need, so a stray
/// value deep in the file turns into a null instead of failing the read.
fn read_csv(path: &Path) -> crate::Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to open CSV: {}", path.display()))?
        .finish()
        .with_context(|| format!("Failed to read CSV: {}", path.display()))?;
    Ok(df)
}

fn read_parquet(path: &Path) -> crate::Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open parquet file: {}", path.display()))?;
    let df = ParquetReader::new(file)
        .finish()
        .with_context(|| format!("Failed to read parquet file: {}", path.display()))?;
    Ok(df)
}

fn string_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .with_context(|| format!("Missing column '{name}'"))?
        .cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_owned))
        .collect())
}

fn float_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .with_context(|| format!("Missing column '{name}'"))?
        .cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let day = value.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_catalog() {
        let file = create_test_csv("item_id,item_name\n1,Bread\n2,Milk\n");
        let catalog = load_catalog(file.path()).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.name_of("1"), Some("Bread"));
        assert_eq!(catalog.name_of("3"), None);
    }

    #[test]
    fn test_load_transactions_csv() {
        let file = create_test_csv(
            "id,item_id,amount,date\n\
             100,1,2,2023-02-01\n\
             100,2,1,2023-02-01\n\
             101,1,abc,2023-03-10\n",
        );
        let records = load_transactions(file.path()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].transaction_id.as_deref(), Some("100"));
        assert_eq!(records[0].item_id.as_deref(), Some("1"));
        assert_eq!(records[0].amount, Some(2.0));
        assert_eq!(records[0].date, Some(date(2023, 2, 1)));
        assert_eq!(records[2].amount, None);
    }

    #[test]
    fn test_late_fractional_and_text_values_load() {
        let mut content = String::from("id,item_id,amount\n");
        for row in 0..150 {
            content.push_str(&format!("{row},{},1\n", row % 7));
        }
        content.push_str("150,A12,2.5\n151,3,abc\n");
        let file = create_test_csv(&content);

        let records = load_transactions(file.path()).unwrap();
        assert_eq!(records.len(), 152);
        assert_eq!(records[0].amount, Some(1.0));
        assert_eq!(records[150].item_id.as_deref(), Some("A12"));
        assert_eq!(records[150].amount, Some(2.5));
        assert_eq!(records[151].amount, None);
        assert_eq!(records[151].source_row, Some(151));
    }

    #[test]
    fn test_catalog_with_late_text_id() {
        let mut content = String::from("item_id,item_name\n");
        for id in 0..120 {
            content.push_str(&format!("{id},Item {id}\n"));
        }
        content.push_str("A12,Special\n");
        let catalog = load_catalog(create_test_csv(&content).path()).unwrap();

        assert_eq!(catalog.len(), 121);
        assert_eq!(catalog.name_of("A12"), Some("Special"));
        assert_eq!(catalog.name_of("7"), Some("Item 7"));
    }

    #[test]
    fn test_load_transactions_rejects_unknown_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "[]").unwrap();
        assert!(load_transactions(file.path()).is_err());
    }

    #[test]
    fn test_missing_column_is_reported() {
        let file = create_test_csv("id,item,amount\n1,2,3\n");
        assert!(load_transactions(file.path()).is_err());
    }

    #[test]
    fn test_parse_date_variants() {
        assert_eq!(parse_date("2023-01-05"), Some(date(2023, 1, 5)));
        assert_eq!(parse_date("2023-01-05 10:15:00"), Some(date(2023, 1, 5)));
        assert_eq!(parse_date("05/01/2023"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_filter_by_date_is_inclusive() {
        let range = DateRange::new(date(2023, 1, 1), date(2023, 1, 31)).unwrap();
        let records = vec![
            TransactionRecord::new("1", "A", 1.0).with_date(date(2022, 12, 31)),
            TransactionRecord::new("2", "A", 1.0).with_date(date(2023, 1, 1)),
            TransactionRecord::new("3", "A", 1.0).with_date(date(2023, 1, 31)),
            TransactionRecord::new("4", "A", 1.0),
        ];
        let kept = filter_by_date(records, &range);
        let ids: Vec<_> = kept.iter().filter_map(|r| r.transaction_id.as_deref()).collect();
        assert_eq!(ids, vec!["2", "3"]);

        assert!(DateRange::new(date(2023, 2, 1), date(2023, 1, 1)).is_err());
    }

    #[test]
    fn test_top_selling_items() {
        let records = vec![
            TransactionRecord::new("1", "A", 2.0),
            TransactionRecord::new("2", "A", 3.0),
            TransactionRecord::new("1", "B", 5.0),
            TransactionRecord::new("3", "C", 1.0),
            TransactionRecord::new("3", "D", 5.0),
        ];
        let top = top_selling_items(&records, 3);
        let ids: Vec<_> = top.iter().map(|s| s.item_id.as_str()).collect();

        assert_eq!(ids, vec!["A", "B", "D"]);
        assert_eq!(top[0].amount, 5.0);
    }

    #[test]
    fn test_top_selling_ties_compare_numeric_ids() {
        let records = vec![
            TransactionRecord::new("1", "10", 1.0),
            TransactionRecord::new("2", "9", 1.0),
        ];
        let top = top_selling_items(&records, 1);
        assert_eq!(top[0].item_id, "9");

        assert_eq!(compare_item_ids("9", "10"), Ordering::Less);
        assert_eq!(compare_item_ids("B", "A"), Ordering::Greater);
        assert_eq!(compare_item_ids("10", "2a"), Ordering::Less);
        assert_eq!(compare_item_ids("2a", "3"), Ordering::Greater);
    }

    #[test]
    fn test_filter_without_dates_drops_everything() {
        let range = DateRange::new(date(2023, 1, 1), date(2023, 12, 31)).unwrap();
        let records = vec![
            TransactionRecord::new("1", "A", 1.0),
            TransactionRecord::new("2", "B", 1.0),
        ];
        assert!(filter_by_date(records, &range).is_empty());
    }

    #[test]
    fn test_restrict_to_items() {
        let records = vec![
            TransactionRecord::new("1", "A", 1.0),
            TransactionRecord::new("1", "B", 1.0),
        ];
        let allowed: HashSet<String> = ["B".to_string()].into_iter().collect();
        let kept = restrict_to_items(&records, &allowed);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].item_id.as_deref(), Some("B"));
    }

    #[test]
    fn test_resolve_name_policies() {
        let catalog: ItemCatalog = [("1", "Bread")].into_iter().collect();

        assert_eq!(catalog.resolve("1", NamePolicy::Strict).unwrap(), "Bread");
        assert_eq!(
            catalog.resolve("9", NamePolicy::Placeholder).unwrap(),
            "<unknown item 9>"
        );
        assert_eq!(
            catalog.resolve("9", NamePolicy::Strict),
            Err(BasketError::UnknownItem("9".to_string()))
        );
    }
}
