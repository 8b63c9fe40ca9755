//! Transaction encoding: event log rows into a boolean basket matrix

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use ndarray::Array2;
use tracing::debug;

use crate::error::BasketError;

/// One row of the transaction event log, as handed over by a loader.
///
/// `None` stands for a missing cell. A loader that meets a non-numeric amount
/// stores `None` in `amount`, which the encoder later rejects.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub transaction_id: Option<String>,
    pub item_id: Option<String>,
    pub amount: Option<f64>,
    pub date: Option<NaiveDate>,
    /// Zero-based data row in the source file, set by loaders
    pub source_row: Option<usize>,
}

impl TransactionRecord {
    /// Build a fully populated record without a date
    pub fn new(transaction_id: impl Into<String>, item_id: impl Into<String>, amount: f64) -> Self {
        Self {
            transaction_id: Some(transaction_id.into()),
            item_id: Some(item_id.into()),
            amount: Some(amount),
            date: None,
            source_row: None,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_source_row(mut self, row: usize) -> Self {
        self.source_row = Some(row);
        self
    }
}

/// Boolean transaction-by-item occurrence table.
///
/// Rows are sorted by transaction id and columns by item id; both are unique.
/// A transaction without any positive item total is kept as an all-zero row
/// so it still counts towards the support denominator.
#[derive(Debug, Clone, PartialEq)]
pub struct BasketMatrix {
    transaction_ids: Vec<String>,
    item_ids: Vec<String>,
    cells: Array2<bool>,
}

impl BasketMatrix {
    /// Build a matrix from baskets that are already grouped per transaction.
    ///
    /// Repeated transaction ids are merged into a single row.
    pub fn from_baskets<I, T, S>(baskets: I) -> Self
    where
        I: IntoIterator<Item = (T, Vec<S>)>,
        T: Into<String>,
        S: Into<String>,
    {
        let mut rows: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut items = BTreeSet::new();
        for (transaction_id, basket) in baskets {
            let row = rows.entry(transaction_id.into()).or_default();
            for item in basket {
                let item = item.into();
                items.insert(item.clone());
                row.insert(item);
            }
        }
        Self::from_rows(rows, items)
    }

    fn from_rows(rows: BTreeMap<String, BTreeSet<String>>, items: BTreeSet<String>) -> Self {
        let item_ids: Vec<String> = items.into_iter().collect();
        let mut cells = Array2::from_elem((rows.len(), item_ids.len()), false);
        let mut transaction_ids = Vec::with_capacity(rows.len());

        for (row, (transaction_id, present)) in rows.into_iter().enumerate() {
            for item in &present {
                if let Ok(col) = item_ids.binary_search(item) {
                    cells[[row, col]] = true;
                }
            }
            transaction_ids.push(transaction_id);
        }

        Self {
            transaction_ids,
            item_ids,
            cells,
        }
    }

    pub fn transaction_ids(&self) -> &[String] {
        &self.transaction_ids
    }

    pub fn item_ids(&self) -> &[String] {
        &self.item_ids
    }

    pub fn n_transactions(&self) -> usize {
        self.cells.nrows()
    }

    pub fn n_items(&self) -> usize {
        self.cells.ncols()
    }

    /// Column index of an item, if the item occurs in the log
    pub fn column_of(&self, item_id: &str) -> Option<usize> {
        self.item_ids
            .binary_search_by(|probe| probe.as_str().cmp(item_id))
            .ok()
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.cells.get([row, col]).copied().unwrap_or(false)
    }

    /// Items present in one transaction row, in column order
    pub fn row_items(&self, row: usize) -> Vec<&str> {
        if row >= self.n_transactions() {
            return Vec::new();
        }
        self.cells
            .row(row)
            .iter()
            .zip(&self.item_ids)
            .filter(|(present, _)| **present)
            .map(|(_, item)| item.as_str())
            .collect()
    }

    /// Number of rows holding every one of `columns`.
    ///
    /// An empty column list matches every row.
    pub fn count_containing(&self, columns: &[usize]) -> usize {
        self.cells
            .outer_iter()
            .filter(|row| columns.iter().all(|&col| row.get(col).copied().unwrap_or(false)))
            .count()
    }

    pub fn cells(&self) -> &Array2<bool> {
        &self.cells
    }
}

/// Encode the transaction log into a basket matrix.
///
/// Amounts of repeated (transaction, item) pairs are summed before the total
/// is thresholded: a positive total marks the item as present.
///
/// # Errors
/// * `BasketError::MalformedInput` when a record lacks a transaction id or an
///   item id, or carries a missing or non-finite amount
pub fn encode_transactions<'a, I>(records: I) -> Result<BasketMatrix, BasketError>
where
    I: IntoIterator<Item = &'a TransactionRecord>,
{
    let mut totals: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    let mut items = BTreeSet::new();

    for (row, record) in records.into_iter().enumerate() {
        let (transaction_id, item_id, amount) = checked_fields(row, record)?;
        *totals
            .entry(transaction_id.to_owned())
            .or_default()
            .entry(item_id.to_owned())
            .or_insert(0.0) += amount;
        items.insert(item_id.to_owned());
    }

    let rows: BTreeMap<String, BTreeSet<String>> = totals
        .into_iter()
        .map(|(transaction_id, amounts)| {
            let present = amounts
                .into_iter()
                .filter(|(_, total)| *total > 0.0)
                .map(|(item, _)| item)
                .collect();
            (transaction_id, present)
        })
        .collect();

    let matrix = BasketMatrix::from_rows(rows, items);
    debug!(
        transactions = matrix.n_transactions(),
        items = matrix.n_items(),
        "encoded basket matrix"
    );
    Ok(matrix)
}

/// Check every record the way the encoder does, without building a matrix
///
/// # Errors
/// * `BasketError::MalformedInput` for the first offending record
pub fn validate_records(records: &[TransactionRecord]) -> Result<(), BasketError> {
    records
        .iter()
        .enumerate()
        .try_for_each(|(row, record)| checked_fields(row, record).map(|_| ()))
}

/// Errors name the loader's source row when known, else the position in `records`
fn checked_fields(
    position: usize,
    record: &TransactionRecord,
) -> Result<(&str, &str, f64), BasketError> {
    let row = record.source_row.unwrap_or(position);
    let transaction_id = required_id(record.transaction_id.as_deref())
        .ok_or_else(|| BasketError::malformed(row, "missing transaction id"))?;
    let item_id = required_id(record.item_id.as_deref())
        .ok_or_else(|| BasketError::malformed(row, "missing item id"))?;
    let amount = match record.amount {
        Some(amount) if amount.is_finite() => amount,
        Some(amount) => {
            return Err(BasketError::malformed(
                row,
                format!("amount {amount} is not a finite number"),
            ))
        }
        None => return Err(BasketError::malformed(row, "missing or non-numeric amount")),
    };
    Ok((transaction_id, item_id, amount))
}

fn required_id(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|id| !id.is_empty())
}
