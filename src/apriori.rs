//! Level-wise frequent itemset mining (Apriori)
//!
//! Candidates of size k+1 are joined from frequent k-itemsets that share their
//! first k-1 items, and any candidate with an infrequent k-subset is dropped
//! before its support is counted. Support never grows as an itemset grows, so
//! nothing frequent is lost by the pruning.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::encode::BasketMatrix;
use crate::error::BasketError;

/// Sorted column indices into the basket matrix
type ColumnSet = Vec<usize>;

/// Parameters for a mining pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MiningParams {
    /// Minimum fraction of transactions an itemset must appear in
    pub min_support: f64,
    /// Optional cap on the size of the itemsets explored
    pub max_len: Option<usize>,
}

impl Default for MiningParams {
    fn default() -> Self {
        Self {
            min_support: 0.01,
            max_len: None,
        }
    }
}

impl MiningParams {
    pub fn new(min_support: f64) -> Self {
        Self {
            min_support,
            ..Default::default()
        }
    }

    pub fn with_max_len(mut self, max_len: Option<usize>) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn validate(&self) -> Result<(), BasketError> {
        if !(self.min_support > 0.0 && self.min_support <= 1.0) {
            return Err(BasketError::InvalidSupport(self.min_support));
        }
        if self.max_len == Some(0) {
            return Err(BasketError::InvalidMaxLen);
        }
        Ok(())
    }
}

/// A frequent itemset with its support
#[derive(Debug, Clone, PartialEq)]
pub struct Itemset {
    /// Item ids, sorted and unique
    pub items: Vec<String>,
    pub support: f64,
}

impl Itemset {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.items.iter().any(|item| item == item_id)
    }
}

/// All itemsets discovered by a mining pass, grouped by size
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrequentItemsets {
    item_ids: Vec<String>,
    /// `levels[k - 1]` holds the frequent itemsets of size k
    levels: Vec<BTreeMap<ColumnSet, f64>>,
    n_transactions: usize,
}

impl FrequentItemsets {
    pub fn len(&self) -> usize {
        self.levels.iter().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(BTreeMap::is_empty)
    }

    /// Size of the largest frequent itemset, 0 when nothing is frequent
    pub fn max_size(&self) -> usize {
        self.levels.len()
    }

    /// Number of transactions the supports were computed over
    pub fn n_transactions(&self) -> usize {
        self.n_transactions
    }

    /// Itemsets ordered by size, then lexicographically by item id
    pub fn iter(&self) -> impl Iterator<Item = Itemset> + '_ {
        self.indexed().map(|(columns, support)| self.to_itemset(columns, support))
    }

    pub fn of_size(&self, size: usize) -> impl Iterator<Item = Itemset> + '_ {
        size.checked_sub(1)
            .and_then(|level| self.levels.get(level))
            .into_iter()
            .flat_map(|level| level.iter())
            .map(|(columns, &support)| self.to_itemset(columns, support))
    }

    /// Support of an itemset given by item ids, `None` if it is not frequent
    pub fn support(&self, items: &[&str]) -> Option<f64> {
        let mut columns = items
            .iter()
            .map(|item| {
                self.item_ids
                    .binary_search_by(|probe| probe.as_str().cmp(*item))
                    .ok()
            })
            .collect::<Option<ColumnSet>>()?;
        columns.sort_unstable();
        columns.dedup();
        self.support_of_columns(&columns)
    }

    pub(crate) fn support_of_columns(&self, columns: &[usize]) -> Option<f64> {
        let level = columns.len().checked_sub(1)?;
        self.levels.get(level)?.get(columns).copied()
    }

    pub(crate) fn indexed(&self) -> impl Iterator<Item = (&[usize], f64)> + '_ {
        self.levels
            .iter()
            .flat_map(|level| level.iter())
            .map(|(columns, &support)| (columns.as_slice(), support))
    }

    pub(crate) fn item_ids_of(&self, columns: &[usize]) -> Vec<String> {
        columns
            .iter()
            .map(|&col| self.item_ids[col].clone())
            .collect()
    }

    fn to_itemset(&self, columns: &[usize], support: f64) -> Itemset {
        Itemset {
            items: self.item_ids_of(columns),
            support,
        }
    }
}

/// Mine every itemset whose support reaches `params.min_support`
///
/// # Arguments
/// * `basket` - Encoded transaction matrix
/// * `params` - Support floor and optional itemset size cap
///
/// # Returns
/// * All frequent itemsets with their supports; empty when the matrix has no rows
///
/// # Errors
/// * `BasketError::InvalidSupport` if `min_support` is outside (0, 1]
/// * `BasketError::InvalidMaxLen` if `max_len` is zero
pub fn mine_frequent_itemsets(
    basket: &BasketMatrix,
    params: &MiningParams,
) -> Result<FrequentItemsets, BasketError> {
    params.validate()?;

    let n_transactions = basket.n_transactions();
    let mut result = FrequentItemsets {
        item_ids: basket.item_ids().to_vec(),
        levels: Vec::new(),
        n_transactions,
    };
    if n_transactions == 0 {
        debug!("no transactions to mine");
        return Ok(result);
    }

    let support_of = |columns: &[usize]| basket.count_containing(columns) as f64 / n_transactions as f64;
    let max_len = params.max_len.unwrap_or(usize::MAX);

    let mut frequent: BTreeMap<ColumnSet, f64> = (0..basket.n_items())
        .filter_map(|col| {
            let support = support_of(std::slice::from_ref(&col));
            (support >= params.min_support).then(|| (vec![col], support))
        })
        .collect();
    debug!(size = 1, candidates = basket.n_items(), frequent = frequent.len(), "mined level");

    while !frequent.is_empty() {
        let size = result.levels.len() + 1;
        if size >= max_len {
            result.levels.push(frequent);
            break;
        }

        let candidates = join_and_prune(&frequent);
        let n_candidates = candidates.len();
        let next: BTreeMap<ColumnSet, f64> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let support = support_of(&candidate);
                (support >= params.min_support).then_some((candidate, support))
            })
            .collect();
        debug!(size = size + 1, candidates = n_candidates, frequent = next.len(), "mined level");

        result.levels.push(frequent);
        frequent = next;
    }

    info!(
        itemsets = result.len(),
        max_size = result.max_size(),
        min_support = params.min_support,
        "frequent itemset mining finished"
    );
    Ok(result)
}

/// Build the next level's candidates from the frequent itemsets of one level.
///
/// Keys iterate in lexicographic order, so itemsets sharing a prefix are
/// contiguous and the joined item always lands at the end in sorted order.
fn join_and_prune(frequent: &BTreeMap<ColumnSet, f64>) -> Vec<ColumnSet> {
    let keys: Vec<&ColumnSet> = frequent.keys().collect();
    let mut candidates = Vec::new();

    for (i, left) in keys.iter().enumerate() {
        let prefix_len = left.len() - 1;
        for right in &keys[i + 1..] {
            if right[..prefix_len] != left[..prefix_len] {
                break;
            }
            let mut candidate = (*left).clone();
            candidate.push(right[prefix_len]);
            if all_subsets_frequent(&candidate, frequent) {
                candidates.push(candidate);
            }
        }
    }

    candidates
}

fn all_subsets_frequent(candidate: &[usize], frequent: &BTreeMap<ColumnSet, f64>) -> bool {
    // the two subsets dropping one of the last items are the join parents
    let checked = candidate.len().saturating_sub(2);
    (0..checked).all(|skip| {
        let subset: ColumnSet = candidate
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != skip)
            .map(|(_, &col)| col)
            .collect();
        frequent.contains_key(&subset)
    })
}
