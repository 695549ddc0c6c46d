//! Co-occurrence counts and phi correlation of items sharing a group.
//!
//! Input is a flat list of `(group, item)` memberships. Items are paired only
//! inside a group, so a group with `k` distinct items costs `O(k²)` and the
//! whole pass costs `O(Σ k²)` instead of the square of the vocabulary.
//! Groups are spread over the rayon pool; each worker builds a partial
//! pair-count map and the partial maps are summed.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// `item` occurs in context `group`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Membership {
    pub group: String,
    pub item: String,
}

impl Membership {
    pub fn new<G: Into<String>, I: Into<String>>(group: G, item: I) -> Self {
        Membership {
            group: group.into(),
            item: item.into(),
        }
    }
}

/// Number of distinct groups containing both items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairCount {
    pub item1: String,
    pub item2: String,
    pub n: u64,
}

/// Phi coefficient of two items' presence across groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairCorrelation {
    pub item1: String,
    pub item2: String,
    pub correlation: f64,
}

/// Shared view of the two record kinds.
pub trait PairRecord {
    fn items(&self) -> (&str, &str);
}

impl PairRecord for PairCount {
    fn items(&self) -> (&str, &str) {
        (&self.item1, &self.item2)
    }
}

impl PairRecord for PairCorrelation {
    fn items(&self) -> (&str, &str) {
        (&self.item1, &self.item2)
    }
}

/// Records whose first item is `item`, in their existing order.
///
/// Use it on output produced with `symmetric = false` to see everything that
/// accompanies `item`.
pub fn pairs_with<'a, R: PairRecord>(records: &'a [R], item: &str) -> Vec<&'a R> {
    records.iter().filter(|r| r.items().0 == item).collect()
}

/// Keeps memberships of items found in at least `min_group_frequency`
/// distinct groups.
pub fn retain_frequent(memberships: &[Membership], min_group_frequency: u64) -> Vec<Membership> {
    let mut groups_of: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for m in memberships {
        groups_of.entry(&m.item).or_default().insert(&m.group);
    }
    memberships
        .iter()
        .filter(|m| groups_of[m.item.as_str()].len() as u64 >= min_group_frequency)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairwiseOptions {
    /// Emit each unordered pair once (`item1 < item2`) instead of in both
    /// orientations.
    pub symmetric: bool,
    /// Upper bound on distinct items entering the pairing step.
    pub max_vocabulary: Option<usize>,
    /// Upper bound on distinct items within one group.
    pub max_group_size: Option<usize>,
}

impl Default for PairwiseOptions {
    fn default() -> Self {
        PairwiseOptions {
            symmetric: true,
            max_vocabulary: None,
            max_group_size: None,
        }
    }
}

/// 2×2 presence table of two items over all groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contingency {
    /// both present
    pub n11: u64,
    /// first only
    pub n10: u64,
    /// second only
    pub n01: u64,
    /// neither
    pub n00: u64,
}

impl Contingency {
    /// Builds the table from the joint count, each item's group count, and
    /// the total number of groups.
    ///
    /// Counts that cannot describe real groups (`both` above either item's
    /// count, or more groups with either item than `groups`) are rejected.
    pub fn from_counts(both: u64, first: u64, second: u64, groups: u64) -> Result<Self> {
        let cells = first
            .checked_sub(both)
            .zip(second.checked_sub(both))
            .and_then(|(n10, n01)| {
                let present = both.checked_add(n10)?.checked_add(n01)?;
                groups.checked_sub(present).map(|n00| (n10, n01, n00))
            });
        match cells {
            Some((n10, n01, n00)) => Ok(Contingency {
                n11: both,
                n10,
                n01,
                n00,
            }),
            None => Err(Error::invalid_argument(format!(
                "inconsistent contingency counts: both {both}, first {first}, second {second}, groups {groups}"
            ))),
        }
    }

    fn marginals(&self) -> [u64; 4] {
        [
            self.n11 + self.n10,
            self.n01 + self.n00,
            self.n11 + self.n01,
            self.n10 + self.n00,
        ]
    }

    /// True when a zero marginal leaves phi undefined.
    pub fn is_degenerate(&self) -> bool {
        self.marginals().contains(&0)
    }

    /// Phi coefficient in `[-1, 1]`; an undefined value is reported as `0.0`.
    pub fn phi(&self) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        let [row1, row0, col1, col0] = self.marginals().map(|m| m as f64);
        let numerator =
            self.n11 as f64 * self.n00 as f64 - self.n10 as f64 * self.n01 as f64;
        let denominator = (row1 * row0 * col1 * col0).sqrt();
        (numerator / denominator).clamp(-1.0, 1.0)
    }
}

/// Distinct items of every group, each list sorted; groups in id order.
fn group_items(memberships: &[Membership]) -> Vec<Vec<&str>> {
    let mut groups: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for m in memberships {
        groups.entry(&m.group).or_default().insert(&m.item);
    }
    groups
        .into_values()
        .map(|items| items.into_iter().collect())
        .collect()
}

fn check_capacity(groups: &[Vec<&str>], vocabulary: usize, options: &PairwiseOptions) -> Result<()> {
    if let Some(limit) = options.max_vocabulary {
        if vocabulary > limit {
            return Err(Error::CapacityExceeded {
                what: "vocabulary",
                actual: vocabulary,
                limit,
            });
        }
    }
    if let Some(limit) = options.max_group_size {
        let largest = groups.iter().map(Vec::len).max().unwrap_or(0);
        if largest > limit {
            return Err(Error::CapacityExceeded {
                what: "group size",
                actual: largest,
                limit,
            });
        }
    }
    Ok(())
}

fn merge_counts<'a>(
    mut a: HashMap<(&'a str, &'a str), u64>,
    mut b: HashMap<(&'a str, &'a str), u64>,
) -> HashMap<(&'a str, &'a str), u64> {
    if a.len() < b.len() {
        std::mem::swap(&mut a, &mut b);
    }
    for (pair, n) in b {
        *a.entry(pair).or_insert(0) += n;
    }
    a
}

/// Joint group counts keyed by `(smaller, larger)` item.
fn count_pairs<'a>(groups: &[Vec<&'a str>]) -> HashMap<(&'a str, &'a str), u64> {
    groups
        .par_iter()
        .fold(HashMap::new, |mut acc, items| {
            for (i, &first) in items.iter().enumerate() {
                for &second in &items[i + 1..] {
                    *acc.entry((first, second)).or_insert(0) += 1;
                }
            }
            acc
        })
        .reduce(HashMap::new, merge_counts)
}

fn distinct_items(groups: &[Vec<&str>]) -> usize {
    groups.iter().flatten().collect::<BTreeSet<_>>().len()
}

/// Counts, for every pair of distinct items, the groups containing both.
///
/// Duplicate memberships count once and an item never pairs with itself.
/// Output is ordered by `n` descending, then `item1`, then `item2`.
pub fn pairwise_count(memberships: &[Membership], options: &PairwiseOptions) -> Result<Vec<PairCount>> {
    let groups = group_items(memberships);
    check_capacity(&groups, distinct_items(&groups), options)?;

    let counts = count_pairs(&groups);
    let mut out = Vec::with_capacity(if options.symmetric {
        counts.len()
    } else {
        counts.len() * 2
    });
    for ((first, second), n) in counts {
        if !options.symmetric {
            out.push(PairCount {
                item1: second.to_owned(),
                item2: first.to_owned(),
                n,
            });
        }
        out.push(PairCount {
            item1: first.to_owned(),
            item2: second.to_owned(),
            n,
        });
    }
    out.sort_by(|a, b| {
        b.n.cmp(&a.n)
            .then_with(|| a.item1.cmp(&b.item1))
            .then_with(|| a.item2.cmp(&b.item2))
    });

    info!("Counted {} item pairs over {} groups", out.len(), groups.len());
    Ok(out)
}

/// Phi correlation between items that co-occur in at least one group.
///
/// Items present in fewer than `min_group_frequency` groups are dropped before
/// pairing. Every group in the input counts towards the total, including
/// groups left without any retained item. Output is ordered by correlation
/// descending, then `item1`, then `item2`.
pub fn pairwise_correlation(
    memberships: &[Membership],
    min_group_frequency: u64,
    options: &PairwiseOptions,
) -> Result<Vec<PairCorrelation>> {
    let groups = group_items(memberships);
    let total_groups = groups.len() as u64;

    let mut frequency: HashMap<&str, u64> = HashMap::new();
    for items in &groups {
        for &item in items {
            *frequency.entry(item).or_insert(0) += 1;
        }
    }
    frequency.retain(|_, n| *n >= min_group_frequency);

    let retained: Vec<Vec<&str>> = groups
        .iter()
        .map(|items| {
            items
                .iter()
                .copied()
                .filter(|item| frequency.contains_key(item))
                .collect()
        })
        .collect();
    check_capacity(&retained, frequency.len(), options)?;

    let counts = count_pairs(&retained);
    let mut degenerate = 0usize;
    let mut out = Vec::with_capacity(counts.len());
    for ((first, second), both) in counts {
        let table = Contingency::from_counts(both, frequency[first], frequency[second], total_groups)?;
        if table.is_degenerate() {
            degenerate += 1;
        }
        let correlation = table.phi();
        if !options.symmetric {
            out.push(PairCorrelation {
                item1: second.to_owned(),
                item2: first.to_owned(),
                correlation,
            });
        }
        out.push(PairCorrelation {
            item1: first.to_owned(),
            item2: second.to_owned(),
            correlation,
        });
    }
    out.sort_by(|a, b| {
        b.correlation
            .total_cmp(&a.correlation)
            .then_with(|| a.item1.cmp(&b.item1))
            .then_with(|| a.item2.cmp(&b.item2))
    });

    if degenerate > 0 {
        debug!("{degenerate} pairs had a zero marginal; correlation set to 0");
    }
    info!(
        "Correlated {} pairs of {} items (min group frequency {})",
        out.len(),
        frequency.len(),
        min_group_frequency
    );
    Ok(out)
}
