//! Referential reconciliation, the second pipeline stage.
//!
//! Child rows survive only when their foreign key resolves against the
//! parent table. Orphans are set aside and never reach the metrics.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Outcome of filtering a child table against a parent key set.
#[derive(Debug, Clone)]
pub struct Reconciled<T> {
    pub matched: Vec<T>,
    pub orphaned: Vec<T>,
}

/// Row counts recorded while reconciling, reported alongside the metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub loans_matched: u64,
    pub loans_orphaned: u64,
    pub payments_matched: u64,
    pub payments_orphaned: u64,
    pub borrowers_without_loans: u64,
    pub loans_with_payment_activity: u64,
}

/// Collect the key column of a parent table.
pub fn key_set<'a, T, F>(parents: &'a [T], key: F) -> HashSet<&'a str>
where
    F: Fn(&'a T) -> &'a str,
{
    parents.iter().map(key).collect()
}

/// Partition children by whether their foreign key is a known parent key.
/// Keys are expected to be case-folded already.
pub fn reconcile<T, F>(
    children: Vec<T>,
    parent_keys: &HashSet<&str>,
    foreign_key: F,
) -> Reconciled<T>
where
    F: Fn(&T) -> &str,
{
    let (matched, orphaned): (Vec<T>, Vec<T>) = children
        .into_iter()
        .partition(|child| parent_keys.contains(foreign_key(child)));
    Reconciled { matched, orphaned }
}
