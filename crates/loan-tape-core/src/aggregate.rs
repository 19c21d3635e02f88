//! Ordered grouping primitives, the fourth pipeline stage.
//!
//! Groupings run through BTreeMap so results come out ordered by key
//! without a separate sort.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;

use crate::types::{Money, Month, Payment};

/// One group out of an ordered aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate<K> {
    pub key: K,
    pub total: Money,
    pub count: u64,
}

/// Group rows by key, summing an amount and counting rows per group.
/// Rows whose key is absent are skipped. Results are ordered by key.
pub fn aggregate_by<T, K, KF, AF>(rows: &[T], key_fn: KF, amount_fn: AF) -> Vec<Aggregate<K>>
where
    K: Ord,
    KF: Fn(&T) -> Option<K>,
    AF: Fn(&T) -> Money,
{
    let mut groups: BTreeMap<K, (Money, u64)> = BTreeMap::new();
    for row in rows {
        if let Some(key) = key_fn(row) {
            let entry = groups.entry(key).or_insert((Decimal::ZERO, 0));
            entry.0 += amount_fn(row);
            entry.1 += 1;
        }
    }
    groups
        .into_iter()
        .map(|(key, (total, count))| Aggregate { key, total, count })
        .collect()
}

/// Join two ordered aggregations on equal keys, keeping only keys present
/// on both sides.
pub fn join_inner<K>(left: &[Aggregate<K>], right: &[Aggregate<K>]) -> Vec<(K, Money, Money)>
where
    K: Ord + Clone,
{
    let mut joined = Vec::new();
    let mut i = 0;
    let mut j = 0;
    while i < left.len() && j < right.len() {
        match left[i].key.cmp(&right[j].key) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                joined.push((left[i].key.clone(), left[i].total, right[j].total));
                i += 1;
                j += 1;
            }
        }
    }
    joined
}

/// Distinct loan ids with payment activity, bucketed by payment month.
/// Payments without a readable date belong to no bucket.
pub fn loan_activity_by_month(payments: &[Payment]) -> Vec<(Month, HashSet<&str>)> {
    let mut groups: BTreeMap<Month, HashSet<&str>> = BTreeMap::new();
    for payment in payments {
        if let Some(date) = payment.payment_date {
            groups
                .entry(Month::from_date(date))
                .or_default()
                .insert(payment.loan_id.as_str());
        }
    }
    groups.into_iter().collect()
}
