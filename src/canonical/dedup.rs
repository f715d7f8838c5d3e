//! Dedup by natural key, keeping the most recent revision.
//!
//! Upstream sources represent record revisions as additional rows, so a
//! canonical table keeps exactly one row per natural key: the one with
//! the maximum primary timestamp. Rows without a timestamp lose to rows
//! with one; equal timestamps keep the first row in input order. The
//! surviving rows come back in input order, which keeps the output
//! deterministic run to run.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::hash::Hash;

pub fn dedup_latest<T, K, FK, FT>(rows: Vec<T>, key_of: FK, ts_of: FT) -> Vec<T>
where
    K: Eq + Hash,
    FK: Fn(&T) -> K,
    FT: Fn(&T) -> Option<NaiveDateTime>,
{
    let mut best: HashMap<K, (usize, Option<NaiveDateTime>)> = HashMap::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let key = key_of(row);
        let ts = ts_of(row);
        match best.get(&key) {
            // Option<NaiveDateTime> orders None below any Some, and the
            // strict comparison keeps the earlier row on ties.
            Some((_, best_ts)) if ts <= *best_ts => {}
            _ => {
                best.insert(key, (idx, ts));
            }
        }
    }

    let mut keep = vec![false; rows.len()];
    for (idx, _) in best.into_values() {
        keep[idx] = true;
    }
    rows.into_iter()
        .zip(keep)
        .filter_map(|(row, k)| k.then_some(row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0)
    }

    #[derive(Debug, PartialEq)]
    struct Row(&'static str, &'static str, Option<NaiveDateTime>);

    #[test]
    fn latest_revision_survives() {
        let rows = vec![
            Row("X1", "Theft", ts(2024, 1, 1)),
            Row("X1", "Theft", ts(2024, 3, 1)),
        ];
        let out = dedup_latest(rows, |r| (r.0, r.1), |r| r.2);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].2, ts(2024, 3, 1));
    }

    #[test]
    fn distinct_keys_all_survive() {
        let rows = vec![
            Row("X1", "Theft", ts(2024, 1, 1)),
            Row("X1", "Assault", ts(2024, 1, 1)),
            Row("X2", "Theft", ts(2024, 1, 1)),
        ];
        let out = dedup_latest(rows, |r| (r.0, r.1), |r| r.2);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn missing_timestamp_loses_to_present() {
        let rows = vec![
            Row("X1", "Theft", None),
            Row("X1", "Theft", ts(2020, 1, 1)),
        ];
        let out = dedup_latest(rows, |r| (r.0, r.1), |r| r.2);
        assert_eq!(out[0].2, ts(2020, 1, 1));
    }

    #[test]
    fn tie_keeps_first_in_input_order() {
        let rows = vec![
            Row("X1", "Theft", ts(2024, 1, 1)),
            Row("X1", "Theft", ts(2024, 1, 1)),
        ];
        let out = dedup_latest(rows, |r| (r.0, r.1), |r| r.2);
        assert_eq!(out.len(), 1);
        // Both rows identical except identity; first index wins.
    }

    #[test]
    fn survivors_stay_in_input_order() {
        let rows = vec![
            Row("A", "x", ts(2024, 1, 1)),
            Row("B", "x", ts(2024, 1, 1)),
            Row("C", "x", ts(2024, 1, 1)),
        ];
        let out = dedup_latest(rows, |r| r.0, |r| r.2);
        let ids: Vec<_> = out.iter().map(|r| r.0).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn empty_input_is_vacuously_deduped() {
        let out: Vec<Row> = dedup_latest(vec![], |r: &Row| r.0, |r| r.2);
        assert!(out.is_empty());
    }
}
