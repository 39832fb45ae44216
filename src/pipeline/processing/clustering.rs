//! Single-link clustering of orbital periods / semi-major axes.
//!
//! Values are sorted and any two neighbours whose difference is within
//! `tolerance * max(|a|, |b|)` share a cluster. Chaining is transitive: three
//! values can end up together even when the outer two are too far apart.

/// Cluster id for rows without a usable value
pub const NO_CLUSTER: i64 = -1;

/// Assigns a cluster id to every input position; ids follow ascending value order
pub fn cluster_values(values: &[Option<f64>], tolerance: f64) -> Vec<i64> {
    let mut ids = vec![NO_CLUSTER; values.len()];

    let mut order: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(idx, v)| v.filter(|x| x.is_finite()).map(|x| (idx, x)))
        .collect();
    order.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut current = NO_CLUSTER;
    let mut previous: Option<f64> = None;
    for (idx, value) in order {
        let joins = previous.map_or(false, |prev| within_tolerance(prev, value, tolerance));
        if !joins {
            current += 1;
        }
        ids[idx] = current;
        previous = Some(value);
    }

    ids
}

/// Relative closeness test used for both periods and semi-major axes
pub fn within_tolerance(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * a.abs().max(b.abs())
}

/// Distinct real cluster ids, ascending
pub fn distinct_clusters(ids: &[i64]) -> Vec<i64> {
    let mut distinct: Vec<i64> = ids.iter().copied().filter(|id| *id != NO_CLUSTER).collect();
    distinct.sort_unstable();
    distinct.dedup();
    distinct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_values_share_cluster() {
        let ids = cluster_values(&[Some(4.23), Some(4.2308), Some(10.0)], 0.1);
        assert_eq!(ids[0], ids[1]);
        assert_ne!(ids[0], ids[2]);
    }

    #[test]
    fn test_transitive_chaining() {
        // 10 and 11.9 are 16% apart but chain through 10.9
        let ids = cluster_values(&[Some(10.0), Some(11.9), Some(10.9)], 0.1);
        assert_eq!(ids, vec![0, 0, 0]);
    }

    #[test]
    fn test_missing_values_get_no_cluster() {
        let ids = cluster_values(&[None, Some(3.0), Some(f64::NAN)], 0.1);
        assert_eq!(ids, vec![NO_CLUSTER, 0, NO_CLUSTER]);
        assert_eq!(distinct_clusters(&ids), vec![0]);
    }

    #[test]
    fn test_pairwise_tolerance_implies_same_cluster() {
        let values = [1.0, 1.05, 2.0, 2.1, 2.15, 5.0, 5.4];
        let input: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
        let ids = cluster_values(&input, 0.1);
        for (i, a) in values.iter().enumerate() {
            for (j, b) in values.iter().enumerate() {
                if within_tolerance(*a, *b, 0.1) {
                    assert_eq!(ids[i], ids[j], "{} and {} should share a cluster", a, b);
                }
            }
        }
        assert_eq!(distinct_clusters(&ids).len(), 3);
    }

    #[test]
    fn test_empty_input() {
        assert!(cluster_values(&[], 0.1).is_empty());
    }
}
