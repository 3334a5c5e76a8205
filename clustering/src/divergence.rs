use crate::cluster::Cluster;
use tabsense_features::divergence;
use tabsense_protocol::ClusterId;

/// The two largest clusters and how far apart they sit.
///
/// Consumers use the score to decide whether a structural action (splitting
/// a window, say) is warranted; nothing here takes that action.
#[derive(Debug, Clone, PartialEq)]
pub struct DivergencePair {
    pub first: ClusterId,
    pub second: ClusterId,
    pub score: f32,
}

/// Rank the two largest clusters by dissimilarity. `None` when fewer than
/// two clusters exist.
pub fn top_pair_divergence(clusters: &[Cluster]) -> Option<DivergencePair> {
    let mut by_size: Vec<&Cluster> = clusters.iter().collect();
    by_size.sort_by(|a, b| b.size.cmp(&a.size));

    let [first, second, ..] = by_size.as_slice() else {
        return None;
    };

    Some(DivergencePair {
        first: first.id.clone(),
        second: second.id.clone(),
        score: divergence(&first.centroid, &second.centroid, first.size, second.size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assign::{AssignConfig, assign_tabs};
    use pretty_assertions::assert_eq;
    use tabsense_protocol::{TabId, TabRecord};

    fn tab(id: u64, title: &str) -> TabRecord {
        TabRecord::new(TabId(id), title, "")
    }

    #[test]
    fn fewer_than_two_clusters_yields_none() {
        assert_eq!(top_pair_divergence(&[]), None);

        let tabs = vec![tab(1, "Rust book"), tab(2, "Rust examples")];
        let outcome = assign_tabs(&tabs, Vec::new(), &AssignConfig::default());
        assert_eq!(outcome.clusters.len(), 1);
        assert_eq!(top_pair_divergence(&outcome.clusters), None);
    }

    #[test]
    fn disjoint_equal_clusters_score_high() {
        let tabs = vec![
            tab(1, "Book flight to Paris"),
            tab(2, "Hotels in Paris"),
            tab(3, "React useState docs"),
            tab(4, "React useEffect guide"),
        ];
        let outcome = assign_tabs(&tabs, Vec::new(), &AssignConfig::default());

        let pair = top_pair_divergence(&outcome.clusters).unwrap();
        assert_eq!(pair.score, 1.0);
        assert_ne!(pair.first, pair.second);
    }
}
