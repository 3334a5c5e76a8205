use crate::cluster::Cluster;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::time::SystemTime;
use tabsense_features::{FeatureVector, PageSignals};
use tabsense_protocol::{ClusterId, SemanticGroup, TabId, TabRecord};
use uuid::Uuid;

/// Semantic collaborator output converted into clusters, plus the tabs no
/// group claimed. The caller decides where the leftovers go.
#[derive(Debug, Clone)]
pub struct SemanticBuild {
    pub clusters: Vec<Cluster>,
    pub leftovers: Vec<TabRecord>,
}

/// Validate collaborator groups against the tab batch and build clusters
/// from the ones that hold up.
///
/// A group referencing a tab outside the batch is discarded wholesale; a tab
/// claimed by more than one group stays with the first. Centroids are the
/// mean of the member vectors so the result can seed later recomputes.
pub fn clusters_from_groups(groups: &[SemanticGroup], tabs: &[TabRecord]) -> SemanticBuild {
    let by_id: HashMap<TabId, &TabRecord> = tabs.iter().map(|tab| (tab.id, tab)).collect();
    let mut claimed: HashSet<TabId> = HashSet::new();
    let mut clusters = Vec::new();

    for group in groups {
        if group.tab_ids.is_empty() {
            continue;
        }
        if group.tab_ids.iter().any(|id| !by_id.contains_key(id)) {
            debug!("discarding group {:?}: references unknown tabs", group.label);
            continue;
        }

        let member_ids: Vec<TabId> = group
            .tab_ids
            .iter()
            .copied()
            .filter(|id| claimed.insert(*id))
            .collect();
        if member_ids.is_empty() {
            continue;
        }

        let mut cluster = Cluster {
            id: ClusterId::new(Uuid::new_v4().to_string()),
            label: group.label.clone(),
            summary: group.summary.clone(),
            tab_ids: Vec::new(),
            centroid: FeatureVector::new(),
            size: 0,
            last_updated: SystemTime::now(),
        };
        for id in member_ids {
            let tab = by_id[&id];
            let vector =
                FeatureVector::from_signals(&PageSignals::extract(&tab.title, &tab.url));
            cluster.push_tab(id, &vector);
        }
        clusters.push(cluster);
    }

    let leftovers: Vec<TabRecord> = tabs
        .iter()
        .filter(|tab| !claimed.contains(&tab.id))
        .cloned()
        .collect();

    SemanticBuild {
        clusters,
        leftovers,
    }
}
