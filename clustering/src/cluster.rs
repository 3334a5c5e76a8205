use std::time::SystemTime;
use tabsense_features::{FeatureVector, centroid_update};
use tabsense_protocol::{ClusterId, PersistedCluster, TabId};
use uuid::Uuid;

/// A group of tabs believed to share user intent.
///
/// `label` and `summary` are filled externally (or by the placeholder
/// heuristic) and carried across recompute cycles whenever the cluster id
/// survives; the engine never invents them beyond the placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,

    pub label: String,

    pub summary: String,

    /// Member tabs in assignment order, no duplicates.
    pub tab_ids: Vec<TabId>,

    /// Running mean of the member vectors.
    pub centroid: FeatureVector,

    pub size: usize,

    pub last_updated: SystemTime,
}

fn fresh_id() -> ClusterId {
    ClusterId::new(Uuid::new_v4().to_string())
}

impl Cluster {
    /// Open a new cluster around a single tab. The centroid starts as the
    /// tab's own vector.
    pub fn from_tab(tab_id: TabId, vector: FeatureVector) -> Self {
        Self {
            id: fresh_id(),
            label: String::new(),
            summary: String::new(),
            tab_ids: vec![tab_id],
            centroid: vector,
            size: 1,
            last_updated: SystemTime::now(),
        }
    }

    /// Derive a seed for the next recompute cycle: membership cleared, size
    /// reset, centroid kept as an attractor, label and summary carried.
    pub fn seed(&self) -> Self {
        Self {
            id: self.id.clone(),
            label: self.label.clone(),
            summary: self.summary.clone(),
            tab_ids: Vec::new(),
            centroid: self.centroid.clone(),
            size: 0,
            last_updated: self.last_updated,
        }
    }

    /// Rehydrate a cluster from the durable slot. Membership, label, and
    /// summary come back as persisted; the centroid starts empty and is
    /// rebuilt from the surviving member tabs before the first recompute.
    pub fn from_persisted(persisted: &PersistedCluster) -> Self {
        Self {
            id: persisted.id.clone(),
            label: persisted.label.clone(),
            summary: persisted.summary.clone(),
            tab_ids: persisted.tab_ids.clone(),
            centroid: FeatureVector::new(),
            size: persisted.size,
            last_updated: SystemTime::now(),
        }
    }

    /// Append a member and fold its vector into the centroid mean.
    pub fn push_tab(&mut self, tab_id: TabId, vector: &FeatureVector) {
        self.centroid = centroid_update(&self.centroid, self.size, vector);
        self.size += 1;
        self.tab_ids.push(tab_id);
        self.last_updated = SystemTime::now();
    }

    pub fn is_empty(&self) -> bool {
        self.tab_ids.is_empty()
    }

    pub fn to_persisted(&self) -> PersistedCluster {
        PersistedCluster {
            id: self.id.clone(),
            label: self.label.clone(),
            summary: self.summary.clone(),
            tab_ids: self.tab_ids.clone(),
            size: self.size,
        }
    }
}
