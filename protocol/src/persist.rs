use crate::cluster::{AssignmentTable, ClusterId};
use crate::tab::TabId;
use serde::{Deserialize, Serialize};

/// A cluster as written to the durable state slot.
///
/// The centroid is intentionally absent: it is cheap to rebuild from member
/// tabs after a restart and carries the bulk of the serialized weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedCluster {
    pub id: ClusterId,

    pub label: String,

    #[serde(default)]
    pub summary: String,

    pub tab_ids: Vec<TabId>,

    pub size: usize,
}

/// The full serialized engine state held in the durable key-value slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Version of the persisted format.
    pub version: u32,

    pub clusters: Vec<PersistedCluster>,

    #[serde(default)]
    pub assignments: AssignmentTable,
}

impl PersistedState {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(clusters: Vec<PersistedCluster>, assignments: AssignmentTable) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            clusters,
            assignments,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}
