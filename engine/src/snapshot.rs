use tabsense_clustering::Cluster;
use tabsense_protocol::{AssignmentTable, ClusterId, PersistedState, TabRecord};

/// One immutable published generation of the engine's state.
///
/// Recomputes build a fresh snapshot from their inputs and swap it in with a
/// single atomic publish; nothing ever observes a half-built generation.
/// Concurrent recomputes resolve by last-publish-wins.
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    /// Monotonically increasing publish counter. Zero is the restored (or
    /// empty) pre-recompute state.
    pub revision: u64,

    pub tabs: Vec<TabRecord>,

    /// Clusters in descending size order.
    pub clusters: Vec<Cluster>,

    pub assignments: AssignmentTable,
}

impl EngineSnapshot {
    pub fn empty() -> Self {
        Self {
            revision: 0,
            tabs: Vec::new(),
            clusters: Vec::new(),
            assignments: AssignmentTable::new(),
        }
    }

    pub fn cluster(&self, id: &ClusterId) -> Option<&Cluster> {
        self.clusters.iter().find(|cluster| cluster.id == *id)
    }

    /// Serializable form for the durable slot; centroids are dropped.
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState::new(
            self.clusters.iter().map(Cluster::to_persisted).collect(),
            self.assignments.clone(),
        )
    }
}

/// Which clustering path produced a recompute cycle's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterSource {
    /// The statistical greedy assignment pass.
    Heuristic,

    /// The semantic collaborator's grouping, taken when it yielded at least
    /// one usable group.
    Semantic,
}

/// Counters mirrored out of the engine for status surfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub events_handled: u64,
    pub recomputes: u64,
    pub semantic_recomputes: u64,
    pub last_cycle_ms: u64,
}
