use async_trait::async_trait;
use tabsense_protocol::{PersistedState, SemanticGroup, TabRecord};

/// Host-side query for the currently open tabs. The engine treats the
/// returned batch as ground truth at the start of each recompute.
#[async_trait]
pub trait TabSource: Send + Sync {
    async fn query_tabs(&self) -> anyhow::Result<Vec<TabRecord>>;
}

/// Textual signals of one cluster, handed to the label collaborator.
#[derive(Debug, Clone, Default)]
pub struct LabelRequest {
    /// Highest-frequency meaningful tokens across member titles.
    pub top_tokens: Vec<String>,

    /// Distinct member hosts.
    pub hosts: Vec<String>,

    pub tab_titles: Vec<String>,
}

/// Human-readable cluster naming produced by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterLabel {
    pub label: String,
    pub summary: String,
}

/// External label/summary generator (typically a language model). The engine
/// keeps its heuristic placeholders whenever this is absent or failing.
#[async_trait]
pub trait LabelProvider: Send + Sync {
    async fn label_cluster(&self, request: LabelRequest) -> anyhow::Result<ClusterLabel>;
}

/// Optional request-scoped collaborator that clusters a tab batch
/// semantically instead of statistically.
#[async_trait]
pub trait SemanticClusterer: Send + Sync {
    async fn cluster_tabs(
        &self,
        tabs: &[TabRecord],
        max_groups: usize,
    ) -> anyhow::Result<Vec<SemanticGroup>>;
}

/// Durable slot for the serialized cluster state. Implementations decide the
/// medium; the engine only requires load-after-save fidelity.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<PersistedState>>;

    async fn save(&self, state: &PersistedState) -> anyhow::Result<()>;
}
