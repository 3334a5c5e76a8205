use crate::tab::TabId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable opaque identifier for a cluster.
///
/// Ids survive recompute cycles as long as the cluster keeps attracting tabs,
/// which is what carries label/summary continuity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(String);

impl ClusterId {
    pub fn new(raw: impl Into<String>) -> Self {
        ClusterId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Total mapping from every known tab to the cluster that owns it.
pub type AssignmentTable = HashMap<TabId, ClusterId>;

/// One group produced by the semantic clustering collaborator.
///
/// The engine validates the referenced tab ids against the batch it handed
/// out and discards groups that reference unknown tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticGroup {
    pub label: String,

    #[serde(default)]
    pub summary: String,

    pub tab_ids: Vec<TabId>,
}
