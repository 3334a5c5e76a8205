use crate::cluster::Cluster;
use log::debug;
use serde::{Deserialize, Serialize};
use tabsense_features::{FeatureVector, PageSignals, cosine, host_token, registrable_domain};
use tabsense_protocol::{AssignmentTable, TabRecord};

/// Tuning knobs for the greedy assignment pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignConfig {
    /// Minimum cosine score for a tab to join an existing cluster.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Added to a cluster's score when it already holds at least two members
    /// and its centroid carries the tab's host token.
    #[serde(default = "default_host_bonus")]
    pub host_bonus: f32,

    /// Softens the threshold so borderline tabs prefer joining an existing
    /// cluster over opening a fresh one.
    #[serde(default = "default_new_cluster_penalty")]
    pub new_cluster_penalty: f32,
}

fn default_similarity_threshold() -> f32 {
    0.6
}

fn default_host_bonus() -> f32 {
    0.08
}

fn default_new_cluster_penalty() -> f32 {
    0.02
}

impl Default for AssignConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            host_bonus: default_host_bonus(),
            new_cluster_penalty: default_new_cluster_penalty(),
        }
    }
}

impl AssignConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(format!(
                "similarity threshold must be within [0, 1], got {}",
                self.similarity_threshold
            ));
        }
        if self.host_bonus < 0.0 {
            return Err("host bonus must be >= 0".to_string());
        }
        if self.new_cluster_penalty < 0.0 || self.new_cluster_penalty >= self.similarity_threshold
        {
            return Err("new-cluster penalty must be >= 0 and below the threshold".to_string());
        }
        Ok(())
    }

    /// The score a tab must exceed to join an existing cluster.
    pub fn acceptance_bar(&self) -> f32 {
        self.similarity_threshold - self.new_cluster_penalty
    }
}

/// Result of one assignment pass: clusters sorted by descending size and the
/// tab-to-cluster table derived from them.
#[derive(Debug, Clone)]
pub struct AssignOutcome {
    pub clusters: Vec<Cluster>,
    pub assignments: AssignmentTable,
}

/// Cluster a tab batch against a set of seed clusters in a single greedy
/// pass.
///
/// Tabs are visited in input order and ties go to the earliest cluster, so
/// the partition depends on that order. Seeds that attract no tabs are
/// dropped from the output; every tab lands in exactly one cluster.
pub fn assign_tabs(
    tabs: &[TabRecord],
    seeds: Vec<Cluster>,
    config: &AssignConfig,
) -> AssignOutcome {
    let mut clusters = seeds;
    let bar = config.acceptance_bar();

    for tab in tabs {
        let signals = PageSignals::extract(&tab.title, &tab.url);
        let vector = FeatureVector::from_signals(&signals);
        let host_key = signals
            .host
            .as_deref()
            .map(registrable_domain)
            .filter(|domain| !domain.is_empty())
            .map(|domain| host_token(&domain));

        let mut best: Option<(usize, f32)> = None;
        for (idx, cluster) in clusters.iter().enumerate() {
            let mut score = cosine(&vector, &cluster.centroid);
            if cluster.size >= 2
                && let Some(key) = &host_key
                && cluster.centroid.contains(key)
            {
                score += config.host_bonus;
            }
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((idx, score));
            }
        }

        match best {
            Some((idx, score)) if score > bar => {
                debug!("tab {} joins cluster {} (score {score:.3})", tab.id, clusters[idx].id);
                clusters[idx].push_tab(tab.id, &vector);
            }
            _ => {
                let cluster = Cluster::from_tab(tab.id, vector);
                debug!("tab {} opens cluster {}", tab.id, cluster.id);
                clusters.push(cluster);
            }
        }
    }

    clusters.retain(|cluster| !cluster.is_empty());
    clusters.sort_by(|a, b| b.size.cmp(&a.size));

    let mut assignments = AssignmentTable::new();
    for cluster in &clusters {
        for tab_id in &cluster.tab_ids {
            assignments.insert(*tab_id, cluster.id.clone());
        }
    }

    AssignOutcome {
        clusters,
        assignments,
    }
}
