//! End-to-end exercises of the cluster lifecycle: event intake, debounced
//! recomputes, the semantic/heuristic regroup paths, persistence, and restart
//! reconciliation.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tabsense_engine::{
    ClusterLabel, EngineConfig, EngineDeps, EngineError, JsonStateStore, LabelProvider,
    LabelRequest, MemoryStateStore, SemanticClusterer, StateStore, TabClusterEngine, TabSource,
};
use tabsense_protocol::{PersistedState, SemanticGroup, TabEvent, TabId, TabRecord};
use tempfile::TempDir;

fn tab(id: u64, title: &str, url: &str) -> TabRecord {
    TabRecord::new(TabId(id), title, url)
}

fn four_tabs() -> Vec<TabRecord> {
    vec![
        tab(1, "Book flight to Paris", ""),
        tab(2, "Hotels in Paris", ""),
        tab(3, "React useState docs", ""),
        tab(4, "React useEffect guide", ""),
    ]
}

fn partition(engine: &TabClusterEngine) -> BTreeSet<BTreeSet<TabId>> {
    engine
        .snapshot()
        .clusters
        .iter()
        .map(|cluster| cluster.tab_ids.iter().copied().collect())
        .collect()
}

fn ids(raw: &[u64]) -> BTreeSet<TabId> {
    raw.iter().map(|id| TabId(*id)).collect()
}

/// Fixed batch standing in for the host browser.
struct FixedTabs(Vec<TabRecord>);

#[async_trait]
impl TabSource for FixedTabs {
    async fn query_tabs(&self) -> anyhow::Result<Vec<TabRecord>> {
        Ok(self.0.clone())
    }
}

/// Host that cannot be queried; the engine must cluster its own tab table.
struct FailingTabs;

#[async_trait]
impl TabSource for FailingTabs {
    async fn query_tabs(&self) -> anyhow::Result<Vec<TabRecord>> {
        anyhow::bail!("browser bridge is down")
    }
}

struct StubSemantic(Vec<SemanticGroup>);

#[async_trait]
impl SemanticClusterer for StubSemantic {
    async fn cluster_tabs(
        &self,
        _tabs: &[TabRecord],
        _max_groups: usize,
    ) -> anyhow::Result<Vec<SemanticGroup>> {
        Ok(self.0.clone())
    }
}

struct StubLabeler;

#[async_trait]
impl LabelProvider for StubLabeler {
    async fn label_cluster(&self, request: LabelRequest) -> anyhow::Result<ClusterLabel> {
        let top = request.top_tokens.first().cloned().unwrap_or_default();
        Ok(ClusterLabel {
            label: format!("AI {top}"),
            summary: format!("{} tabs about {top}", request.tab_titles.len()),
        })
    }
}

/// Store whose writes always fail; loads find nothing.
struct BrokenStore;

#[async_trait]
impl StateStore for BrokenStore {
    async fn load(&self) -> anyhow::Result<Option<PersistedState>> {
        Ok(None)
    }

    async fn save(&self, _state: &PersistedState) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }
}

async fn engine_with(deps: EngineDeps) -> TabClusterEngine {
    TabClusterEngine::new(EngineConfig::default(), deps)
        .await
        .unwrap()
}

#[test_log::test(tokio::test)]
async fn recompute_partitions_travel_and_react_tabs() {
    let deps = EngineDeps::new(
        Arc::new(FixedTabs(four_tabs())),
        Arc::new(MemoryStateStore::new()),
    );
    let engine = engine_with(deps).await;

    let snapshot = engine.recompute_now().await.unwrap();

    assert_eq!(snapshot.revision, 1);
    assert_eq!(
        partition(&engine),
        [ids(&[1, 2]), ids(&[3, 4])].into_iter().collect()
    );
    assert_eq!(snapshot.assignments.len(), 4);
    for cluster in &snapshot.clusters {
        assert!(!cluster.label.is_empty());
        assert_eq!(
            snapshot.assignments.get(&cluster.tab_ids[0]),
            Some(&cluster.id)
        );
    }
}

#[test_log::test(tokio::test)]
async fn event_burst_coalesces_into_one_recompute() {
    let deps = EngineDeps::new(
        Arc::new(FixedTabs(four_tabs())),
        Arc::new(MemoryStateStore::new()),
    );
    let config = EngineConfig {
        debounce_ms: 50,
        ..Default::default()
    };
    let engine = TabClusterEngine::new(config, deps).await.unwrap();

    // Events delivered before start() are buffered and serviced together.
    for record in four_tabs() {
        engine.handle_event(TabEvent::Created { tab: record }).await;
    }
    engine.start();

    tokio::time::sleep(Duration::from_millis(400)).await;

    let stats = engine.stats();
    assert_eq!(stats.events_handled, 4);
    assert_eq!(stats.recomputes, 1);
    assert_eq!(engine.snapshot().revision, 1);
    assert_eq!(engine.snapshot().clusters.len(), 2);

    engine.shutdown();
}

#[test_log::test(tokio::test)]
async fn shutdown_stops_servicing_events() {
    let deps = EngineDeps::new(
        Arc::new(FixedTabs(four_tabs())),
        Arc::new(MemoryStateStore::new()),
    );
    let config = EngineConfig {
        debounce_ms: 50,
        ..Default::default()
    };
    let engine = TabClusterEngine::new(config, deps).await.unwrap();

    engine.start();
    engine.shutdown();
    for record in four_tabs() {
        engine.handle_event(TabEvent::Created { tab: record }).await;
    }

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(engine.stats().recomputes, 0);
    assert_eq!(engine.snapshot().revision, 0);
}

#[test_log::test(tokio::test)]
async fn closed_tab_leaves_the_partition() {
    // With the host unreachable, the engine clusters its own event-built
    // table.
    let deps = EngineDeps::new(Arc::new(FailingTabs), Arc::new(MemoryStateStore::new()));
    let engine = engine_with(deps).await;

    for record in four_tabs() {
        engine.handle_event(TabEvent::Created { tab: record }).await;
    }
    engine.recompute_now().await.unwrap();
    assert_eq!(partition(&engine).len(), 2);

    engine.handle_event(TabEvent::Removed { id: TabId(2) }).await;
    let snapshot = engine.recompute_now().await.unwrap();

    assert_eq!(
        partition(&engine),
        [ids(&[1]), ids(&[3, 4])].into_iter().collect()
    );
    assert_eq!(snapshot.assignments.len(), 3);
    assert!(!snapshot.assignments.contains_key(&TabId(2)));
}

#[test_log::test(tokio::test)]
async fn navigating_tab_moves_between_clusters() {
    let deps = EngineDeps::new(Arc::new(FailingTabs), Arc::new(MemoryStateStore::new()));
    let engine = engine_with(deps).await;

    for record in four_tabs() {
        engine.handle_event(TabEvent::Created { tab: record }).await;
    }
    engine.recompute_now().await.unwrap();

    let react_id = engine
        .snapshot()
        .clusters
        .iter()
        .find(|cluster| cluster.tab_ids.contains(&TabId(3)))
        .map(|cluster| cluster.id.clone())
        .unwrap();

    // Tab 2 navigates away from travel planning.
    engine
        .handle_event(TabEvent::Updated {
            id: TabId(2),
            title: Some("React hooks guide".to_string()),
            url: None,
        })
        .await;
    engine.recompute_now().await.unwrap();

    assert_eq!(
        partition(&engine),
        [ids(&[1]), ids(&[2, 3, 4])].into_iter().collect()
    );
    // The grown cluster is still the same cluster.
    assert_eq!(engine.snapshot().assignments.get(&TabId(2)), Some(&react_id));
}

#[test_log::test(tokio::test)]
async fn replaced_tab_keeps_its_metadata() {
    let deps = EngineDeps::new(Arc::new(FailingTabs), Arc::new(MemoryStateStore::new()));
    let engine = engine_with(deps).await;

    for record in four_tabs() {
        engine.handle_event(TabEvent::Created { tab: record }).await;
    }
    engine
        .handle_event(TabEvent::Replaced {
            old_id: TabId(2),
            new_id: TabId(20),
        })
        .await;
    engine.recompute_now().await.unwrap();

    assert_eq!(
        partition(&engine),
        [ids(&[1, 20]), ids(&[3, 4])].into_iter().collect()
    );
}

#[test_log::test(tokio::test)]
async fn events_for_unknown_tabs_are_tolerated() {
    let deps = EngineDeps::new(Arc::new(FailingTabs), Arc::new(MemoryStateStore::new()));
    let engine = engine_with(deps).await;

    engine
        .handle_event(TabEvent::Updated {
            id: TabId(77),
            title: Some("Ghost".to_string()),
            url: None,
        })
        .await;
    engine.handle_event(TabEvent::Removed { id: TabId(77) }).await;
    engine
        .handle_event(TabEvent::Replaced {
            old_id: TabId(77),
            new_id: TabId(78),
        })
        .await;
    engine
        .handle_event(TabEvent::Created {
            tab: tab(1, "React useState docs", ""),
        })
        .await;

    let snapshot = engine.recompute_now().await.unwrap();
    assert_eq!(engine.stats().events_handled, 4);
    assert_eq!(snapshot.clusters.len(), 1);
    assert_eq!(partition(&engine), [ids(&[1])].into_iter().collect());
}

#[test_log::test(tokio::test)]
async fn regroup_prefers_a_usable_semantic_result() {
    let groups = vec![
        SemanticGroup {
            label: "Trip planning".to_string(),
            summary: "Flights and hotels".to_string(),
            tab_ids: vec![TabId(1), TabId(2)],
        },
        SemanticGroup {
            label: "React study".to_string(),
            summary: "Hooks documentation".to_string(),
            tab_ids: vec![TabId(3), TabId(4)],
        },
    ];
    let deps = EngineDeps::new(
        Arc::new(FixedTabs(four_tabs())),
        Arc::new(MemoryStateStore::new()),
    )
    .with_semantic_clusterer(Arc::new(StubSemantic(groups)));
    let engine = engine_with(deps).await;

    let snapshot = engine.regroup().await.unwrap();

    let labels: BTreeSet<&str> = snapshot
        .clusters
        .iter()
        .map(|cluster| cluster.label.as_str())
        .collect();
    assert_eq!(labels, ["Trip planning", "React study"].into_iter().collect());
    assert_eq!(
        partition(&engine),
        [ids(&[1, 2]), ids(&[3, 4])].into_iter().collect()
    );
    assert_eq!(engine.stats().semantic_recomputes, 1);
}

#[test_log::test(tokio::test)]
async fn regroup_falls_back_when_no_group_is_usable() {
    // Every group references tabs outside the batch, so all are discarded.
    let groups = vec![SemanticGroup {
        label: "Ghost".to_string(),
        summary: String::new(),
        tab_ids: vec![TabId(99), TabId(100)],
    }];
    let deps = EngineDeps::new(
        Arc::new(FixedTabs(four_tabs())),
        Arc::new(MemoryStateStore::new()),
    )
    .with_semantic_clusterer(Arc::new(StubSemantic(groups)));
    let engine = engine_with(deps).await;

    let snapshot = engine.regroup().await.unwrap();

    assert_eq!(
        partition(&engine),
        [ids(&[1, 2]), ids(&[3, 4])].into_iter().collect()
    );
    assert!(snapshot.clusters.iter().all(|c| c.label != "Ghost"));
    assert_eq!(engine.stats().semantic_recomputes, 0);
}

#[test_log::test(tokio::test)]
async fn regroup_routes_unclaimed_tabs_through_the_heuristic_pass() {
    let groups = vec![SemanticGroup {
        label: "Trip planning".to_string(),
        summary: String::new(),
        tab_ids: vec![TabId(1), TabId(2)],
    }];
    let deps = EngineDeps::new(
        Arc::new(FixedTabs(four_tabs())),
        Arc::new(MemoryStateStore::new()),
    )
    .with_semantic_clusterer(Arc::new(StubSemantic(groups)));
    let engine = engine_with(deps).await;

    let snapshot = engine.regroup().await.unwrap();

    // The semantic group survives as-is; the React tabs it never claimed
    // still land together.
    assert_eq!(
        partition(&engine),
        [ids(&[1, 2]), ids(&[3, 4])].into_iter().collect()
    );
    let trip = snapshot
        .clusters
        .iter()
        .find(|cluster| cluster.tab_ids.contains(&TabId(1)))
        .unwrap();
    assert_eq!(trip.label, "Trip planning");
    assert_eq!(engine.stats().semantic_recomputes, 1);
}

#[test_log::test(tokio::test)]
async fn regroup_needs_at_least_two_tabs() {
    let deps = EngineDeps::new(Arc::new(FixedTabs(Vec::new())), Arc::new(MemoryStateStore::new()));
    let engine = engine_with(deps).await;
    assert!(matches!(
        engine.regroup().await,
        Err(EngineError::NoTabsAvailable)
    ));

    let deps = EngineDeps::new(
        Arc::new(FixedTabs(vec![tab(1, "Lone tab", "")])),
        Arc::new(MemoryStateStore::new()),
    );
    let engine = engine_with(deps).await;
    assert!(matches!(
        engine.regroup().await,
        Err(EngineError::NotEnoughTabs)
    ));
}

#[test_log::test(tokio::test)]
async fn label_collaborator_overrides_placeholders() {
    let deps = EngineDeps::new(
        Arc::new(FixedTabs(four_tabs())),
        Arc::new(MemoryStateStore::new()),
    )
    .with_label_provider(Arc::new(StubLabeler));
    let engine = engine_with(deps).await;

    let snapshot = engine.recompute_now().await.unwrap();

    for cluster in &snapshot.clusters {
        assert!(cluster.label.starts_with("AI "), "got {:?}", cluster.label);
        assert!(!cluster.summary.is_empty());
    }
}

#[test_log::test(tokio::test)]
async fn watch_subscribers_observe_each_publish() {
    let deps = EngineDeps::new(
        Arc::new(FixedTabs(four_tabs())),
        Arc::new(MemoryStateStore::new()),
    );
    let engine = engine_with(deps).await;

    let mut updates = engine.subscribe();
    assert_eq!(updates.borrow().revision, 0);

    engine.recompute_now().await.unwrap();
    updates.changed().await.unwrap();
    {
        let snapshot = updates.borrow_and_update();
        assert_eq!(snapshot.revision, 1);
        assert_eq!(snapshot.clusters.len(), 2);
    }

    engine.recompute_now().await.unwrap();
    updates.changed().await.unwrap();
    assert_eq!(updates.borrow_and_update().revision, 2);
}

#[test_log::test(tokio::test)]
async fn persistence_failure_does_not_roll_back_published_state() {
    let deps = EngineDeps::new(Arc::new(FixedTabs(four_tabs())), Arc::new(BrokenStore));
    let engine = engine_with(deps).await;

    let snapshot = engine.recompute_now().await.unwrap();

    assert_eq!(snapshot.revision, 1);
    assert_eq!(snapshot.clusters.len(), 2);
    assert_eq!(engine.snapshot().revision, 1);
}

#[test_log::test(tokio::test)]
async fn restart_reproduces_the_partition_and_keeps_labels() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("clusters.json");

    let deps = EngineDeps::new(
        Arc::new(FixedTabs(four_tabs())),
        Arc::new(JsonStateStore::new(&path)),
    );
    let engine = engine_with(deps).await;
    engine.recompute_now().await.unwrap();

    let before = partition(&engine);
    let travel = engine
        .snapshot()
        .clusters
        .iter()
        .find(|cluster| cluster.tab_ids.contains(&TabId(1)))
        .map(|cluster| cluster.id.clone())
        .unwrap();
    engine
        .set_cluster_label(&travel, "Paris trip", "Planning travel to Paris")
        .await
        .unwrap();

    // Same store, same tab snapshot, fresh process.
    let deps = EngineDeps::new(
        Arc::new(FixedTabs(four_tabs())),
        Arc::new(JsonStateStore::new(&path)),
    );
    let restarted = engine_with(deps).await;

    // Restored clusters come back with membership and labels but revision 0.
    assert_eq!(restarted.snapshot().revision, 0);
    assert_eq!(partition(&restarted), before);

    let snapshot = restarted.recompute_now().await.unwrap();
    assert_eq!(partition(&restarted), before);

    let travel_after = snapshot
        .clusters
        .iter()
        .find(|cluster| cluster.tab_ids.contains(&TabId(1)))
        .unwrap();
    assert_eq!(travel_after.id, travel);
    assert_eq!(travel_after.label, "Paris trip");
    assert_eq!(travel_after.summary, "Planning travel to Paris");
}

#[test_log::test(tokio::test)]
async fn actuation_plan_is_deterministic() {
    let deps = EngineDeps::new(
        Arc::new(FixedTabs(four_tabs())),
        Arc::new(MemoryStateStore::new()),
    );
    let engine = engine_with(deps).await;
    engine.recompute_now().await.unwrap();

    let first = engine.actuation_plan();
    let second = engine.actuation_plan();
    assert_eq!(first, second);

    let snapshot = engine.snapshot();
    assert_eq!(first.len(), snapshot.clusters.len());
    for (order, cluster) in first.iter().zip(snapshot.clusters.iter()) {
        assert_eq!(order.cluster_id, cluster.id);
        assert_eq!(order.tab_ids, cluster.tab_ids);
        assert_eq!(order.label, cluster.label);
    }
}

#[test_log::test(tokio::test)]
async fn divergence_reports_the_two_largest_clusters() {
    let deps = EngineDeps::new(
        Arc::new(FixedTabs(four_tabs())),
        Arc::new(MemoryStateStore::new()),
    );
    let engine = engine_with(deps).await;

    assert!(engine.divergence().is_none());

    engine.recompute_now().await.unwrap();
    let pair = engine.divergence().unwrap();
    assert_ne!(pair.first, pair.second);
    // Disjoint token sets at equal size: maximal divergence.
    assert!((pair.score - 1.0).abs() < 1e-6);
}
