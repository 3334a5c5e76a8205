use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::palette::{ActuationRequest, color_for};
use crate::snapshot::{ClusterSource, EngineSnapshot, EngineStats};
use crate::traits::{LabelProvider, LabelRequest, SemanticClusterer, StateStore, TabSource};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tabsense_clustering::{
    AssignOutcome, Cluster, DivergencePair, assign_tabs, clusters_from_groups, placeholder_label,
    top_pair_divergence,
};
use tabsense_features::{FeatureVector, PageSignals, centroid_update, page_host};
use tabsense_protocol::{AssignmentTable, ClusterId, TabEvent, TabId, TabRecord};
use tokio::sync::{RwLock, mpsc, watch};
use tokio::time::{Sleep, sleep};
use tokio_util::sync::CancellationToken;

/// External collaborators the engine runs against.
pub struct EngineDeps {
    pub tab_source: Arc<dyn TabSource>,
    pub store: Arc<dyn StateStore>,
    pub label_provider: Option<Arc<dyn LabelProvider>>,
    pub semantic_clusterer: Option<Arc<dyn SemanticClusterer>>,
}

impl EngineDeps {
    pub fn new(tab_source: Arc<dyn TabSource>, store: Arc<dyn StateStore>) -> Self {
        Self {
            tab_source,
            store,
            label_provider: None,
            semantic_clusterer: None,
        }
    }

    pub fn with_label_provider(mut self, provider: Arc<dyn LabelProvider>) -> Self {
        self.label_provider = Some(provider);
        self
    }

    pub fn with_semantic_clusterer(mut self, clusterer: Arc<dyn SemanticClusterer>) -> Self {
        self.semantic_clusterer = Some(clusterer);
        self
    }
}

#[derive(Default)]
struct StatCounters {
    events_handled: AtomicU64,
    recomputes: AtomicU64,
    semantic_recomputes: AtomicU64,
    last_cycle_ms: AtomicU64,
}

struct EngineInner {
    config: EngineConfig,
    deps: EngineDeps,

    /// Authoritative tab table: replaced wholesale at each recompute from
    /// the tab source, patched in place by lifecycle events in between.
    tabs: RwLock<HashMap<TabId, TabRecord>>,

    /// Holds the current published snapshot and fans it out to subscribers.
    update_tx: watch::Sender<Arc<EngineSnapshot>>,

    trigger_tx: mpsc::UnboundedSender<()>,
    trigger_rx: StdMutex<Option<mpsc::UnboundedReceiver<()>>>,

    revision: AtomicU64,
    stats: StatCounters,
    shutdown: CancellationToken,
}

/// The cluster lifecycle manager.
///
/// Owns the authoritative tab table, coalesces lifecycle events behind a
/// quiet window, and runs seeded full-batch recomputes: every cycle
/// reconsiders every known tab from scratch, using the previous cycle's
/// centroids only as attractors. Each cycle publishes one immutable
/// snapshot; overlapping cycles resolve by last-publish-wins.
#[derive(Clone)]
pub struct TabClusterEngine {
    inner: Arc<EngineInner>,
}

impl TabClusterEngine {
    /// Create an engine, restoring any state the durable slot holds. Call
    /// [`TabClusterEngine::start`] to begin servicing debounced events.
    pub async fn new(config: EngineConfig, deps: EngineDeps) -> Result<Self> {
        config.validate().map_err(EngineError::InvalidConfig)?;

        let restored = match deps.store.load().await {
            Ok(state) => state,
            Err(err) => {
                warn!("failed to load persisted clusters, starting fresh: {err}");
                None
            }
        };

        let initial = match restored {
            Some(state) if !state.is_empty() => {
                info!("restored {} persisted clusters", state.clusters.len());
                EngineSnapshot {
                    revision: 0,
                    tabs: Vec::new(),
                    clusters: state.clusters.iter().map(Cluster::from_persisted).collect(),
                    assignments: state.assignments,
                }
            }
            _ => EngineSnapshot::empty(),
        };

        let (update_tx, _) = watch::channel(Arc::new(initial));
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                deps,
                tabs: RwLock::new(HashMap::new()),
                update_tx,
                trigger_tx,
                trigger_rx: StdMutex::new(Some(trigger_rx)),
                revision: AtomicU64::new(0),
                stats: StatCounters::default(),
                shutdown: CancellationToken::new(),
            }),
        })
    }

    /// Spawn the debounce loop. Events arriving before `start` are buffered
    /// and serviced once it runs.
    pub fn start(&self) {
        let Some(mut trigger_rx) = self
            .inner
            .trigger_rx
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
        else {
            warn!("engine already started");
            return;
        };

        let this = self.clone();
        let shutdown = self.inner.shutdown.clone();
        let window = Duration::from_millis(self.inner.config.debounce_ms);
        tokio::spawn(async move {
            let mut flush_timer: Option<Pin<Box<Sleep>>> = None;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    maybe = trigger_rx.recv() => {
                        let Some(()) = maybe else { break };
                        // Cancel-and-reschedule: only the newest trigger's
                        // quiet window survives.
                        flush_timer = Some(Box::pin(sleep(window)));
                    }
                    _ = async {
                        if let Some(timer) = &mut flush_timer {
                            timer.await;
                        }
                    }, if flush_timer.is_some() => {
                        flush_timer = None;
                        if let Err(err) = this.recompute_now().await {
                            warn!("reclustering cycle failed: {err}");
                        }
                    }
                }
            }
        });
    }

    /// Stop servicing events. In-flight recomputes run to completion.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    /// Subscribe to published snapshots. The receiver immediately holds the
    /// current one.
    pub fn subscribe(&self) -> watch::Receiver<Arc<EngineSnapshot>> {
        self.inner.update_tx.subscribe()
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        self.inner.update_tx.borrow().clone()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            events_handled: self.inner.stats.events_handled.load(Ordering::Relaxed),
            recomputes: self.inner.stats.recomputes.load(Ordering::Relaxed),
            semantic_recomputes: self.inner.stats.semantic_recomputes.load(Ordering::Relaxed),
            last_cycle_ms: self.inner.stats.last_cycle_ms.load(Ordering::Relaxed),
        }
    }

    /// Ingest one tab lifecycle event and schedule a debounced recompute.
    /// Events referencing unknown tabs are tolerated.
    pub async fn handle_event(&self, event: TabEvent) {
        {
            let mut tabs = self.inner.tabs.write().await;
            match event {
                TabEvent::Created { mut tab } => {
                    normalize_host(&mut tab);
                    tabs.insert(tab.id, tab);
                }
                TabEvent::Updated { id, title, url } => {
                    if let Some(record) = tabs.get_mut(&id) {
                        if let Some(title) = title {
                            record.title = title;
                        }
                        if let Some(url) = url {
                            record.url = url;
                            record.host = page_host(&record.url).unwrap_or_default();
                        }
                    } else {
                        debug!("update for unknown tab {id}");
                    }
                }
                TabEvent::Removed { id } => {
                    if tabs.remove(&id).is_none() {
                        debug!("removal of unknown tab {id}");
                    }
                }
                TabEvent::Replaced { old_id, new_id } => {
                    if let Some(mut record) = tabs.remove(&old_id) {
                        record.id = new_id;
                        tabs.insert(new_id, record);
                    } else {
                        debug!("replacement of unknown tab {old_id}");
                    }
                }
            }
        }

        self.inner.stats.events_handled.fetch_add(1, Ordering::Relaxed);
        // Buffered until start() takes the receiver; nothing to do if the
        // loop already exited.
        let _ = self.inner.trigger_tx.send(());
    }

    /// Run one recompute cycle immediately, bypassing the quiet window.
    pub async fn recompute_now(&self) -> Result<Arc<EngineSnapshot>> {
        let started = Instant::now();
        let tabs = self.ground_truth_tabs().await;
        let seeds = self.seeds_for(&tabs);
        let outcome = assign_tabs(&tabs, seeds, &self.inner.config.assign);
        Ok(self
            .finish_cycle(tabs, outcome, ClusterSource::Heuristic, started)
            .await)
    }

    /// Request-scoped reclustering: prefer the semantic collaborator's
    /// grouping when it yields at least one usable group, fall back to the
    /// statistical pass otherwise. Errors on an empty or single-tab batch
    /// propagate to the caller.
    pub async fn regroup(&self) -> Result<Arc<EngineSnapshot>> {
        let started = Instant::now();

        let mut tabs = self
            .inner
            .deps
            .tab_source
            .query_tabs()
            .await
            .map_err(|err| EngineError::TabSource(err.to_string()))?;
        for tab in &mut tabs {
            normalize_host(tab);
        }
        if tabs.is_empty() {
            return Err(EngineError::NoTabsAvailable);
        }
        if tabs.len() < 2 {
            return Err(EngineError::NotEnoughTabs);
        }
        self.replace_table(&tabs).await;

        let semantic = if let Some(clusterer) = &self.inner.deps.semantic_clusterer {
            match self.semantic_pass(clusterer.as_ref(), &tabs).await {
                Ok(outcome) => Some(outcome),
                Err(err) => {
                    warn!("{err}; falling back to heuristic clustering");
                    None
                }
            }
        } else {
            None
        };

        let (outcome, source) = match semantic {
            Some(outcome) => (outcome, ClusterSource::Semantic),
            None => {
                let seeds = self.seeds_for(&tabs);
                (
                    assign_tabs(&tabs, seeds, &self.inner.config.assign),
                    ClusterSource::Heuristic,
                )
            }
        };

        Ok(self.finish_cycle(tabs, outcome, source, started).await)
    }

    /// Overwrite a cluster's label and summary, as the labeling collaborator
    /// does after a recompute published placeholders.
    pub async fn set_cluster_label(
        &self,
        id: &ClusterId,
        label: impl Into<String>,
        summary: impl Into<String>,
    ) -> Result<Arc<EngineSnapshot>> {
        let current = self.snapshot();
        let mut clusters = current.clusters.clone();
        let Some(cluster) = clusters.iter_mut().find(|cluster| cluster.id == *id) else {
            return Err(EngineError::UnknownCluster(id.to_string()));
        };
        cluster.label = label.into();
        cluster.summary = summary.into();

        let snapshot = self
            .publish(current.tabs.clone(), clusters, current.assignments.clone())
            .await;
        Ok(snapshot)
    }

    /// Divergence of the two largest published clusters, if two exist.
    pub fn divergence(&self) -> Option<DivergencePair> {
        top_pair_divergence(&self.snapshot().clusters)
    }

    /// Per-cluster actuation orders for a native grouping facility, colors
    /// picked deterministically from the label and position.
    pub fn actuation_plan(&self) -> Vec<ActuationRequest> {
        self.snapshot()
            .clusters
            .iter()
            .enumerate()
            .map(|(index, cluster)| ActuationRequest {
                cluster_id: cluster.id.clone(),
                label: cluster.label.clone(),
                color: color_for(&cluster.label, index),
                tab_ids: cluster.tab_ids.clone(),
            })
            .collect()
    }

    async fn ground_truth_tabs(&self) -> Vec<TabRecord> {
        match self.inner.deps.tab_source.query_tabs().await {
            Ok(mut tabs) => {
                for tab in &mut tabs {
                    normalize_host(tab);
                }
                self.replace_table(&tabs).await;
                tabs
            }
            Err(err) => {
                warn!("tab query failed, clustering last known tabs: {err}");
                let table = self.inner.tabs.read().await;
                let mut tabs: Vec<TabRecord> = table.values().cloned().collect();
                tabs.sort_by_key(|tab| tab.id);
                tabs
            }
        }
    }

    async fn replace_table(&self, tabs: &[TabRecord]) {
        let mut table = self.inner.tabs.write().await;
        table.clear();
        for tab in tabs {
            table.insert(tab.id, tab.clone());
        }
    }

    /// Seeds for the next pass: the published clusters stripped of
    /// membership. A freshly restored generation first rebuilds its
    /// centroids from whichever member tabs are still present.
    fn seeds_for(&self, tabs: &[TabRecord]) -> Vec<Cluster> {
        let current = self.snapshot();
        if current.revision == 0 {
            restored_seeds(&current.clusters, tabs)
        } else {
            current.clusters.iter().map(Cluster::seed).collect()
        }
    }

    async fn semantic_pass(
        &self,
        clusterer: &dyn SemanticClusterer,
        tabs: &[TabRecord],
    ) -> Result<AssignOutcome> {
        let groups = clusterer
            .cluster_tabs(tabs, self.inner.config.max_semantic_groups)
            .await
            .map_err(|err| EngineError::Semantic(err.to_string()))?;

        let build = clusters_from_groups(&groups, tabs);
        if build.clusters.is_empty() {
            return Err(EngineError::NoUsableSemanticGroups);
        }

        // Tabs no group claimed run through the greedy pass against the
        // semantic clusters so the published partition stays total.
        Ok(assign_tabs(
            &build.leftovers,
            build.clusters,
            &self.inner.config.assign,
        ))
    }

    async fn finish_cycle(
        &self,
        tabs: Vec<TabRecord>,
        outcome: AssignOutcome,
        source: ClusterSource,
        started: Instant,
    ) -> Arc<EngineSnapshot> {
        let mut clusters = outcome.clusters;
        self.fill_labels(&mut clusters, &tabs).await;

        let snapshot = self.publish(tabs, clusters, outcome.assignments).await;

        self.inner.stats.recomputes.fetch_add(1, Ordering::Relaxed);
        if source == ClusterSource::Semantic {
            self.inner
                .stats
                .semantic_recomputes
                .fetch_add(1, Ordering::Relaxed);
        }
        self.inner
            .stats
            .last_cycle_ms
            .store(started.elapsed().as_millis() as u64, Ordering::Relaxed);

        info!(
            "recluster cycle {}: {} tabs in {} clusters ({source:?})",
            snapshot.revision,
            snapshot.tabs.len(),
            snapshot.clusters.len()
        );

        snapshot
    }

    async fn publish(
        &self,
        tabs: Vec<TabRecord>,
        clusters: Vec<Cluster>,
        assignments: AssignmentTable,
    ) -> Arc<EngineSnapshot> {
        let revision = self.inner.revision.fetch_add(1, Ordering::Relaxed) + 1;
        let snapshot = Arc::new(EngineSnapshot {
            revision,
            tabs,
            clusters,
            assignments,
        });

        self.inner.update_tx.send_replace(snapshot.clone());

        // Awaited so a cycle is only complete once the slot was offered the
        // state, but failure never rolls back what was just published.
        if let Err(err) = self.inner.deps.store.save(&snapshot.to_persisted()).await {
            warn!("failed to persist cluster state: {err}");
        }

        snapshot
    }

    /// Give every label-less cluster a deterministic placeholder, then let
    /// the labeling collaborator improve on it when one is configured.
    async fn fill_labels(&self, clusters: &mut [Cluster], tabs: &[TabRecord]) {
        for index in 0..clusters.len() {
            if !clusters[index].label.is_empty() {
                continue;
            }

            let (label, summary) = placeholder_label(&clusters[index], tabs, index + 1);
            clusters[index].label = label;
            clusters[index].summary = summary;

            if let Some(provider) = &self.inner.deps.label_provider {
                let request = label_request(&clusters[index], tabs);
                match provider.label_cluster(request).await {
                    Ok(named) if !named.label.is_empty() => {
                        clusters[index].label = named.label;
                        clusters[index].summary = named.summary;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(
                            "label collaborator failed for cluster {}: {err}",
                            clusters[index].id
                        );
                    }
                }
            }
        }
    }
}

fn normalize_host(tab: &mut TabRecord) {
    tab.host = page_host(&tab.url).unwrap_or_default();
}

/// Rebuild restored clusters into seeds by re-vectorizing the member tabs
/// that still exist. A cluster whose members are all gone seeds with an
/// empty centroid and disappears unless it attracts tabs again.
fn restored_seeds(clusters: &[Cluster], tabs: &[TabRecord]) -> Vec<Cluster> {
    let by_id: HashMap<TabId, &TabRecord> = tabs.iter().map(|tab| (tab.id, tab)).collect();

    clusters
        .iter()
        .map(|cluster| {
            let mut centroid = FeatureVector::new();
            let mut folded = 0usize;
            for tab_id in &cluster.tab_ids {
                if let Some(tab) = by_id.get(tab_id) {
                    let vector =
                        FeatureVector::from_signals(&PageSignals::extract(&tab.title, &tab.url));
                    centroid = centroid_update(&centroid, folded, &vector);
                    folded += 1;
                }
            }

            let mut seed = cluster.seed();
            seed.centroid = centroid;
            seed
        })
        .collect()
}

fn label_request(cluster: &Cluster, tabs: &[TabRecord]) -> LabelRequest {
    let members: Vec<&TabRecord> = cluster
        .tab_ids
        .iter()
        .filter_map(|id| tabs.iter().find(|tab| tab.id == *id))
        .collect();

    let mut token_counts: HashMap<String, usize> = HashMap::new();
    let mut hosts: Vec<String> = Vec::new();
    for member in &members {
        let signals = PageSignals::extract(&member.title, &member.url);
        for token in signals.title_tokens {
            *token_counts.entry(token).or_insert(0) += 1;
        }
        if let Some(host) = signals.host
            && !hosts.contains(&host)
        {
            hosts.push(host);
        }
    }

    let mut ranked: Vec<(String, usize)> = token_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    LabelRequest {
        top_tokens: ranked.into_iter().take(5).map(|(token, _)| token).collect(),
        hosts,
        tab_titles: members.iter().map(|tab| tab.title.clone()).collect(),
    }
}
