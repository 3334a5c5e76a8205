use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use log::debug;
use owo_colors::OwoColorize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabsense_clustering::AssignConfig;
use tabsense_engine::{
    EngineConfig, EngineDeps, EngineSnapshot, MemoryStateStore, TabClusterEngine, TabSource,
};
use tabsense_protocol::TabRecord;

/// One-shot intent clustering of a tab snapshot.
///
/// Reads a JSON array of `{id, title, url}` records, runs a single heuristic
/// clustering pass, and prints the resulting groups with their palette
/// colors.
#[derive(Debug, Parser)]
#[command(name = "tabsense", version)]
struct Cli {
    /// Tabs JSON file; reads stdin when absent or `-`
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Minimum cosine score for a tab to join an existing cluster
    #[arg(long, value_name = "SCORE")]
    threshold: Option<f32>,

    /// Also report how far apart the two largest clusters sit
    #[arg(short, long)]
    divergence: bool,

    /// Emit machine-readable JSON instead of the colored report
    #[arg(long)]
    json: bool,
}

/// Fixed tab batch standing in for a live browser connection.
struct SnapshotSource {
    tabs: Vec<TabRecord>,
}

#[async_trait]
impl TabSource for SnapshotSource {
    async fn query_tabs(&self) -> anyhow::Result<Vec<TabRecord>> {
        Ok(self.tabs.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let tabs = read_tabs(cli.input.as_deref())?;
    debug!("loaded {} tabs", tabs.len());

    let mut config = EngineConfig::default();
    if let Some(threshold) = cli.threshold {
        config.assign = AssignConfig {
            similarity_threshold: threshold,
            ..Default::default()
        };
    }

    let deps = EngineDeps::new(
        Arc::new(SnapshotSource { tabs }),
        Arc::new(MemoryStateStore::new()),
    );
    let engine = TabClusterEngine::new(config, deps)
        .await
        .context("failed to initialize the clustering engine")?;
    let snapshot = engine
        .recompute_now()
        .await
        .context("clustering pass failed")?;

    if cli.json {
        print_json(&engine, &snapshot, cli.divergence)?;
    } else {
        print_report(&engine, &snapshot, cli.divergence);
    }

    Ok(())
}

fn read_tabs(path: Option<&Path>) -> Result<Vec<TabRecord>> {
    let raw = match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            buffer
        }
    };

    serde_json::from_str(&raw).context("input is not a JSON array of {id, title, url} records")
}

fn print_report(engine: &TabClusterEngine, snapshot: &EngineSnapshot, divergence: bool) {
    let plan = engine.actuation_plan();

    println!(
        "{} {} tabs in {} clusters",
        "✓".bright_green(),
        snapshot.tabs.len(),
        snapshot.clusters.len()
    );

    for (index, (cluster, order)) in snapshot.clusters.iter().zip(&plan).enumerate() {
        println!();
        println!(
            "{}. {} {}",
            (index + 1).to_string().bright_yellow(),
            cluster.label.bright_cyan(),
            format!("[{}]", order.color.as_str()).bright_black()
        );
        if !cluster.summary.is_empty() {
            println!("   {}", cluster.summary.dimmed());
        }
        for tab_id in &cluster.tab_ids {
            let title = snapshot
                .tabs
                .iter()
                .find(|tab| tab.id == *tab_id)
                .map(|tab| tab.title.as_str())
                .unwrap_or("(untitled)");
            println!("   {} {title}", "-".bright_black());
        }
    }

    if divergence {
        println!();
        match engine.divergence() {
            Some(pair) => {
                let label = |id| {
                    snapshot
                        .cluster(id)
                        .map(|cluster| cluster.label.clone())
                        .unwrap_or_else(|| id.to_string())
                };
                println!(
                    "{} divergence {:.3} between {} and {}",
                    "▶".bright_blue(),
                    pair.score,
                    label(&pair.first).bright_cyan(),
                    label(&pair.second).bright_cyan()
                );
            }
            None => println!(
                "{} need at least two clusters for a divergence report",
                "✗".bright_red()
            ),
        }
    }
}

fn print_json(engine: &TabClusterEngine, snapshot: &EngineSnapshot, divergence: bool) -> Result<()> {
    let plan = engine.actuation_plan();

    let clusters: Vec<serde_json::Value> = snapshot
        .clusters
        .iter()
        .zip(&plan)
        .map(|(cluster, order)| {
            serde_json::json!({
                "id": cluster.id,
                "label": cluster.label,
                "summary": cluster.summary,
                "color": order.color,
                "tab_ids": cluster.tab_ids,
                "size": cluster.size,
            })
        })
        .collect();

    let mut report = serde_json::json!({
        "tabs": snapshot.tabs,
        "clusters": clusters,
        "assignments": snapshot.assignments,
    });

    if divergence && let Some(pair) = engine.divergence() {
        report["divergence"] = serde_json::json!({
            "first": pair.first,
            "second": pair.second,
            "score": pair.score,
        });
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
