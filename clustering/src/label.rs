use crate::cluster::Cluster;
use std::collections::HashMap;
use tabsense_features::PageSignals;
use tabsense_protocol::TabRecord;

/// Deterministic placeholder label and summary for a cluster no collaborator
/// has labeled yet: the top shared title tokens, else the most common host,
/// else a numbered default. `ordinal` is the cluster's 1-based position in
/// the published ordering.
pub fn placeholder_label(cluster: &Cluster, tabs: &[TabRecord], ordinal: usize) -> (String, String) {
    let members: Vec<&TabRecord> = cluster
        .tab_ids
        .iter()
        .filter_map(|id| tabs.iter().find(|tab| tab.id == *id))
        .collect();

    let mut token_counts: HashMap<String, usize> = HashMap::new();
    let mut host_counts: HashMap<String, usize> = HashMap::new();
    for member in &members {
        let signals = PageSignals::extract(&member.title, &member.url);
        for token in &signals.title_tokens {
            *token_counts.entry(token.clone()).or_insert(0) += 1;
        }
        if let Some(host) = signals.host {
            *host_counts.entry(host).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = token_counts.into_iter().collect();
    // Frequency first, then lexical, so equal inputs always label the same.
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let top: Vec<String> = ranked
        .into_iter()
        .take(2)
        .map(|(token, _)| capitalize(&token))
        .collect();

    if !top.is_empty() {
        let label = top.join(" ");
        let summary = format!("{} tabs sharing: {}", members.len(), label.to_lowercase());
        return (label, summary);
    }

    let mut hosts: Vec<(String, usize)> = host_counts.into_iter().collect();
    hosts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if let Some((host, _)) = hosts.into_iter().next() {
        let summary = format!("{} tabs on {host}", members.len());
        return (host, summary);
    }

    (
        format!("Group {ordinal}"),
        format!("{} tabs", members.len()),
    )
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
