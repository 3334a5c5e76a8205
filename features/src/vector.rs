use crate::tokenize::{PageSignals, registrable_domain};
use crate::{HOST_TOKEN_PREFIX, HOST_TOKEN_WEIGHT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Synthetic token carrying the same-site signal for a registrable domain.
pub fn host_token(domain: &str) -> String {
    format!("{HOST_TOKEN_PREFIX}{domain}")
}

/// Sparse mapping from token to non-negative weight.
///
/// Backed by a `BTreeMap` so iteration order is deterministic, which keeps
/// centroid arithmetic and serialized snapshots reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(BTreeMap<String, f32>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vectorize one tab's signals: square-root damped term frequencies plus
    /// the boosted host token when the tab has an http(s) host.
    pub fn from_signals(signals: &PageSignals) -> Self {
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for token in signals.tokens() {
            *counts.entry(token).or_insert(0) += 1;
        }

        let mut weights: BTreeMap<String, f32> = counts
            .into_iter()
            .map(|(token, freq)| (token.to_string(), (freq as f32).sqrt()))
            .collect();

        if let Some(host) = &signals.host {
            let domain = registrable_domain(host);
            if !domain.is_empty() {
                weights.insert(host_token(&domain), HOST_TOKEN_WEIGHT);
            }
        }

        FeatureVector(weights)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Weight of a token, zero when absent.
    pub fn weight(&self, token: &str) -> f32 {
        self.0.get(token).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains_key(token)
    }

    pub fn set(&mut self, token: impl Into<String>, weight: f32) {
        if weight > 0.0 {
            self.0.insert(token.into(), weight);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(token, weight)| (token.as_str(), *weight))
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}
