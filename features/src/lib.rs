//! # Tabsense Features
//!
//! Turns raw tab text (title, URL host, URL path) into sparse term-weight
//! vectors and provides the arithmetic the clustering layer runs on:
//! cosine similarity, incremental centroid means, and the divergence score.
//!
//! Everything in this crate is pure and infallible: malformed or empty input
//! degrades to an empty vector, never an error.

mod similarity;
mod tokenize;
mod vector;

pub use similarity::centroid_update;
pub use similarity::cosine;
pub use similarity::divergence;
pub use tokenize::PageSignals;
pub use tokenize::page_host;
pub use tokenize::registrable_domain;
pub use tokenize::tokenize;
pub use vector::FeatureVector;
pub use vector::host_token;

/// Prefix of the synthetic same-site token contributed by a tab's host.
pub const HOST_TOKEN_PREFIX: &str = "host:";

/// Weight of the synthetic host token, boosted above ordinary title tokens
/// so same-site tabs attract each other.
pub const HOST_TOKEN_WEIGHT: f32 = 3.0;

/// Tokens shorter than this are dropped during tokenization.
pub const MIN_TOKEN_LEN: usize = 2;
