/*!
# Tabsense Clustering

Single-pass greedy intent clustering of a tab batch against a set of seed
clusters, plus the supporting pieces the lifecycle layer needs around it:
heuristic placeholder labels, conversion of semantic collaborator output
into clusters, and the divergence ranking of the two largest clusters.

The assignment walk is deliberately order-dependent: tabs are matched
first-fit against the best-scoring cluster so far, which keeps the pass
linear and makes results reproducible for a given input order. It is not an
optimum-seeking clustering.
*/

mod assign;
mod cluster;
mod divergence;
mod label;
mod semantic;

pub use assign::AssignConfig;
pub use assign::AssignOutcome;
pub use assign::assign_tabs;
pub use cluster::Cluster;
pub use divergence::DivergencePair;
pub use divergence::top_pair_divergence;
pub use label::placeholder_label;
pub use semantic::SemanticBuild;
pub use semantic::clusters_from_groups;
