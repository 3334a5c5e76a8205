/*!
# Tabsense Engine

The cluster lifecycle manager that keeps an intent grouping of open browser
tabs coherent as tabs open, navigate, and close.

## How a cycle runs

```text
Tab events ──> authoritative tab table ──> debounce (quiet window)
                                               │
                                               v
                 tab source snapshot ──> greedy assignment against
                                         previous clusters as seeds
                                               │
                                               v
                            placeholder / collaborator labels
                                               │
                                               v
                     atomic snapshot publish ──> persist ──> notify
```

Every recompute reconsiders every known tab from scratch, with the previous
cycle's centroids acting only as attractors; this is what keeps cluster ids
(and with them labels and summaries) stable while membership shifts. A
request-scoped `regroup` can delegate grouping to a semantic collaborator
and prefers its result whenever it yields at least one usable group.

State is never lock-protected across await points: each cycle snapshots its
inputs up front and performs a single atomic publish at the end, so an
overlapping stale cycle can only overwrite a newer one wholesale
(last-publish-wins), never corrupt it.
*/

mod config;
mod engine;
mod error;
mod palette;
mod snapshot;
mod store;
mod traits;

pub use config::EngineConfig;
pub use engine::EngineDeps;
pub use engine::TabClusterEngine;
pub use error::EngineError;
pub use error::Result;
pub use palette::ActuationRequest;
pub use palette::GroupColor;
pub use palette::PALETTE;
pub use palette::color_for;
pub use snapshot::ClusterSource;
pub use snapshot::EngineSnapshot;
pub use snapshot::EngineStats;
pub use store::JsonStateStore;
pub use store::MemoryStateStore;
pub use traits::ClusterLabel;
pub use traits::LabelProvider;
pub use traits::LabelRequest;
pub use traits::SemanticClusterer;
pub use traits::StateStore;
pub use traits::TabSource;
