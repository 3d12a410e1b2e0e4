pub mod action;
pub mod dedup;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod prune;
pub mod reconciler;
pub mod report;
pub mod suggest;

pub use action::{Action, Outcome, Tier};
pub use dedup::{consolidate_variants, dedup_positions, flatten_positions, WiperPosition};
pub use error::ReconcileError;
pub use executor::{execute, ExecutorConfig, TierRun};
pub use pipeline::{collections_for, wiper_model_name, Pipeline, PipelineConfig};
pub use prune::{find_duplicates, prune_models, DuplicateGroup, PruneReport};
pub use reconciler::{
    ModelInput, PositionInput, ProductInput, Reconciler, SlugCollision, TierPlan,
};
pub use report::{RunReport, TierCounts, TierReport};
pub use suggest::Suggestion;
