//! Pipeline components: cancel token, context, walk, workers, aggregator.

pub mod aggregate;
pub mod cancel;
pub mod context;
pub mod orchestrator;
pub mod walk;
pub mod workers;

pub use aggregate::aggregate;
pub use cancel::CancelToken;
pub use context::{
    PipelineChannels, PipelineContext, PipelineHandles, PipelineTuning, UnitGuard, UnitTracker,
    WalkOutcome, create_pipeline_channels,
};
pub use orchestrator::{collect_digests, run_pipeline, shutdown_pipeline_handles};
pub use walk::{WalkItem, run_walk_loop, spawn_walk_thread, to_item_jwalk, to_item_walkdir};
pub use workers::{FixedPool, PerFileWorkers, WorkerContext, WorkerTopology, topology_for};
