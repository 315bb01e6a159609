//! Configurable ML pipelines
//!
//! Provides pipeline construction from a joint hyperparameter search space:
//! - Steps holding a fixed component or a choice among components
//! - Search-space composition with compatibility pruning
//! - Routing of one configuration to every step
//! - Fitting, iterative fitting and batched prediction
//! - Declarative pipeline specs and predefined templates

mod composer;
mod config;
mod pipeline;
mod router;
mod spec;
mod step;
mod template;

pub use composer::{ComposedSpace, SearchSpaceComposer};
pub use config::{OutputKind, PipelineConfig};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineState};
pub use router::HyperparameterRouter;
pub use spec::{PipelineSpec, StepSpec};
pub use step::{ComponentNode, PipelineNode, PipelineStep};
pub use template::{ClassificationTemplate, PipelineTemplate};
