//! Workflow engine for contentflow
//!
//! Drives one user through keyword research, clustering, title generation,
//! outlining and article generation. Stage outputs are normalized from
//! whatever envelope the remote stage used, validated, and stored in a
//! [`WorkflowContext`] that owns the step pointer.
//!
//! - [`model`]: stage output types and the outline parser
//! - [`payload`]: request payloads built from upstream outputs
//! - [`normalize`]: response envelope decoding and defensive field parsing
//! - [`context`]: step navigation and per-stage stores
//! - [`progress`]: simulated progress while a call is in flight
//! - [`profile`]: auth session and research profile collaborators
//! - [`runner`]: the stage operations tying it all together
//! - [`snapshot`]: saving a run between CLI invocations

pub mod context;
pub mod model;
pub mod normalize;
pub mod payload;
pub mod profile;
pub mod progress;
pub mod runner;
pub mod snapshot;

pub use context::{StageOutput, StageStores, StaleResults, WorkflowContext, WorkflowSession};
pub use normalize::Normalized;
pub use payload::{PayloadIds, ResearchInput, ResearchRequest};
pub use profile::{AuthSession, ProfileStore, ResearchDefaults, ResearchProfile};
pub use progress::{ProgressEstimator, ProgressHandle};
pub use runner::{StageReport, StageRunner, WorkflowHandle, lock_workflow, workflow_handle};
