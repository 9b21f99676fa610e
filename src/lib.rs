//! Sales-pipeline dashboard core.
//!
//! Renders nothing itself: this crate owns the pipeline state engine: the
//! stage taxonomy and label normalization, derived urgency/inactivity
//! signals, kanban partitioning with per-stage rollups, lifecycle
//! transitions against the remote opportunity store, and the refresh
//! coordination that keeps the in-memory working set in sync after writes.
//! A desktop or web shell supplies the rendering, the edit dialogs, and a
//! toast sink.

pub mod board;
pub mod config;
pub mod countdown;
pub mod error;
pub mod notify;
pub mod opportunity;
pub mod refresh;
pub mod stage;
pub mod store;
pub mod transition;

pub use board::{group_by_stage, BoardSnapshot, StageGroup};
pub use error::{EngineError, EngineResult, StoreError};
pub use notify::{Notifier, Severity};
pub use opportunity::{fetch_open_opportunities, Actor, Opportunity, Role};
pub use refresh::{FetchState, RefreshCoordinator};
pub use stage::{normalize, NormalizedStage, Stage};
pub use store::DataStore;
pub use transition::{mark_won, TransitionOutcome};
