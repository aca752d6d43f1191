//! Scripted verification flows for the Sudoku web app.
//!
//! A [`FlowPlan`] lists the steps; [`VerificationFlow`] runs them against any
//! [`gridproof_drivers::BrowserDriver`], tracks progress through
//! [`FlowState`], and writes the final screenshot with [`write_artifact`].
pub mod artifact;
pub mod document;
pub mod flow;
pub mod report;
pub mod state;
pub mod step;

pub use artifact::{ArtifactRecord, write_artifact};
pub use document::DocumentRef;
pub use flow::{FlowFailure, FlowSettings, VerificationFlow};
pub use report::{RunReport, StepRecord, StepStatus};
pub use state::FlowState;
pub use step::{Action, FlowPlan, Milestone, Step};
