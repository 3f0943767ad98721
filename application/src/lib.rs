pub mod analysis_service;
pub mod session_view;

pub use analysis_service::{
    AnalysisService, IgnoreReason, ReconcileReport, TranscriptUpdate, TurnOutcome,
};
pub use session_view::{SessionView, TurnPhase};
