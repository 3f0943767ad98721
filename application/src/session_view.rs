use domain::{AnalyticsSnapshot, Message, ReliabilityIndicator, ReliabilityVerdict};

/// Where the orchestrator is in the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    Sending,
    Reconciling,
    Failed,
}

/// Snapshot of session state handed to the rendering layer. Owned copies, so
/// holding one never blocks the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub transcript: Vec<Message>,
    pub analytics: Option<AnalyticsSnapshot>,
    pub reliability: ReliabilityVerdict,
    pub readability_percent: Option<f64>,
    pub current_url: Option<String>,
    pub phase: TurnPhase,
    pub busy: bool,
    pub error: Option<String>,
}

impl SessionView {
    pub fn reliability_indicator(&self) -> ReliabilityIndicator {
        self.reliability.indicator()
    }

    /// Messages after the last user turn, i.e. what the latest reply added.
    pub fn latest_replies(&self) -> &[Message] {
        let start = self
            .transcript
            .iter()
            .rposition(|m| m.role == domain::Role::User)
            .map_or(0, |i| i + 1);
        &self.transcript[start..]
    }
}
