//! Wire contract with the analysis service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SyncError;
use crate::session::{BootstrapSeed, Message};

/// Sent as `message` on the first call; asks the service for a greeting
/// instead of a reply to user content.
pub const BOOTSTRAP_MESSAGE: &str = "__init__";

/// Context for one turn. Built fresh per request and not retained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub history: Vec<Message>,
    pub analytics: Value,
    pub message: String,
}

impl AnalysisRequest {
    pub fn bootstrap() -> Self {
        Self {
            history: Vec::new(),
            analytics: Value::Object(Default::default()),
            message: BOOTSTRAP_MESSAGE.to_string(),
        }
    }

    pub fn is_bootstrap(&self) -> bool {
        self.message == BOOTSTRAP_MESSAGE
    }
}

/// Every field is optional and reconciled independently.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisResponse {
    pub response: Option<String>,
    /// Left as raw JSON so an unusable history degrades the merge instead of
    /// failing the whole turn.
    pub chat_history: Option<Value>,
    pub analytics: Option<Value>,
    pub url: Option<String>,
}

impl AnalysisResponse {
    /// Parse a response body. Anything that is not a JSON object carrying
    /// `response` or `chat_history` is malformed.
    pub fn from_body(body: &str) -> Result<Self, SyncError> {
        let parsed: Self = serde_json::from_str(body)
            .map_err(|e| SyncError::MalformedResponse(e.to_string()))?;
        if parsed.response.is_none() && parsed.chat_history.is_none() {
            return Err(SyncError::MalformedResponse(
                "body has neither `response` nor `chat_history`".to_string(),
            ));
        }
        Ok(parsed)
    }

    pub fn reply(content: impl Into<String>) -> Self {
        Self {
            response: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_history(history: &[Message]) -> Self {
        Self {
            chat_history: serde_json::to_value(history).ok(),
            ..Self::default()
        }
    }

    pub fn with_analytics(mut self, analytics: Value) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Typed view of `chat_history`, when present.
    pub fn history(&self) -> Option<Result<Vec<Message>, SyncError>> {
        self.chat_history.as_ref().map(|raw| {
            serde_json::from_value::<Vec<Message>>(raw.clone())
                .map_err(|e| SyncError::DegenerateMerge(format!("unreadable chat_history: {e}")))
        })
    }

    /// Seed for the bootstrap transcript: the history when it yields any
    /// assistant message, else the bare reply.
    pub fn bootstrap_seed(&self) -> Option<BootstrapSeed> {
        let history = match self.history() {
            Some(Ok(history)) if history.iter().any(|m| m.role == crate::Role::Assistant) => {
                Some(history)
            }
            _ => None,
        };
        match (history, &self.response) {
            (Some(history), _) => Some(BootstrapSeed::History(history)),
            (None, Some(reply)) => Some(BootstrapSeed::Reply(reply.clone())),
            (None, None) => None,
        }
    }
}

/// Seam between the orchestrator and whatever carries requests to the
/// service.
pub trait AnalysisTransport {
    fn send(
        &self,
        request: AnalysisRequest,
    ) -> impl std::future::Future<Output = Result<AnalysisResponse, SyncError>> + Send;
}
