pub mod analytics;
pub mod error;
pub mod exchange;
pub mod models;
pub mod session;

pub use analytics::AnalyticsStore;
pub use error::SyncError;
pub use exchange::{AnalysisRequest, AnalysisResponse, AnalysisTransport, BOOTSTRAP_MESSAGE};
pub use models::{AnalyticsSnapshot, ReliabilityIndicator, ReliabilityVerdict, Sentiment};
pub use session::{BootstrapSeed, ConversationStore, Message, Role};
