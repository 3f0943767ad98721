pub mod analysis_client;
pub mod config;

pub use analysis_client::AnalysisClient;
pub use config::Config;
