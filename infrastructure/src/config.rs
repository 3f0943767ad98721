use dotenvy::dotenv;
use std::env;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/";
pub const DEFAULT_API_PATH: &str = "chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: String,
    pub api_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
        }
    }
}

impl Config {
    /// `.env` first, then the process environment. Unset or blank values fall
    /// back to the local defaults.
    pub fn load() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            api_base_url: non_blank("NEWSLENS_API_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            api_path: non_blank("NEWSLENS_API_PATH").unwrap_or_else(|| DEFAULT_API_PATH.to_string()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into();
        self
    }

    /// Base URL and path joined with exactly one slash.
    pub fn endpoint(&self) -> String {
        let base = self.api_base_url.trim().trim_end_matches('/');
        let path = self.api_path.trim().trim_start_matches('/');
        if path.is_empty() {
            format!("{base}/")
        } else {
            format!("{base}/{path}")
        }
    }
}
