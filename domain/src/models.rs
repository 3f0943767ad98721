use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }
}

/// Normalised `fake_news` classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReliabilityVerdict {
    Real,
    Fake,
    Unknown,
}

/// Binary display category derived from a verdict. Anything but `Real` is
/// shown as unreliable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReliabilityIndicator {
    Reliable,
    Unreliable,
}

impl ReliabilityVerdict {
    /// Collapse the loosely-typed `fake_news` field into a verdict.
    ///
    /// A string is used as-is. An object yields its `result` entry when
    /// present, otherwise its first value. Anything that does not end in a
    /// recognised string is `Unknown`.
    pub fn from_value(raw: &Value) -> Self {
        let candidate = match raw {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map
                .get("result")
                .or_else(|| map.values().next())
                .and_then(Value::as_str),
            _ => None,
        };
        candidate.map_or(ReliabilityVerdict::Unknown, Self::from_label)
    }

    fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "real" => ReliabilityVerdict::Real,
            "fake" => ReliabilityVerdict::Fake,
            _ => ReliabilityVerdict::Unknown,
        }
    }

    pub fn indicator(&self) -> ReliabilityIndicator {
        match self {
            ReliabilityVerdict::Real => ReliabilityIndicator::Reliable,
            ReliabilityVerdict::Fake | ReliabilityVerdict::Unknown => {
                ReliabilityIndicator::Unreliable
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReliabilityVerdict::Real => "Real",
            ReliabilityVerdict::Fake => "Fake",
            ReliabilityVerdict::Unknown => "Unknown",
        }
    }
}

/// Latest structured analysis of the article under discussion.
///
/// Built from the raw `analytics` object in one go; the raw object is kept so
/// the next request can echo it back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSnapshot {
    pub title: String,
    pub author: String,
    pub language: String,
    pub keywords: Vec<String>,
    pub tone: String,
    pub style: String,
    pub summary: String,
    pub sentiment: Option<Sentiment>,
    pub readability_score: Option<f64>,
    pub fake_news: ReliabilityVerdict,
    pub url: Option<String>,
    raw: Map<String, Value>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SnapshotFields {
    #[serde(deserialize_with = "text_or_empty")]
    title: String,
    #[serde(deserialize_with = "text_or_empty")]
    author: String,
    #[serde(deserialize_with = "text_or_empty")]
    language: String,
    #[serde(deserialize_with = "keyword_list")]
    keywords: Vec<String>,
    #[serde(deserialize_with = "text_or_empty")]
    tone: String,
    #[serde(deserialize_with = "text_or_empty")]
    style: String,
    #[serde(deserialize_with = "text_or_empty")]
    summary: String,
    sentiment: Option<String>,
    #[serde(deserialize_with = "lenient_score")]
    readability_score: Option<f64>,
    fake_news: Value,
    url: Option<String>,
}

fn text_or_empty<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

fn keyword_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Keywords {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Option::<Keywords>::deserialize(de)? {
        Some(Keywords::List(list)) => list,
        Some(Keywords::Joined(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    })
}

fn lenient_score<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(score) if score.is_finite() => Ok(Some(score)),
            Ok(_) => Err(serde::de::Error::custom(format!(
                "readability_score must be finite, got {s:?}"
            ))),
            Err(e) => Err(serde::de::Error::custom(e)),
        },
        Some(other) => Err(serde::de::Error::custom(format!(
            "readability_score must be numeric, got {other}"
        ))),
    }
}

impl AnalyticsSnapshot {
    pub fn from_raw(raw: Map<String, Value>) -> Result<Self, SyncError> {
        let fields: SnapshotFields = serde_json::from_value(Value::Object(raw.clone()))
            .map_err(|e| SyncError::InvalidAnalytics(e.to_string()))?;

        Ok(Self {
            title: fields.title,
            author: fields.author,
            language: fields.language,
            keywords: fields.keywords,
            tone: fields.tone,
            style: fields.style,
            summary: fields.summary,
            sentiment: fields.sentiment.as_deref().and_then(Sentiment::parse),
            readability_score: fields.readability_score,
            fake_news: ReliabilityVerdict::from_value(&fields.fake_news),
            url: fields.url,
            raw,
        })
    }

    /// The object exactly as the service sent it.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// `readability_score * 10` clamped to `[0, 100]` for a progress bar.
    /// The stored score itself is left untouched.
    pub fn readability_display_percent(&self) -> Option<f64> {
        self.readability_score
            .map(|score| (score * 10.0).clamp(0.0, 100.0))
    }
}
