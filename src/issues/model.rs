use std::collections::BTreeMap;
use std::path::PathBuf;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

/// Severity bucket for an issue, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    None,
}

impl Severity {
    /// All buckets in report order.
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::None,
    ];

    /// Band a CVSS-style score. Zero (or below) is `none`, 9.0 and up is `critical`.
    pub fn from_score(score: f64) -> Self {
        if score <= 0.0 {
            Severity::None
        } else if score < 4.0 {
            Severity::Low
        } else if score < 7.0 {
            Severity::Medium
        } else if score < 9.0 {
            Severity::High
        } else {
            Severity::Critical
        }
    }

    /// Returns a numeric rank where lower values indicate higher severity.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
            Severity::None => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::None => "none",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One piece of evidence attached to an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Where the issue was observed (URL, host, file). Filled from the
    /// default location by the loader when the record has none.
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    /// Free-form fields of the evidence record.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A finding in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub title: String,
    #[serde(deserialize_with = "score_from_any")]
    pub cvss_score: f64,
    /// Identifying number; persisted numbers are never reassigned.
    #[serde(default, deserialize_with = "number_from_any", skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    #[serde(default)]
    pub evidences: Vec<Evidence>,
    /// Free-form fields of the issue record (description, solution, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
    /// File the issue was loaded from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Issue {
    pub fn new(title: impl Into<String>, cvss_score: f64) -> Self {
        Self {
            title: title.into(),
            cvss_score,
            number: None,
            evidences: Vec::new(),
            extra: BTreeMap::new(),
            source: None,
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::from_score(self.cvss_score)
    }

    /// Read a free-form field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// Context value for templates: the record plus its derived `severity`.
    pub fn to_context(&self) -> Result<Value, serde_yaml::Error> {
        let mut value = serde_yaml::to_value(self)?;
        if let Value::Mapping(map) = &mut value {
            map.insert("severity".into(), self.severity().as_str().into());
        }
        Ok(value)
    }
}

fn score_from_any<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("cvss_score is not a finite number")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("cvss_score '{}' is not a number", s))),
        other => Err(serde::de::Error::custom(format!("cvss_score must be a number, got {:?}", other))),
    }
}

fn number_from_any<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("number {} is not a positive integer", n))),
        Value::String(s) => s
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("number '{}' is not a positive integer", s))),
        other => Err(serde::de::Error::custom(format!("number must be an integer, got {:?}", other))),
    }
}
