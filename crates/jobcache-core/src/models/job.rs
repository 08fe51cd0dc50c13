use serde::{Deserialize, Serialize};

use super::de;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Job {
    #[serde(default, deserialize_with = "de::opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default, rename = "type", alias = "job_type")]
    pub job_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Match score in percent, when the backend ranked the job.
    #[serde(default, rename = "match", deserialize_with = "de::opt_number")]
    pub match_score: Option<f64>,
    #[serde(default)]
    pub posted: Option<String>,
}

impl Job {
    pub fn title_display(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled role")
    }

    pub fn match_display(&self) -> Option<String> {
        self.match_score.map(|m| format!("{:.0}%", m))
    }
}

/// Body of `POST /jobs/search`. Unset fields are left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// A submitted application as listed by `GET /applications`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Application {
    #[serde(default, deserialize_with = "de::opt_id")]
    pub id: Option<String>,
    /// Job title.
    #[serde(default, alias = "job_title")]
    pub job: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Date applied.
    #[serde(default, alias = "applied_at")]
    pub applied: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
