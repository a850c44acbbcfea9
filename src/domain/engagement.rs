use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A message addressed to the current user, e.g. a new comment on a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

/// Kind of document an analytics event refers to. Serialized the way the
/// `/api/analytics/:refType/:refId` path expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RefType {
    Project,
    CaseStudy,
    Profile,
}

impl RefType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::CaseStudy => "caseStudy",
            Self::Profile => "profile",
        }
    }
}

impl std::fmt::Display for RefType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of the public `view` and `click` recording endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEvent {
    pub ref_type: RefType,
    pub ref_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl ContentEvent {
    #[must_use]
    pub fn new(ref_type: RefType, ref_id: impl Into<String>) -> Self {
        Self { ref_type, ref_id: ref_id.into(), target: None }
    }

    /// What was clicked, for `click` events.
    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Body of the public `engagement` endpoint: how long a visitor stayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementEvent {
    pub ref_type: RefType,
    pub ref_id: String,
    pub duration_secs: u64,
}
