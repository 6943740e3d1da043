use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Annotation key under which the instruction that produced a package is stored.
pub const ORIGINAL_PROMPT_ANNOTATION: &str = "cf-prompt-cli-plugin/original-prompt";

/// Lifecycle state of an application.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppState {
    Started,
    Stopped,
}

/// Package (artifact) state as reported by the platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageState {
    AwaitingUpload,
    ProcessingUpload,
    Copying,
    Ready,
    Failed,
    Expired,
}

impl PackageState {
    /// Position of the state along the package lifecycle.
    ///
    /// `Ready` may still expire later, so it ranks below `Expired`.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::AwaitingUpload => 0,
            Self::ProcessingUpload | Self::Copying => 1,
            Self::Ready | Self::Failed => 2,
            Self::Expired => 3,
        }
    }

    /// `true` once the upload has settled into `Ready`, `Failed` or `Expired`.
    #[must_use]
    pub fn is_settled(self) -> bool {
        self.rank() >= 2
    }

    /// Whether an observed move from `self` to `next` is legal.
    ///
    /// Settled packages never return to an upload state. `Failed` and
    /// `Expired` are final; `Ready` may only expire.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Failed | Self::Expired => next == self,
            Self::Ready => matches!(next, Self::Ready | Self::Expired),
            _ => next.rank() >= self.rank(),
        }
    }

    /// Lowercase display form, as shown by `cf` itself.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingUpload => "awaiting_upload",
            Self::ProcessingUpload => "processing_upload",
            Self::Copying => "copying",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Expired => "expired",
        }
    }

    /// Query-string form used by list filters.
    #[must_use]
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::AwaitingUpload => "AWAITING_UPLOAD",
            Self::ProcessingUpload => "PROCESSING_UPLOAD",
            Self::Copying => "COPYING",
            Self::Ready => "READY",
            Self::Failed => "FAILED",
            Self::Expired => "EXPIRED",
        }
    }
}

/// Package type as declared by the platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Bits,
    Docker,
}

impl PackageType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bits => "bits",
            Self::Docker => "docker",
        }
    }
}

/// Build (staging job) state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildState {
    Staging,
    Staged,
    Failed,
}

impl BuildState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Staged => "staged",
            Self::Failed => "failed",
        }
    }
}

/// Droplet state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DropletState {
    AwaitingUpload,
    ProcessingUpload,
    Copying,
    Staged,
    Failed,
    Expired,
}

/// Hyperlink object used throughout the v3 API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// `{"guid": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuidRef {
    pub guid: String,
}

impl GuidRef {
    #[must_use]
    pub fn new(guid: impl Into<String>) -> Self {
        Self { guid: guid.into() }
    }
}

/// `{"data": {"guid": "..."}}` (or `{"data": null}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relationship {
    pub data: Option<GuidRef>,
}

impl Relationship {
    #[must_use]
    pub fn to(guid: impl Into<String>) -> Self {
        Self {
            data: Some(GuidRef::new(guid)),
        }
    }

    /// The related guid, if any.
    #[must_use]
    pub fn guid(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.guid.as_str())
    }
}

/// Labels and annotations attached to a resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Metadata {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.annotations.is_empty()
    }

    /// Metadata carrying the original prompt annotation.
    #[must_use]
    pub fn with_prompt(prompt: &str) -> Self {
        let mut annotations = BTreeMap::new();
        annotations.insert(ORIGINAL_PROMPT_ANNOTATION.to_string(), prompt.to_string());
        Self {
            labels: BTreeMap::new(),
            annotations,
        }
    }

    /// The stored original prompt, verbatim.
    #[must_use]
    pub fn original_prompt(&self) -> Option<&str> {
        self.annotations
            .get(ORIGINAL_PROMPT_ANNOTATION)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppRelationships {
    #[serde(default)]
    pub space: Relationship,
}

/// `GET /v3/apps/:guid`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppResource {
    pub guid: String,
    pub name: String,
    pub state: AppState,
    #[serde(default)]
    pub relationships: AppRelationships,
}

/// `GET /v3/packages/:guid`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageResource {
    pub guid: String,
    #[serde(rename = "type")]
    pub kind: PackageType,
    /// Type-specific payload; decoded once into a payload variant by callers.
    #[serde(default)]
    pub data: serde_json::Value,
    pub state: PackageState,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub links: BTreeMap<String, Link>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl PackageResource {
    /// Container image reference embedded in the payload, if any.
    #[must_use]
    pub fn image_reference(&self) -> Option<&str> {
        self.data
            .get("image")
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn link(&self, name: &str) -> Option<&str> {
        self.links.get(name).map(|l| l.href.as_str())
    }
}

/// `GET /v3/builds/:guid`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResource {
    pub guid: String,
    pub state: BuildState,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub package: Option<GuidRef>,
    #[serde(default)]
    pub droplet: Option<GuidRef>,
}

/// `GET /v3/droplets/:guid`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropletResource {
    pub guid: String,
    pub state: DropletState,
    #[serde(default)]
    pub links: BTreeMap<String, Link>,
}

impl DropletResource {
    /// Guid of the package this droplet was staged from (last path segment of
    /// the `package` link).
    #[must_use]
    pub fn package_guid(&self) -> Option<&str> {
        self.links
            .get("package")
            .and_then(|l| l.href.trim_end_matches('/').rsplit('/').next())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub next: Option<Link>,
}

/// Paginated list envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub pagination: Pagination,
    pub resources: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRelationships {
    pub app: Relationship,
}

/// `POST /v3/packages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePackageRequest {
    #[serde(rename = "type")]
    pub kind: PackageType,
    pub relationships: PackageRelationships,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl CreatePackageRequest {
    /// A bits package for `app_guid`, annotated with `prompt` when given.
    #[must_use]
    pub fn bits(app_guid: &str, prompt: Option<&str>) -> Self {
        Self {
            kind: PackageType::Bits,
            relationships: PackageRelationships {
                app: Relationship::to(app_guid),
            },
            metadata: prompt.map(Metadata::with_prompt).unwrap_or_default(),
        }
    }
}

/// `POST /v3/builds`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBuildRequest {
    pub package: GuidRef,
}

/// `PATCH /v3/apps/:guid/environment_variables`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentVariables {
    pub var: BTreeMap<String, String>,
}
