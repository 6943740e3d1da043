//! Package model as seen by the pipelines.

use cf_prompt_common::{PackageResource, PackageState, PackageType, short_id};
use chrono::{DateTime, Utc};

/// Maximum prompt width shown in package listings.
pub const PROMPT_DISPLAY_WIDTH: usize = 50;

/// Listing placeholder for packages without a stored prompt.
pub const NO_PROMPT: &str = "(no prompt stored)";

/// Where a package's source payload lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackagePayload {
    /// Zip archive downloadable from the platform.
    Archive,
    /// Layered container image held in a registry.
    Image { reference: String },
}

/// A package resource with its payload shape resolved.
#[derive(Debug, Clone)]
pub struct Package {
    pub guid: String,
    pub kind: PackageType,
    pub state: PackageState,
    pub payload: PackagePayload,
    pub created_at: DateTime<Utc>,
    pub original_prompt: Option<String>,
    pub upload_url: Option<String>,
}

impl From<PackageResource> for Package {
    fn from(res: PackageResource) -> Self {
        let payload = match res.image_reference() {
            Some(image) => PackagePayload::Image {
                reference: image.to_string(),
            },
            None => PackagePayload::Archive,
        };
        let original_prompt = res.metadata.original_prompt().map(String::from);
        let upload_url = res.link("upload").map(String::from);
        Self {
            guid: res.guid,
            kind: res.kind,
            state: res.state,
            payload,
            created_at: res.created_at,
            original_prompt,
            upload_url,
        }
    }
}

impl Package {
    #[must_use]
    pub fn short_id(&self) -> String {
        short_id(&self.guid)
    }

    /// Prompt text for a one-line listing, or [`NO_PROMPT`].
    #[must_use]
    pub fn prompt_preview(&self) -> String {
        match self.original_prompt.as_deref() {
            Some(p) if !p.trim().is_empty() => {
                let flat = p.split_whitespace().collect::<Vec<_>>().join(" ");
                truncate_for_display(&flat, PROMPT_DISPLAY_WIDTH)
            }
            _ => NO_PROMPT.to_string(),
        }
    }
}

/// Truncate `text` to at most `max` characters, ending in `...` when cut.
#[must_use]
pub fn truncate_for_display(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
