//! Container image reference parsing.
//!
//! Follows the docker normalisation rules: a missing registry means Docker
//! Hub, single-component Hub repositories live under `library/`, and a
//! missing tag means `latest`.

use anyhow::{Result, bail};

/// Registry host used for references without an explicit registry.
pub const DOCKER_HUB_REGISTRY: &str = "registry-1.docker.io";

/// Tag or digest part of a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefSpec {
    Tag(String),
    Digest(String),
}

impl RefSpec {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tag(s) | Self::Digest(s) => s,
        }
    }
}

/// Parsed `registry/repository[:tag][@digest]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    pub reference: RefSpec,
}

impl ImageReference {
    /// Parse an image reference string.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference is empty, contains whitespace, or
    /// has an empty repository, tag, or digest component.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() || input.chars().any(char::is_whitespace) {
            bail!("invalid image reference '{input}'");
        }

        let (name, digest) = match input.split_once('@') {
            Some((name, digest)) => {
                if !digest.contains(':') || digest.ends_with(':') {
                    bail!("invalid digest in image reference '{input}'");
                }
                (name, Some(digest.to_string()))
            }
            None => (input, None),
        };

        let last_slash = name.rfind('/').map_or(0, |i| i + 1);
        let (name, tag) = match name[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                (&name[..split], Some(name[split + 1..].to_string()))
            }
            None => (name, None),
        };
        if tag.as_deref() == Some("") {
            bail!("empty tag in image reference '{input}'");
        }

        let (registry, repository) = match name.split_once('/') {
            Some((head, rest))
                if head.contains('.') || head.contains(':') || head == "localhost" =>
            {
                (head.to_string(), rest.to_string())
            }
            _ if name.contains('/') => (DOCKER_HUB_REGISTRY.to_string(), name.to_string()),
            _ => (DOCKER_HUB_REGISTRY.to_string(), format!("library/{name}")),
        };
        let registry = match registry.as_str() {
            "docker.io" | "index.docker.io" => DOCKER_HUB_REGISTRY.to_string(),
            _ => registry,
        };
        if repository.is_empty() || repository.split('/').any(str::is_empty) {
            bail!("invalid repository in image reference '{input}'");
        }

        let reference = match (digest, tag) {
            (Some(d), _) => RefSpec::Digest(d),
            (None, Some(t)) => RefSpec::Tag(t),
            (None, None) => RefSpec::Tag("latest".to_string()),
        };

        Ok(Self {
            registry,
            repository,
            reference,
        })
    }

    /// Base URL of the registry's v2 API.
    ///
    /// Loopback registries are assumed to serve plain HTTP.
    #[must_use]
    pub fn api_base(&self) -> String {
        let host = self.registry.split(':').next().unwrap_or_default();
        let scheme = if host == "localhost" || host == "127.0.0.1" {
            "http"
        } else {
            "https"
        };
        format!("{scheme}://{}/v2", self.registry)
    }

    #[must_use]
    pub fn manifest_url(&self, reference: &str) -> String {
        format!("{}/{}/manifests/{reference}", self.api_base(), self.repository)
    }

    #[must_use]
    pub fn blob_url(&self, digest: &str) -> String {
        format!("{}/{}/blobs/{digest}", self.api_base(), self.repository)
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reference {
            RefSpec::Tag(t) => write!(f, "{}/{}:{t}", self.registry, self.repository),
            RefSpec::Digest(d) => write!(f, "{}/{}@{d}", self.registry, self.repository),
        }
    }
}
