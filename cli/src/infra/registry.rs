//! OCI distribution (v2) client: implements the `ImageFetcher` port.
//!
//! Pulls the manifest (resolving an index to `linux/amd64`, else its first
//! entry), then downloads each layer to scratch space, verifies its sha256
//! digest, and extracts its regular files in declared order.

use std::path::Path;

use anyhow::{Context, Result, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures_util::StreamExt as _;
use reqwest::header::{ACCEPT, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt as _;

use crate::application::ports::ImageFetcher;
use crate::domain::{ImageReference, PromptError};
use crate::infra::archive::{LayerCompression, unpack_layer};

const MANIFEST_ACCEPT: &str = "application/vnd.oci.image.index.v1+json, \
     application/vnd.docker.distribution.manifest.list.v2+json, \
     application/vnd.oci.image.manifest.v1+json, \
     application/vnd.docker.distribution.manifest.v2+json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestDoc {
    #[serde(default)]
    manifests: Vec<IndexEntry>,
    #[serde(default)]
    layers: Vec<Descriptor>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    digest: String,
    #[serde(default)]
    platform: Option<Platform>,
}

#[derive(Debug, Deserialize)]
struct Platform {
    architecture: String,
    os: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Descriptor {
    media_type: String,
    digest: String,
}

/// Parsed `WWW-Authenticate` challenge.
#[derive(Debug, PartialEq, Eq)]
enum Challenge {
    Basic,
    Bearer {
        realm: String,
        service: Option<String>,
        scope: Option<String>,
    },
}

fn parse_challenge(header: &str) -> Option<Challenge> {
    let (scheme, rest) = header.trim().split_once(' ').unwrap_or((header.trim(), ""));
    if scheme.eq_ignore_ascii_case("basic") {
        return Some(Challenge::Basic);
    }
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let mut params = Vec::new();
    let mut key = String::new();
    let mut value = String::new();
    let (mut in_value, mut quoted) = (false, false);
    for c in rest.chars() {
        match c {
            '"' if in_value => quoted = !quoted,
            ',' if !quoted => {
                params.push((key.trim().to_ascii_lowercase(), std::mem::take(&mut value)));
                key.clear();
                in_value = false;
            }
            '=' if !in_value => in_value = true,
            _ if in_value => value.push(c),
            _ => key.push(c),
        }
    }
    if !key.trim().is_empty() {
        params.push((key.trim().to_ascii_lowercase(), value));
    }

    let get = |name: &str| {
        params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    };
    Some(Challenge::Bearer {
        realm: get("realm")?,
        service: get("service"),
        scope: get("scope"),
    })
}

/// Pick the `linux/amd64` manifest of an index, else the first one.
fn select_platform(entries: &[IndexEntry]) -> Option<&IndexEntry> {
    entries
        .iter()
        .find(|e| {
            e.platform
                .as_ref()
                .is_some_and(|p| p.os == "linux" && p.architecture == "amd64")
        })
        .or_else(|| entries.first())
}

/// Production `ImageFetcher` over reqwest.
pub struct RegistryClient {
    http: reqwest::Client,
    credentials: Option<(String, String)>,
}

impl RegistryClient {
    /// Create a client; anonymous unless both credential halves are given.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(credentials: Option<(&str, &str)>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("cf-prompt/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building registry HTTP client")?;
        Ok(Self {
            http,
            credentials: credentials.map(|(u, p)| (u.to_string(), p.to_string())),
        })
    }

    fn basic_auth(&self) -> Option<String> {
        self.credentials
            .as_ref()
            .map(|(u, p)| format!("Basic {}", STANDARD.encode(format!("{u}:{p}"))))
    }

    /// GET `url`, answering one authentication challenge if needed.
    ///
    /// `auth` caches the header that worked for later requests.
    async fn get(&self, url: &str, accept: Option<&str>, auth: &mut Option<String>) -> Result<Response> {
        let send = |auth: Option<&str>| {
            let mut req = self.http.get(url);
            if let Some(a) = accept {
                req = req.header(ACCEPT, a);
            }
            if let Some(a) = auth {
                req = req.header(AUTHORIZATION, a);
            }
            req.send()
        };

        let mut resp = send(auth.as_deref())
            .await
            .map_err(|e| PromptError::transport(format!("registry request to {url} failed: {e}")))?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            let challenge = resp
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_challenge);
            *auth = Some(self.authorize(challenge).await?);
            resp = send(auth.as_deref())
                .await
                .map_err(|e| PromptError::transport(format!("registry request to {url} failed: {e}")))?;
        }

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PromptError::Auth {
                service: "registry".to_string(),
                message: format!("GET {url} returned status {}", status.as_u16()),
            },
            _ => PromptError::status(format!("registry GET {url} failed"), status.as_u16(), body),
        }
        .into())
    }

    /// Produce an `Authorization` header value for a challenge.
    async fn authorize(&self, challenge: Option<Challenge>) -> Result<String> {
        match challenge {
            Some(Challenge::Basic) => self.basic_auth().ok_or_else(|| {
                PromptError::Auth {
                    service: "registry".to_string(),
                    message: "registry requires credentials".to_string(),
                }
                .into()
            }),
            Some(Challenge::Bearer {
                realm,
                service,
                scope,
            }) => {
                let mut query = Vec::new();
                if let Some(s) = service {
                    query.push(("service", s));
                }
                if let Some(s) = scope {
                    query.push(("scope", s));
                }
                let mut req = self.http.get(&realm).query(&query);
                if let Some(basic) = self.basic_auth() {
                    req = req.header(AUTHORIZATION, basic);
                }
                let resp = req
                    .send()
                    .await
                    .map_err(|e| PromptError::transport(format!("token request to {realm} failed: {e}")))?;
                if !resp.status().is_success() {
                    return Err(PromptError::Auth {
                        service: "registry".to_string(),
                        message: format!("token endpoint returned status {}", resp.status().as_u16()),
                    }
                    .into());
                }
                let token: TokenResponse = resp
                    .json()
                    .await
                    .map_err(|e| PromptError::transport(format!("unreadable token response: {e}")))?;
                let token = token
                    .token
                    .or(token.access_token)
                    .context("token response carried no token")?;
                Ok(format!("Bearer {token}"))
            }
            None => Err(PromptError::Auth {
                service: "registry".to_string(),
                message: "unsupported authentication challenge".to_string(),
            }
            .into()),
        }
    }

    async fn manifest(
        &self,
        image: &ImageReference,
        reference: &str,
        auth: &mut Option<String>,
    ) -> Result<ManifestDoc> {
        let resp = self
            .get(&image.manifest_url(reference), Some(MANIFEST_ACCEPT), auth)
            .await?;
        resp.json()
            .await
            .map_err(|e| PromptError::transport(format!("unreadable manifest for {image}: {e}")).into())
    }

    /// Stream a blob to `dest`, verifying its digest.
    async fn download_blob(
        &self,
        image: &ImageReference,
        digest: &str,
        dest: &Path,
        auth: &mut Option<String>,
    ) -> Result<()> {
        let Some(expected) = digest.strip_prefix("sha256:") else {
            bail!("unsupported digest algorithm in {digest}");
        };
        let resp = self.get(&image.blob_url(digest), None, auth).await?;
        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("creating {}", dest.display()))?;
        let mut hasher = Sha256::new();
        let mut body = resp.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk
                .map_err(|e| PromptError::transport(format!("downloading layer {digest}: {e}")))?;
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        let actual = format!("{:x}", hasher.finalize());
        if actual != expected {
            bail!("layer digest mismatch: expected sha256:{expected}, got sha256:{actual}");
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

impl ImageFetcher for RegistryClient {
    async fn fetch_image(&self, image: &ImageReference, dest: &Path) -> Result<()> {
        let mut auth = None;
        let mut manifest = self
            .manifest(image, image.reference.as_str(), &mut auth)
            .await?;
        if !manifest.manifests.is_empty() {
            let entry = select_platform(&manifest.manifests).context("empty image index")?;
            let digest = entry.digest.clone();
            manifest = self.manifest(image, &digest, &mut auth).await?;
        }
        if manifest.layers.is_empty() {
            bail!("image {image} has no layers");
        }

        tokio::fs::create_dir_all(dest)
            .await
            .with_context(|| format!("creating {}", dest.display()))?;
        let scratch = tempfile::tempdir().context("creating layer scratch dir")?;
        for (i, layer) in manifest.layers.iter().enumerate() {
            let compression = LayerCompression::from_media_type(&layer.media_type)?;
            let blob = scratch.path().join(format!("layer-{i}"));
            self.download_blob(image, &layer.digest, &blob, &mut auth)
                .await?;
            let out = dest.to_path_buf();
            tokio::task::spawn_blocking(move || unpack_layer(&blob, compression, &out))
                .await
                .context("spawn_blocking for unpack_layer")?
                .with_context(|| format!("extracting layer {}", layer.digest))?;
        }
        Ok(())
    }
}
