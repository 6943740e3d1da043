//! Platform v3 API client: implements the `PlatformApi` port over reqwest.
//!
//! One port call is one request (plus pagination). Non-success statuses map
//! onto `PromptError`: 401/403 → `Auth`, 404 on a direct lookup →
//! `NotFound`, everything else → `Transport` carrying status and body.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use cf_prompt_common::{
    AppResource, BuildResource, CreateBuildRequest, CreatePackageRequest, DropletResource,
    EnvironmentVariables, GuidRef, ListResponse, PackageResource, PackageState, Relationship,
};
use futures_util::StreamExt as _;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

use crate::application::ports::PlatformApi;
use crate::domain::PromptError;
use crate::domain::target::{Target, rewrite_loopback_url};

const USER_AGENT: &str = concat!("cf-prompt/", env!("CARGO_PKG_VERSION"));
const PAGE_SIZE: &str = "100";
const UPLOAD_CHUNK: usize = 64 * 1024;

/// Production `PlatformApi` backed by reqwest.
pub struct CfApiClient {
    http: reqwest::Client,
    base: String,
    authorization: String,
}

impl CfApiClient {
    /// Build a client for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Configuration`] if the endpoint or token is
    /// empty, or an error if the HTTP client cannot be built.
    pub fn new(target: &Target) -> Result<Self> {
        if target.api_endpoint.trim().is_empty() {
            return Err(PromptError::configuration("no API endpoint set").into());
        }
        if target.access_token.trim().is_empty() {
            return Err(PromptError::configuration("no access token set").into());
        }
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(target.skip_ssl_validation)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            http,
            base: target.api_base().to_string(),
            authorization: target.authorization(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Send with credentials. Only transport failures are errors here.
    async fn send_raw(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        req.header(AUTHORIZATION, &self.authorization)
            .send()
            .await
            .map_err(|e| PromptError::transport(format!("{what}: {e}")).into())
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let resp = self.send_raw(req, what).await?;
        check(resp, what).await
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
        decode(self.send(req, what).await?, what).await
    }

    /// GET a single resource, mapping 404 to `NotFound`.
    async fn lookup<T: DeserializeOwned>(
        &self,
        path: &str,
        kind: &'static str,
        name: &str,
    ) -> Result<T> {
        let what = format!("fetching {kind} {name}");
        let resp = self.send_raw(self.http.get(self.url(path)), &what).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(PromptError::not_found(kind, name).into());
        }
        decode(check(resp, &what).await?, &what).await
    }
}

async fn check(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PromptError::Auth {
            service: "platform API".to_string(),
            message: format!("{what} returned status {}", status.as_u16()),
        },
        _ => PromptError::status(format!("{what} failed"), status.as_u16(), body),
    };
    Err(err.into())
}

async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
    resp.json::<T>()
        .await
        .map_err(|e| PromptError::transport(format!("{what}: unreadable response: {e}")).into())
}

impl PlatformApi for CfApiClient {
    async fn find_app(&self, name: &str, space_guid: &str) -> Result<AppResource> {
        let req = self
            .http
            .get(self.url("/v3/apps"))
            .query(&[("names", name), ("space_guids", space_guid)]);
        let list: ListResponse<AppResource> = self.json(req, "listing apps").await?;
        list.resources
            .into_iter()
            .next()
            .ok_or_else(|| PromptError::not_found("app", name).into())
    }

    async fn first_app(&self, space_guid: &str) -> Result<AppResource> {
        let req = self.http.get(self.url("/v3/apps")).query(&[
            ("space_guids", space_guid),
            ("order_by", "name"),
            ("per_page", "1"),
        ]);
        let list: ListResponse<AppResource> = self.json(req, "listing apps").await?;
        list.resources
            .into_iter()
            .next()
            .ok_or_else(|| PromptError::not_found("app in space", space_guid).into())
    }

    async fn get_app(&self, guid: &str) -> Result<AppResource> {
        self.lookup(&format!("/v3/apps/{guid}"), "app", guid).await
    }

    async fn list_packages(
        &self,
        app_guid: &str,
        states: &[PackageState],
    ) -> Result<Vec<PackageResource>> {
        let mut query = vec![
            ("app_guids", app_guid.to_string()),
            ("order_by", "-created_at".to_string()),
            ("per_page", PAGE_SIZE.to_string()),
        ];
        if !states.is_empty() {
            let joined = states
                .iter()
                .map(|s| s.as_filter())
                .collect::<Vec<_>>()
                .join(",");
            query.push(("states", joined));
        }

        let mut req = self.http.get(self.url("/v3/packages")).query(&query);
        let mut packages = Vec::new();
        loop {
            let page: ListResponse<PackageResource> = self.json(req, "listing packages").await?;
            packages.extend(page.resources);
            match page.pagination.next {
                Some(next) => {
                    req = self.http.get(rewrite_loopback_url(&next.href, &self.base));
                }
                None => break,
            }
        }
        packages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(packages)
    }

    async fn download_package(&self, guid: &str, dest: &Path) -> Result<()> {
        let what = format!("downloading package {guid}");
        let resp = self
            .send(
                self.http.get(self.url(&format!("/v3/packages/{guid}/download"))),
                &what,
            )
            .await?;
        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("creating {}", dest.display()))?;
        let mut body = resp.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| PromptError::transport(format!("{what}: {e}")))?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("writing {}", dest.display()))?;
        }
        file.flush().await?;
        Ok(())
    }

    async fn create_package(&self, request: &CreatePackageRequest) -> Result<PackageResource> {
        let req = self.http.post(self.url("/v3/packages")).json(request);
        self.json(req, "creating package").await
    }

    async fn upload_package(
        &self,
        package_guid: &str,
        upload_url: Option<&str>,
        zip: &Path,
    ) -> Result<PackageResource> {
        let url = match upload_url {
            Some(u) => rewrite_loopback_url(u, &self.base),
            None => self.url(&format!("/v3/packages/{package_guid}/upload")),
        };
        let file = tokio::fs::File::open(zip)
            .await
            .with_context(|| format!("opening {}", zip.display()))?;
        let len = file.metadata().await?.len();
        let chunks = futures_util::stream::try_unfold(file, |mut file| async move {
            let mut buf = vec![0u8; UPLOAD_CHUNK];
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Ok::<_, std::io::Error>(None);
            }
            buf.truncate(n);
            Ok(Some((buf, file)))
        });
        let body = reqwest::Body::wrap_stream(chunks);
        let part = reqwest::multipart::Part::stream_with_length(body, len)
            .file_name("package.zip")
            .mime_str("application/zip")?;
        let form = reqwest::multipart::Form::new().part("bits", part);
        let req = self.http.post(url).multipart(form);
        self.json(req, "uploading package").await
    }

    async fn package_droplets(&self, package_guid: &str) -> Result<Vec<DropletResource>> {
        let req = self
            .http
            .get(self.url(&format!("/v3/packages/{package_guid}/droplets")));
        let list: ListResponse<DropletResource> = self.json(req, "listing droplets").await?;
        Ok(list.resources)
    }

    async fn create_build(&self, package_guid: &str) -> Result<BuildResource> {
        let body = CreateBuildRequest {
            package: GuidRef::new(package_guid),
        };
        let req = self.http.post(self.url("/v3/builds")).json(&body);
        self.json(req, "creating build").await
    }

    async fn get_build(&self, guid: &str) -> Result<BuildResource> {
        self.lookup(&format!("/v3/builds/{guid}"), "build", guid)
            .await
    }

    async fn set_current_droplet(&self, app_guid: &str, droplet_guid: &str) -> Result<()> {
        let req = self
            .http
            .patch(self.url(&format!("/v3/apps/{app_guid}/relationships/current_droplet")))
            .json(&Relationship::to(droplet_guid));
        self.send(req, "setting current droplet").await?;
        Ok(())
    }

    async fn current_droplet(&self, app_guid: &str) -> Result<Option<DropletResource>> {
        let what = "fetching current droplet";
        let resp = self
            .send_raw(
                self.http
                    .get(self.url(&format!("/v3/apps/{app_guid}/droplets/current"))),
                what,
            )
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(check(resp, what).await?, what).await.map(Some)
    }

    async fn start_app(&self, guid: &str) -> Result<AppResource> {
        let req = self
            .http
            .post(self.url(&format!("/v3/apps/{guid}/actions/start")));
        self.json(req, "starting app").await
    }

    async fn stop_app(&self, guid: &str) -> Result<AppResource> {
        let req = self
            .http
            .post(self.url(&format!("/v3/apps/{guid}/actions/stop")));
        self.json(req, "stopping app").await
    }

    async fn delete_app(&self, guid: &str) -> Result<()> {
        let req = self.http.delete(self.url(&format!("/v3/apps/{guid}")));
        self.send(req, "deleting app").await?;
        Ok(())
    }

    async fn update_app_env(&self, guid: &str, vars: &BTreeMap<String, String>) -> Result<()> {
        let body = EnvironmentVariables { var: vars.clone() };
        let req = self
            .http
            .patch(self.url(&format!("/v3/apps/{guid}/environment_variables")))
            .json(&body);
        self.send(req, "updating app environment").await?;
        Ok(())
    }
}
