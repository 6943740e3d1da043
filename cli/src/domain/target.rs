//! The platform target the CLI talks to, and URL helpers around it.

/// Platform API address as seen from inside a Korifi cluster.
pub const IN_CLUSTER_API_ENDPOINT: &str = "https://korifi-api-svc.korifi.svc.cluster.local";

/// Endpoint, credential and org/space selection for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    pub api_endpoint: String,
    /// Raw token, with or without its `bearer ` scheme.
    pub access_token: String,
    pub org_guid: String,
    pub org_name: Option<String>,
    pub space_guid: String,
    pub space_name: Option<String>,
    /// Logged-in user, when the token names one.
    pub user_name: Option<String>,
    pub skip_ssl_validation: bool,
}

impl Target {
    /// `Authorization` header value with a canonical `Bearer ` scheme.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("Bearer {}", strip_token_scheme(&self.access_token))
    }

    /// Endpoint without trailing slashes.
    #[must_use]
    pub fn api_base(&self) -> &str {
        self.api_endpoint.trim_end_matches('/')
    }

    /// `org O / space S as U` for progress headers, falling back to guids.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "org {} / space {} as {}",
            self.org_name.as_deref().unwrap_or(&self.org_guid),
            self.space_name.as_deref().unwrap_or(&self.space_guid),
            self.user_name.as_deref().unwrap_or("unknown user"),
        )
    }

    /// API endpoint reachable from a satellite running inside the platform.
    #[must_use]
    pub fn in_platform_endpoint(&self) -> String {
        if is_loopback_url(&self.api_endpoint) {
            IN_CLUSTER_API_ENDPOINT.to_string()
        } else {
            self.api_base().to_string()
        }
    }
}

/// Remove a case-insensitive `bearer ` prefix and surrounding whitespace.
#[must_use]
pub fn strip_token_scheme(token: &str) -> &str {
    let token = token.trim();
    match token.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => token[7..].trim_start(),
        _ => token,
    }
}

/// Split `scheme://authority/rest` into its parts. `rest` keeps its leading `/`.
fn split_url(url: &str) -> Option<(&str, &str, &str)> {
    let (scheme, after) = url.split_once("://")?;
    let end = after.find(['/', '?', '#']).unwrap_or(after.len());
    Some((scheme, &after[..end], &after[end..]))
}

fn authority_host(authority: &str) -> &str {
    let host_port = authority.rsplit('@').next().unwrap_or(authority);
    if let Some(stripped) = host_port.strip_prefix('[') {
        return stripped.split(']').next().unwrap_or(stripped);
    }
    host_port.split(':').next().unwrap_or(host_port)
}

/// Whether the URL's host is `localhost` or `127.0.0.1`.
#[must_use]
pub fn is_loopback_url(url: &str) -> bool {
    split_url(url).is_some_and(|(_, authority, _)| {
        let host = authority_host(authority);
        host.eq_ignore_ascii_case("localhost") || host == "127.0.0.1"
    })
}

/// Re-home a loopback URL onto `api_endpoint`, keeping path and query.
///
/// Non-loopback URLs are returned unchanged.
#[must_use]
pub fn rewrite_loopback_url(url: &str, api_endpoint: &str) -> String {
    match split_url(url) {
        Some((_, _, rest)) if is_loopback_url(url) => {
            format!("{}{rest}", api_endpoint.trim_end_matches('/'))
        }
        _ => url.to_string(),
    }
}
