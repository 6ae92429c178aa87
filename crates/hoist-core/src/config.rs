//! Client configuration resolved from the environment.

use once_cell::sync::Lazy;
use reqwest::{ClientBuilder, Proxy};
use url::Url;

use crate::error::{ClientError, Result};

pub const HOST_ENV: &str = "HOIST_HOST";
pub const PROXY_ENV: &str = "HOIST_PROXY";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 11434;

// Snapshot of the variables, taken the first time anything asks.
static ENVIRONMENT: Lazy<Environment> = Lazy::new(Environment::capture);

#[derive(Debug, Clone)]
struct Environment {
    host:  Option<String>,
    proxy: Option<String>,
}

impl Environment {
    fn capture() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            host:  var(HOST_ENV),
            proxy: var(PROXY_ENV),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the server.
    pub host:    Url,
    pub proxies: Vec<Url>,
}

impl ClientConfig {
    /// Resolve from `HOIST_HOST` and `HOIST_PROXY`.
    pub fn from_env() -> Result<Self> {
        let env = &*ENVIRONMENT;
        Self::from_vars(env.host.as_deref(), env.proxy.as_deref())
    }

    pub fn from_vars(host: Option<&str>, proxy: Option<&str>) -> Result<Self> {
        let host = parse_host(host.unwrap_or_default())?;
        let proxies = proxy
            .map(|raw| {
                Url::parse(raw.trim())
                    .map_err(|e| ClientError::Config(format!("invalid {PROXY_ENV} {raw:?}: {e}")))
            })
            .transpose()?
            .into_iter()
            .collect();
        Ok(Self { host, proxies })
    }

    /// A reqwest builder carrying the user agent and proxies.
    pub fn http_builder(&self) -> Result<ClientBuilder> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent());

        let (secure, insecure): (Vec<&Url>, Vec<&Url>) =
            self.proxies.iter().partition(|u| u.scheme() == "https");

        for u in secure {
            let proxy = Proxy::https(u.as_str())
                .map_err(|e| ClientError::Config(format!("invalid proxy {u}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        for u in insecure {
            let proxy = Proxy::http(u.as_str())
                .map_err(|e| ClientError::Config(format!("invalid proxy {u}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        Ok(builder)
    }
}

pub fn user_agent() -> String {
    format!(
        "hoist/{} ({} {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH,
        std::env::consts::OS
    )
}

/// Parse `[scheme://]host[:port][/path]`.
///
/// Without a scheme the server is assumed to speak plain http on
/// [`DEFAULT_PORT`]; with an explicit scheme the scheme's own port applies.
/// An empty string is the local default. Any path is dropped.
pub fn parse_host(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let (scheme, rest, default_port) = match raw.split_once("://") {
        None => ("http", raw, DEFAULT_PORT),
        Some(("http", rest)) => ("http", rest, 80),
        Some(("https", rest)) => ("https", rest, 443),
        Some((other, _)) => {
            return Err(ClientError::Config(format!("unsupported scheme {other:?} in {HOST_ENV}")));
        }
    };
    let authority = rest.split('/').next().unwrap_or_default();
    let (host, port) = split_host_port(authority)?;

    let host = if host.is_empty() { DEFAULT_HOST.to_string() } else { host };
    let port = port.unwrap_or(default_port);

    Url::parse(&format!("{scheme}://{host}:{port}"))
        .map_err(|e| ClientError::Config(format!("invalid {HOST_ENV} {raw:?}: {e}")))
}

fn split_host_port(authority: &str) -> Result<(String, Option<u16>)> {
    let parse_port = |p: &str| {
        p.parse::<u16>()
            .map_err(|_| ClientError::Config(format!("invalid port {p:?} in {HOST_ENV}")))
    };

    if let Some(inner) = authority.strip_prefix('[') {
        let Some((addr, tail)) = inner.split_once(']') else {
            return Err(ClientError::Config(format!("unterminated ipv6 address in {HOST_ENV}")));
        };
        let port = match tail.strip_prefix(':') {
            Some(p) => Some(parse_port(p)?),
            None => None,
        };
        return Ok((format!("[{addr}]"), port));
    }

    match authority.matches(':').count() {
        0 => Ok((authority.to_string(), None)),
        1 => {
            let (host, port) = authority.split_once(':').unwrap_or((authority, ""));
            Ok((host.to_string(), Some(parse_port(port)?)))
        }
        // bare ipv6
        _ => Ok((format!("[{authority}]"), None)),
    }
}
