use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, info};

use crate::context::Context;
use crate::error::DriverError;
use crate::expand::is_readable;
use crate::source::{DataSource, EnvVar, Locator, SourceList};

#[derive(Debug, Deserialize)]
pub struct SdlResponse {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Vec<SdlResult>,
}

#[derive(Debug, Deserialize)]
pub struct SdlResult {
    pub bundle: String,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub files: Vec<SdlFile>,
}

#[derive(Debug, Deserialize)]
pub struct SdlFile {
    #[serde(rename = "type", default)]
    pub file_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub locations: Vec<SdlLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdlLocation {
    pub link: String,
    pub service: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub ce_required: bool,
    #[serde(default)]
    pub pay_required: bool,
}

/// Locator backed by the SRA Data Locator (SDL) service.
#[derive(Clone)]
pub struct SdlLocator {
    client: Client,
}

impl SdlLocator {
    pub fn new(timeout_secs: u64) -> Result<Self, DriverError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("sratools/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| DriverError::Locator(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| DriverError::Locator(err.to_string()))?;
        Ok(Self { client })
    }

    fn query(&self, context: &Context, run: &str) -> Result<String, DriverError> {
        let mut form = vec![("acc", run.to_string()), ("accept-proto", "https".to_string())];
        if let Some(location) = &context.location {
            form.push(("location", location.clone()));
        }
        let response = self
            .client
            .post(&context.config.resolver_url)
            .form(&form)
            .send()
            .map_err(|err| DriverError::Locator(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "locator request failed".to_string());
            return Err(DriverError::LocatorStatus { status, message });
        }
        response
            .text()
            .map_err(|err| DriverError::Locator(err.to_string()))
    }
}

impl Locator for SdlLocator {
    fn data_sources(&self, context: &Context, run: &str) -> Result<SourceList, DriverError> {
        if is_readable(Path::new(run)) {
            return Ok(local_sources(run));
        }
        if context.config.remote_disabled {
            info!("remote access is disabled; no source for {run}");
            return Ok(SourceList::default());
        }
        let body = self.query(context, run)?;
        let sources = parse_sdl_response(&body, run)?;
        Ok(SourceList::new(sources).with_ce_token(context.config.ce_token.clone()))
    }
}

/// A run given as a local path is its own single source.
pub fn local_sources(path: &str) -> SourceList {
    SourceList::new(vec![
        DataSource::new("local").with_env(EnvVar::LocalUrl, path),
    ])
}

/// Extracts the sources for `run` from an SDL version 2 response body.
///
/// Every location of an `sra` file becomes one source, in response order;
/// a `vdbcache` file offered by the same service and region is attached to
/// it. A non-200 status for the run means it has no sources.
pub fn parse_sdl_response(body: &str, run: &str) -> Result<Vec<DataSource>, DriverError> {
    let response: SdlResponse = serde_json::from_str(body)
        .map_err(|err| DriverError::Locator(format!("malformed locator response: {err}")))?;

    if let Some(status) = response.status.filter(|status| *status != 200) {
        return Err(DriverError::LocatorStatus {
            status,
            message: response.message.unwrap_or_default(),
        });
    }

    let Some(result) = response.result.into_iter().find(|result| result.bundle == run) else {
        debug!("locator response has no entry for {run}");
        return Ok(Vec::new());
    };
    if result.status != 200 {
        debug!(
            "locator status {} for {run}: {}",
            result.status,
            result.msg.as_deref().unwrap_or("")
        );
        return Ok(Vec::new());
    }

    let caches = result
        .files
        .iter()
        .filter(|file| file.file_type == "vdbcache")
        .flat_map(|file| file.locations.iter())
        .collect::<Vec<_>>();

    let mut sources = Vec::new();
    for file in result.files.iter().filter(|file| file.file_type == "sra") {
        for location in &file.locations {
            let mut source = DataSource::new(describe(location))
                .with_env(EnvVar::RemoteUrl, location.link.clone());
            if let Some(cache) = caches
                .iter()
                .find(|cache| cache.service == location.service && cache.region == location.region)
            {
                source = source.with_env(EnvVar::CacheUrl, cache.link.clone());
            }
            if location.ce_required {
                source = source.with_env(EnvVar::RemoteNeedCe, "1").requiring_ce();
            }
            if location.pay_required {
                source = source.with_env(EnvVar::RemoteNeedPmt, "1");
            }
            sources.push(source);
        }
    }
    debug!(
        "{} source(s) for {run} (files: {})",
        sources.len(),
        result
            .files
            .iter()
            .filter_map(|file| file.name.as_deref())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(sources)
}

fn describe(location: &SdlLocation) -> String {
    match &location.region {
        Some(region) if !region.is_empty() => format!("{}.{}", location.service, region),
        _ => location.service.clone(),
    }
}
