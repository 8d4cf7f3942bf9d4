use std::collections::BTreeMap;
use std::fmt;

use crate::context::Context;
use crate::error::DriverError;

/// Environment variables the launcher uses to tell a tool where its data is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnvVar {
    RemoteUrl,
    CacheUrl,
    LocalUrl,
    LocalCacheUrl,
    RemoteNeedCe,
    RemoteNeedPmt,
    CeToken,
}

impl EnvVar {
    pub const ALL: [EnvVar; 7] = [
        EnvVar::RemoteUrl,
        EnvVar::CacheUrl,
        EnvVar::LocalUrl,
        EnvVar::LocalCacheUrl,
        EnvVar::RemoteNeedCe,
        EnvVar::RemoteNeedPmt,
        EnvVar::CeToken,
    ];

    /// Variables owned by a single source; every source rewrites all of them.
    pub const PER_SOURCE: [EnvVar; 6] = [
        EnvVar::RemoteUrl,
        EnvVar::CacheUrl,
        EnvVar::LocalUrl,
        EnvVar::LocalCacheUrl,
        EnvVar::RemoteNeedCe,
        EnvVar::RemoteNeedPmt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EnvVar::RemoteUrl => "VDB_REMOTE_URL",
            EnvVar::CacheUrl => "VDB_CACHE_URL",
            EnvVar::LocalUrl => "VDB_LOCAL_URL",
            EnvVar::LocalCacheUrl => "VDB_LOCAL_VDBCACHE",
            EnvVar::RemoteNeedCe => "VDB_REMOTE_NEED_CE",
            EnvVar::RemoteNeedPmt => "VDB_REMOTE_NEED_PMT",
            EnvVar::CeToken => "VDB_CE_TOKEN",
        }
    }
}

impl fmt::Display for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Environment overrides applied to every spawned tool.
///
/// `None` removes a variable the launcher itself may have inherited. Values
/// persist across attempts and runs until overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildEnv(BTreeMap<EnvVar, Option<String>>);

impl ChildEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, var: EnvVar, value: impl Into<String>) {
        self.0.insert(var, Some(value.into()));
    }

    pub fn unset(&mut self, var: EnvVar) {
        self.0.insert(var, None);
    }

    pub fn get(&self, var: EnvVar) -> Option<&str> {
        self.0.get(&var).and_then(|value| value.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (EnvVar, Option<&str>)> {
        self.0.iter().map(|(var, value)| (*var, value.as_deref()))
    }
}

/// One place a run's data can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    /// Service name, only used in diagnostics.
    pub service: String,
    pub env: Vec<(EnvVar, String)>,
    pub needs_ce: bool,
}

impl DataSource {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            env: Vec::new(),
            needs_ce: false,
        }
    }

    pub fn with_env(mut self, var: EnvVar, value: impl Into<String>) -> Self {
        self.env.push((var, value.into()));
        self
    }

    pub fn requiring_ce(mut self) -> Self {
        self.needs_ce = true;
        self
    }

    /// Writes this source's variables, clearing the per-source ones it does not use.
    pub fn install(&self, env: &mut ChildEnv) {
        for var in EnvVar::PER_SOURCE {
            env.unset(var);
        }
        for (var, value) in &self.env {
            env.set(*var, value.clone());
        }
    }
}

/// Candidate sources for one run, in retry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceList {
    pub sources: Vec<DataSource>,
    pub ce_token: Option<String>,
}

impl SourceList {
    pub fn new(sources: Vec<DataSource>) -> Self {
        Self {
            sources,
            ce_token: None,
        }
    }

    pub fn with_ce_token(mut self, token: Option<String>) -> Self {
        self.ce_token = token;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataSource> {
        self.sources.iter()
    }

    pub fn services(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|source| source.service.clone())
            .collect()
    }

    /// Installs the compute-environment token when some source requires it.
    pub fn install_ce_token(&self, env: &mut ChildEnv) {
        let needed = self.sources.iter().any(|source| source.needs_ce);
        match (&self.ce_token, needed) {
            (Some(token), true) => env.set(EnvVar::CeToken, token.clone()),
            _ => env.unset(EnvVar::CeToken),
        }
    }
}

/// Turns an accession into its ordered candidate sources.
pub trait Locator {
    fn data_sources(&self, context: &Context, run: &str) -> Result<SourceList, DriverError>;
}
