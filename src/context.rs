use std::env;

use camino::Utf8PathBuf;

use crate::config::DriverConfig;
use crate::invocation::Invocation;

pub const IMPERSONATE_ENV: &str = "SRATOOLS_IMPERSONATE";
pub const DRY_RUN_ENV: &str = "SRATOOLS_DRY_RUN";
pub const CONFIG_ENV: &str = "SRATOOLS_CONFIG";
pub const VERBOSE_ENV: &str = "SRATOOLS_VERBOSE";

/// Everything about this invocation that would otherwise be process-global.
/// Built once at startup and handed down by reference.
#[derive(Debug, Clone)]
pub struct Context {
    pub invocation: Invocation,
    /// Value of `--location`, forwarded to the locator.
    pub location: Option<String>,
    pub dry_run: bool,
    pub config: DriverConfig,
}

impl Context {
    pub fn new(invocation: Invocation, config: DriverConfig) -> Self {
        Self {
            invocation,
            location: None,
            dry_run: false,
            config,
        }
    }

    /// Reads argv[0] (or its impersonation override) and the dry-run switch
    /// from the process environment.
    pub fn from_env(real_argv0: &str, config: DriverConfig) -> Self {
        let impersonate = env::var(IMPERSONATE_ENV).ok();
        let argv0 = effective_argv0(real_argv0, impersonate.as_deref());
        let mut invocation = Invocation::parse(argv0);
        if let Some(dir) = current_exe_dir() {
            invocation = invocation.with_self_dir(dir);
        }
        let mut context = Self::new(invocation, config);
        context.dry_run = dry_run_requested(env::var(DRY_RUN_ENV).ok().as_deref());
        context
    }

    pub fn tool_argv0(&self) -> &str {
        &self.invocation.argv0
    }
}

pub fn effective_argv0<'a>(real: &'a str, impersonate: Option<&'a str>) -> &'a str {
    match impersonate {
        Some(name) if !name.is_empty() => name,
        _ => real,
    }
}

/// Any non-empty value other than `0` turns dry-run mode on.
pub fn dry_run_requested(value: Option<&str>) -> bool {
    matches!(value, Some(value) if !value.is_empty() && value != "0")
}

fn current_exe_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let dir = exe.parent()?.to_path_buf();
    Utf8PathBuf::from_path_buf(dir).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_values() {
        assert!(!dry_run_requested(None));
        assert!(!dry_run_requested(Some("")));
        assert!(!dry_run_requested(Some("0")));
        assert!(dry_run_requested(Some("1")));
        assert!(dry_run_requested(Some("00")));
        assert!(dry_run_requested(Some("yes")));
    }

    #[test]
    fn impersonation_overrides_argv0() {
        assert_eq!(effective_argv0("/bin/sratools", None), "/bin/sratools");
        assert_eq!(effective_argv0("/bin/sratools", Some("")), "/bin/sratools");
        assert_eq!(
            effective_argv0("/bin/sratools", Some("fasterq-dump")),
            "fasterq-dump"
        );
    }

    #[test]
    fn new_context_is_quiet() {
        let context = Context::new(Invocation::parse("sam-dump"), DriverConfig::default());
        assert!(!context.dry_run);
        assert_eq!(context.location, None);
        assert_eq!(context.tool_argv0(), "sam-dump");
    }
}
