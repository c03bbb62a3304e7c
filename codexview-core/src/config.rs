use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use dirs::home_dir;

use crate::error::{Result, ViewerError};
use crate::upload::DEFAULT_UPLOAD_FUNCTION;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_GIT_PROGRAM: &str = "git";

/// Values given on the command line; `None` defers to the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub git_program: Option<PathBuf>,
    pub upload_function: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    pub log_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub git_program: PathBuf,
    pub upload_function: String,
}

impl ViewerConfig {
    pub fn from_env(log_path: &Path, overrides: ConfigOverrides) -> Result<Self> {
        Self::from_lookup(log_path, overrides, |key| env::var_os(key))
    }

    pub fn from_lookup(
        log_path: &Path,
        overrides: ConfigOverrides,
        lookup: impl Fn(&str) -> Option<OsString>,
    ) -> Result<Self> {
        let env_value = |key: &str| lookup(key).filter(|value| !value.is_empty());

        // Precedence:
        // 1) command-line flag
        // 2) CODEXVIEW_* environment variable
        // 3) built-in default
        let host = overrides
            .host
            .or_else(|| env_value("CODEXVIEW_HOST").map(|value| value.to_string_lossy().into_owned()))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let git_program = overrides
            .git_program
            .or_else(|| env_value("CODEXVIEW_GIT").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GIT_PROGRAM));

        let upload_function = overrides
            .upload_function
            .or_else(|| {
                env_value("CODEXVIEW_UPLOAD_FN").map(|value| value.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| DEFAULT_UPLOAD_FUNCTION.to_string());

        let port = match overrides.port {
            Some(port) => port,
            None => match env_value("CODEXVIEW_PORT") {
                Some(raw) => parse_port("CODEXVIEW_PORT", &raw)?,
                None => DEFAULT_PORT,
            },
        };

        Ok(Self {
            log_path: resolve_log_path(log_path)?,
            host,
            port,
            git_program,
            upload_function,
        })
    }

    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

fn parse_port(key: &str, raw: &OsString) -> Result<u16> {
    let value = raw.to_string_lossy();
    value
        .trim()
        .parse::<u16>()
        .map_err(|_| ViewerError::InvalidEnv {
            key: key.to_string(),
            value: value.into_owned(),
        })
}

/// Expand a leading `~` and canonicalize; a missing file is reported as such.
pub fn resolve_log_path(raw: &Path) -> Result<PathBuf> {
    let expanded = expand_home(raw)?;
    if !expanded.exists() {
        return Err(ViewerError::LogNotFound { path: expanded });
    }

    fs::canonicalize(&expanded).map_err(|source| ViewerError::Io {
        path: expanded,
        source,
    })
}

fn expand_home(raw: &Path) -> Result<PathBuf> {
    let Ok(rest) = raw.strip_prefix("~") else {
        return Ok(raw.to_path_buf());
    };

    let home = home_dir().ok_or(ViewerError::HomeDirectoryNotFound)?;
    Ok(home.join(rest))
}
