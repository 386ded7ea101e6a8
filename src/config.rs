use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;

use crate::selector::SuggestionLimit;
use crate::store::SortOrder;

#[derive(Deserialize)]
pub struct Site {
    pub title: String,
    pub background_url: Option<String>,
}

#[derive(Deserialize)]
pub struct Paths {
    pub template_dir: PathBuf,
    pub public_dir: PathBuf,
}

#[derive(Deserialize, Copy, Clone, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// PostgREST style REST API
    Rest,
    /// In-process tables, nothing survives a restart
    Memory,
}

#[derive(Deserialize)]
pub struct Backend {
    pub kind: BackendKind,
    pub url: Option<String>,
    pub anon_key: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
    /// Admin account of the memory backend
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Deserialize)]
pub struct Uploader {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Deserialize)]
pub struct Defaults {
    /// Suggested posts next to the active one. 0 means no cap.
    pub suggestion_limit: Option<usize>,
    pub session_ttl_secs: Option<i64>,
}

#[derive(Deserialize)]
pub struct Server {
    pub address: String,
    pub port: u16,
}

#[derive(Deserialize)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Copy, Clone)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize)]
pub struct Config {
    pub site: Site,
    pub paths: Paths,
    pub backend: Backend,
    pub uploader: Option<Uploader>,
    pub defaults: Option<Defaults>,
    pub server: Server,
    pub log: Option<Log>,
}

const DEFAULT_SESSION_TTL_SECS: i64 = 8 * 60 * 60;

impl Config {
    pub fn suggestion_limit(&self) -> SuggestionLimit {
        SuggestionLimit::from_config(self.defaults.as_ref().and_then(|d| d.suggestion_limit))
    }

    pub fn session_ttl_secs(&self) -> i64 {
        self.defaults
            .as_ref()
            .and_then(|d| d.session_ttl_secs)
            .unwrap_or(DEFAULT_SESSION_TTL_SECS)
    }
}

fn parse_path(path: PathBuf) -> io::Result<PathBuf> {
    if path.starts_with("${exe_dir}") {
        let cur_exe = env::current_exe()?;
        let exe_dir = cur_exe.parent().and_then(|p| p.to_str()).unwrap_or(".");
        let str_path = path.to_string_lossy();
        Ok(PathBuf::from(str_path.replace("${exe_dir}", exe_dir)))
    } else {
        Ok(path)
    }
}

fn invalid(desc: String) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, desc)
}

pub fn parse_config(cfg_content: &str) -> io::Result<Config> {
    let cfg: Config = match toml::from_str::<Config>(cfg_content) {
        Ok(cfg) => cfg,
        Err(e) => return Err(invalid(format!("Error parsing configuration file: {}", e))),
    };

    if cfg.backend.kind == BackendKind::Rest {
        if cfg.backend.url.as_deref().unwrap_or("").is_empty() {
            return Err(invalid("backend.url is required for the rest backend".to_string()));
        }
        if cfg.backend.anon_key.as_deref().unwrap_or("").is_empty() {
            return Err(invalid("backend.anon_key is required for the rest backend".to_string()));
        }
    }

    Ok(cfg)
}

pub fn read_config(cfg_path: &Path) -> io::Result<Config> {
    let cfg_content = match fs::read_to_string(cfg_path) {
        Ok(content) => content,
        Err(e) => return Err(io::Error::new(e.kind(), format!("Error opening configuration file {}: {}", cfg_path.display(), e))),
    };

    let mut cfg = parse_config(&cfg_content)?;

    cfg.paths = Paths {
        template_dir: parse_path(cfg.paths.template_dir)?,
        public_dir: parse_path(cfg.paths.public_dir)?,
    };

    Ok(cfg)
}
