//! Layered configuration: defaults, then `.predictrc`, then environment, then CLI flags.

use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use anyhow::{anyhow, Result};
use directories::BaseDirs;

use crate::cli::Cli;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PROGRAM: &str = "python";
pub const DEFAULT_SCRIPT: &str = "recomended.py";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    /// Load from the rc file (explicit path, `PREDICT_CONFIG`, or the default
    /// location) and overlay the process environment.
    pub fn load(path: Option<PathBuf>) -> Self {
        let config_path = path
            .or_else(|| env::var("PREDICT_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(default_config_path);
        Self::from_sources(config_path, env::vars())
    }

    pub fn from_sources<I>(config_path: PathBuf, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = default_map();

        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(|l| l.ok()) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        let k = k.trim();
                        // PORT is only honoured from the environment
                        if k == "PORT" {
                            continue;
                        }
                        map.insert(k.to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Environment takes precedence over the rc file
        for (k, v) in vars {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    /// Parse a key if present. A present but malformed value is an error rather
    /// than a silent fallback.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.inner.get(key).map(|v| v.trim()) {
            None | Some("") => Ok(None),
            Some(v) => v
                .parse::<T>()
                .map(Some)
                .map_err(|e| anyhow!("invalid value for {}: {:?} ({})", key, v, e)),
        }
    }
}

/// Fully resolved settings the server runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub program: String,
    /// Script path passed before the symptoms argument; `None` runs the program directly.
    pub script: Option<String>,
    pub timeout: Option<Duration>,
    pub max_concurrency: Option<usize>,
    pub workers: Option<usize>,
    pub body_limit: usize,
}

impl GatewayConfig {
    pub fn resolve(cfg: &Config, args: &Cli) -> Result<Self> {
        // flag > PORT > PREDICT_PORT > default
        let port = match args.port {
            Some(p) => p,
            None => cfg
                .get_parsed::<u16>("PORT")?
                .or(cfg.get_parsed::<u16>("PREDICT_PORT")?)
                .unwrap_or(DEFAULT_PORT),
        };

        let host = args
            .host
            .clone()
            .or_else(|| cfg.get("PREDICT_HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let program = args
            .program
            .clone()
            .or_else(|| cfg.get("PREDICT_PROGRAM"))
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROGRAM.to_string());

        let script = args
            .script
            .clone()
            .or_else(|| cfg.get("PREDICT_SCRIPT"))
            .filter(|s| !s.trim().is_empty());

        let timeout_secs = match args.timeout {
            Some(t) => Some(t),
            None => cfg.get_parsed::<u64>("PREDICT_TIMEOUT")?,
        };
        let max_concurrency = match args.max_concurrency {
            Some(n) => Some(n),
            None => cfg.get_parsed::<usize>("PREDICT_MAX_CONCURRENCY")?,
        };
        let workers = match args.workers {
            Some(n) => Some(n),
            None => cfg.get_parsed::<usize>("PREDICT_WORKERS")?,
        };
        let body_limit = cfg
            .get_parsed::<usize>("PREDICT_BODY_LIMIT")?
            .unwrap_or(DEFAULT_BODY_LIMIT);

        Ok(Self {
            host,
            port,
            program,
            script,
            // zero means "no limit" for all three
            timeout: timeout_secs.filter(|s| *s > 0).map(Duration::from_secs),
            max_concurrency: max_concurrency.filter(|n| *n > 0),
            workers: workers.filter(|n| *n > 0),
            body_limit,
        })
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &["PORT"];
    KEYS.contains(&k) || k.starts_with("PREDICT_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("predict_gateway").join(".predictrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("PREDICT_HOST".into(), DEFAULT_HOST.into());
    m.insert("PREDICT_PORT".into(), DEFAULT_PORT.to_string());
    m.insert("PREDICT_PROGRAM".into(), DEFAULT_PROGRAM.into());
    m.insert("PREDICT_SCRIPT".into(), DEFAULT_SCRIPT.into());
    m.insert("PREDICT_BODY_LIMIT".into(), DEFAULT_BODY_LIMIT.to_string());
    m
}
