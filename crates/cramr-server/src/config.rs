use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Secrets shipped in sample env files. A server started with one of these
/// would accept tokens anyone can forge.
const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "change-me-to-a-random-string"];

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub courses_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = var("CRAMR_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("CRAMR_JWT_SECRET must be set to a random value");
        }

        let host = var("CRAMR_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("CRAMR_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("CRAMR_PORT is not a port number")?;
        let addr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        Ok(Self {
            addr,
            db_path: PathBuf::from(var("CRAMR_DB_PATH").unwrap_or_else(|| "cramr.db".into())),
            jwt_secret,
            courses_file: var("CRAMR_COURSES_FILE").map(PathBuf::from),
        })
    }
}

/// Course titles from a newline-separated file, blank lines skipped.
pub fn read_course_titles(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
