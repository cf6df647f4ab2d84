use std::path::PathBuf;

use anyhow::{Context, bail};
use tracing::info;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your_jwt_secret",
    "secret",
];

const DEFAULT_ADMIN_NAME: &str = "Recipe Admin";

pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub jwt_secret: String,
    pub client_url: String,
    pub admin: Option<AdminSeed>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let or_default = |key: &str, default: &str| {
            var(key).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| {
                info!("{key} not set, using default: {default}");
                default.to_string()
            })
        };

        let jwt_secret = var("RECIPEBOX_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("RECIPEBOX_JWT_SECRET is unset or still a placeholder");
        }

        let port = or_default("RECIPEBOX_PORT", "5500");
        let port = port
            .parse()
            .with_context(|| format!("invalid RECIPEBOX_PORT value: {port}"))?;

        let client_url = or_default("RECIPEBOX_CLIENT_URL", "http://localhost:5183")
            .trim_end_matches('/')
            .to_string();

        let admin = match (var("RECIPEBOX_ADMIN_EMAIL"), var("RECIPEBOX_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                name: or_default("RECIPEBOX_ADMIN_NAME", DEFAULT_ADMIN_NAME),
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            host: or_default("RECIPEBOX_HOST", "0.0.0.0"),
            port,
            db_path: or_default("RECIPEBOX_DB_PATH", "recipebox.db").into(),
            upload_dir: or_default("RECIPEBOX_UPLOAD_DIR", "./uploads").into(),
            jwt_secret,
            client_url,
            admin,
        })
    }
}
