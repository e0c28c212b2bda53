use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// S3-compatible bucket holding uploaded receipt images.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Directory holding one pantry database per user.
    pub data_dir: PathBuf,
    pub credentials_db: PathBuf,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub openai: OpenAiConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| get(key).with_context(|| format!("{key} must be set"));
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.into());

        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: or_default("JWT_ISSUER", "smart-pantry"),
            audience: or_default("JWT_AUDIENCE", "smart-pantry-users"),
            ttl_minutes: get("JWT_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: get("JWT_REFRESH_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };

        let storage = StorageConfig {
            endpoint: required("MINIO_ENDPOINT")?,
            bucket: or_default("MINIO_BUCKET", "receipts"),
            access_key: required("MINIO_ACCESS_KEY")?,
            secret_key: required("MINIO_SECRET_KEY")?,
            region: or_default("MINIO_REGION", "us-east-1"),
        };

        let openai = OpenAiConfig {
            api_key: required("OPENAI_API_KEY")?,
            base_url: or_default("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            model: or_default("OPENAI_MODEL", "gpt-4o-mini"),
            timeout_secs: get("OPENAI_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60),
        };

        Ok(Self {
            data_dir: PathBuf::from(or_default("DATA_DIR", "user_data")),
            credentials_db: PathBuf::from(or_default("CREDENTIALS_DB", "users.db")),
            jwt,
            storage,
            openai,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("JWT_SECRET", "s3cret"),
        ("MINIO_ENDPOINT", "http://localhost:9000"),
        ("MINIO_ACCESS_KEY", "minio"),
        ("MINIO_SECRET_KEY", "minio123"),
        ("OPENAI_API_KEY", "sk-test"),
    ];

    #[test]
    fn defaults_fill_optional_settings() {
        let cfg = AppConfig::from_lookup(lookup(REQUIRED)).expect("config");
        assert_eq!(cfg.data_dir, PathBuf::from("user_data"));
        assert_eq!(cfg.credentials_db, PathBuf::from("users.db"));
        assert_eq!(cfg.jwt.ttl_minutes, 60);
        assert_eq!(cfg.storage.bucket, "receipts");
        assert_eq!(cfg.openai.model, "gpt-4o-mini");
        assert_eq!(cfg.openai.timeout_secs, 60);
    }

    #[test]
    fn unparsable_numbers_fall_back() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("OPENAI_TIMEOUT_SECS", "soon"));
        pairs.push(("DATA_DIR", "/var/lib/pantry"));
        let cfg = AppConfig::from_lookup(lookup(&pairs)).expect("config");
        assert_eq!(cfg.openai.timeout_secs, 60);
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/pantry"));
    }

    #[test]
    fn missing_secret_is_reported() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "OPENAI_API_KEY")
            .collect();
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
