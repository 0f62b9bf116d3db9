//! Configuration loading from environment variables.

use anyhow::{Context, Result};

pub const ENV_API_URL: &str = "SCHOOL_API_URL";
pub const ENV_API_TOKEN: &str = "SCHOOL_API_TOKEN";

/// School API location and bearer token.
#[derive(Clone)]
pub struct Credentials {
    pub base_url: String,
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Load credentials from environment variables.
    ///
    /// Expects `SCHOOL_API_URL` and `SCHOOL_API_TOKEN` to be set,
    /// either in the environment or in a `.env` file.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_API_URL)
            .filter(|v| !v.trim().is_empty())
            .with_context(|| format!("{} environment variable not set", ENV_API_URL))?;

        let token = lookup(ENV_API_TOKEN)
            .filter(|v| !v.trim().is_empty())
            .with_context(|| format!("{} environment variable not set", ENV_API_TOKEN))?;

        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn make_lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_credentials_from_lookup() {
        let creds = Credentials::from_lookup(make_lookup(&[
            (ENV_API_URL, "https://school.example/api/"),
            (ENV_API_TOKEN, " abc123 "),
        ]))
        .unwrap();

        assert_eq!(creds.base_url, "https://school.example/api");
        assert_eq!(creds.token, "abc123");
    }

    #[test]
    fn test_credentials_missing_token() {
        let err = Credentials::from_lookup(make_lookup(&[(ENV_API_URL, "https://x")])).unwrap_err();
        assert!(err.to_string().contains(ENV_API_TOKEN));
    }

    #[test]
    fn test_credentials_blank_url() {
        let err = Credentials::from_lookup(make_lookup(&[(ENV_API_URL, "  "), (ENV_API_TOKEN, "t")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_API_URL));
    }

    #[test]
    fn test_debug_hides_token() {
        let creds = Credentials {
            base_url: "https://x".to_string(),
            token: "secret".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("secret"));
    }
}
