use larder_core::{Error, Result};

pub const BACKEND_URL_ENV: &str = "LARDER_SUPABASE_URL";
pub const BACKEND_ANON_KEY_ENV: &str = "LARDER_SUPABASE_ANON_KEY";
pub const BACKEND_ACCESS_TOKEN_ENV: &str = "LARDER_SUPABASE_ACCESS_TOKEN";

const PLACEHOLDER_URL: &str = "YOUR_SUPABASE_PROJECT_URL";
const PLACEHOLDER_ANON_KEY: &str = "YOUR_SUPABASE_ANON_KEY";

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub anon_key: String,
    /// Session token of the signed-in user. Requests fall back to the anon
    /// key when absent.
    pub access_token: Option<String>,
}

impl BackendConfig {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            anon_key: anon_key.trim().to_string(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.access_token = (!token.trim().is_empty()).then(|| token.trim().to_string());
        self
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(BACKEND_URL_ENV)
            .ok_or_else(|| Error::config(format!("{} is not set", BACKEND_URL_ENV)))?;
        let anon_key = lookup(BACKEND_ANON_KEY_ENV)
            .ok_or_else(|| Error::config(format!("{} is not set", BACKEND_ANON_KEY_ENV)))?;

        let config = Self::new(&base_url, &anon_key);
        Ok(match lookup(BACKEND_ACCESS_TOKEN_ENV) {
            Some(token) => config.with_access_token(token),
            None => config,
        })
    }

    /// False while the URL or key is blank or still the template placeholder,
    /// in which case the app runs on the device-local store only.
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
            && !self.anon_key.is_empty()
            && self.base_url != PLACEHOLDER_URL
            && self.anon_key != PLACEHOLDER_ANON_KEY
    }

    /// Token sent as the bearer credential.
    pub fn bearer_token(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.anon_key)
    }
}
