use reqwest::Url;

use crate::client::SupabaseError;

/// Default storage bucket holding submission images.
pub const DEFAULT_BUCKET: &str = "submission-images";

/// Connection settings for one Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abcd.supabase.co`.
    pub base_url: Url,
    /// Public anon key; sent as both `apikey` and bearer token.
    pub anon_key: String,
    /// Storage bucket for images.
    pub bucket: String,
}

impl SupabaseConfig {
    pub fn new(
        base_url: &str,
        anon_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Result<Self, SupabaseError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| SupabaseError::Config(format!("invalid SUPABASE_URL '{base_url}': {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(SupabaseError::Config(format!(
                "SUPABASE_URL must be http(s), got '{}'",
                base_url.scheme()
            )));
        }

        let anon_key = anon_key.into();
        if anon_key.trim().is_empty() {
            return Err(SupabaseError::Config(
                "SUPABASE_ANON_KEY must not be empty".to_string(),
            ));
        }

        let bucket = bucket.into();
        if bucket.trim().is_empty() || bucket.contains('/') {
            return Err(SupabaseError::Config(format!(
                "SUPABASE_BUCKET '{bucket}' is not a valid bucket name"
            )));
        }

        Ok(Self {
            base_url,
            anon_key,
            bucket,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var             | Default             |
    /// |---------------------|---------------------|
    /// | `SUPABASE_URL`      | required            |
    /// | `SUPABASE_ANON_KEY` | required            |
    /// | `SUPABASE_BUCKET`   | `submission-images` |
    pub fn from_env() -> Result<Self, SupabaseError> {
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| SupabaseError::Config("SUPABASE_URL is not set".to_string()))?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| SupabaseError::Config("SUPABASE_ANON_KEY is not set".to_string()))?;
        let bucket = std::env::var("SUPABASE_BUCKET").unwrap_or_else(|_| DEFAULT_BUCKET.into());

        Self::new(&url, anon_key, bucket)
    }
}
