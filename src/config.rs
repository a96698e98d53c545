use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub port: u16,
    pub database: Database,
    #[serde(default)]
    pub paste: Paste,
    #[serde(default)]
    pub limits: Limits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paste {
    #[serde(default = "default_token_length")]
    pub token_length: usize,
    /// How long soft-deleted pastes are retained before `purge-deleted`
    /// removes them, in seconds. `None` means keep forever.
    pub retention_secs: Option<u64>,
}

impl Default for Paste {
    fn default() -> Self {
        Paste {
            token_length: default_token_length(),
            retention_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Limits {
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_upload_size: default_max_upload_size(),
        }
    }
}

fn default_token_length() -> usize {
    4
}

fn default_max_upload_size() -> usize {
    1024 * 1024
}
