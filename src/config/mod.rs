use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub images: ImageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

/// Where originals and variants live. Records in the database point at
/// these blobs, so only durable backends are configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_root")]
    pub root: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
    #[serde(default = "default_resized_width")]
    pub resized_width: u32,
    #[serde(default = "default_resized_height")]
    pub resized_height: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_max_upload")]
    pub max_upload_size: String,
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            thumbnail_size: default_thumbnail_size(),
            resized_width: default_resized_width(),
            resized_height: default_resized_height(),
            jpeg_quality: default_jpeg_quality(),
            max_upload_size: default_max_upload(),
            per_page: default_per_page(),
        }
    }
}

impl ImageConfig {
    pub fn resized_box(&self) -> (u32, u32) {
        (self.resized_width, self.resized_height)
    }

    pub fn max_upload_bytes(&self) -> Result<usize> {
        parse_size(&self.max_upload_size)
    }

    pub fn validate(&self) -> Result<()> {
        if self.thumbnail_size == 0 {
            anyhow::bail!("images.thumbnail_size must be greater than 0");
        }
        if self.resized_width == 0 || self.resized_height == 0 {
            anyhow::bail!("images.resized_width and images.resized_height must be greater than 0");
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            anyhow::bail!("images.jpeg_quality must be between 1 and 100");
        }
        if self.per_page == 0 {
            anyhow::bail!("images.per_page must be greater than 0");
        }
        self.max_upload_bytes()?;
        Ok(())
    }
}

/// Parses sizes such as `512KB`, `10MB` or a bare byte count.
pub fn parse_size(s: &str) -> Result<usize> {
    let s = s.trim();
    let upper = s.to_ascii_uppercase();
    let (digits, multiplier) = if let Some(n) = upper.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = upper.strip_suffix('B') {
        (n, 1)
    } else {
        (upper.as_str(), 1)
    };

    let value: usize = digits
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid size '{}'", s))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| anyhow::anyhow!("Size '{}' is too large", s))
}

fn resolve(base: &Path, path: &str) -> String {
    if Path::new(path).is_absolute() {
        path.to_string()
    } else {
        base.join(path).to_string_lossy().into_owned()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_pool_size() -> u32 {
    10
}

fn default_storage_root() -> String {
    "./data/blobs".to_string()
}

fn default_bucket() -> String {
    "photos".to_string()
}

fn default_thumbnail_size() -> u32 {
    220
}

fn default_resized_width() -> u32 {
    480
}

fn default_resized_height() -> u32 {
    360
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_max_upload() -> String {
    "10MB".to_string()
}

fn default_per_page() -> usize {
    9
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Could not read config file '{}': {}. Run 'photos init' to create one.",
                path.display(),
                e
            )
        })?;
        let mut config = Self::parse(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Relative data paths are taken relative to the directory holding the
    /// config file, not the working directory.
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.database.path != ":memory:" {
            self.database.path = resolve(base, &self.database.path);
        }
        self.storage.root = resolve(base, &self.storage.root);
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 {
            anyhow::bail!("database.pool_size must be greater than 0");
        }
        if self.storage.bucket.is_empty()
            || self.storage.bucket.contains(['/', '\\'])
            || self.storage.bucket.contains("..")
        {
            anyhow::bail!("storage.bucket must be a plain directory name");
        }
        self.images.validate()?;
        Ok(())
    }
}
