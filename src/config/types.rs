use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub processing: ProcessingConfig,

    #[serde(default)]
    pub activity_log: ActivityLogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Web interface served for any path no route matches
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Origins allowed to call /process from a browser (empty = any)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Replace host and port with command-line values, where given.
    pub fn apply_overrides(&mut self, host: Option<String>, port: Option<u16>) {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding source and processed images
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,

    /// JSON catalog of processed images
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Append-only activity log
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("images")
}
fn default_catalog_path() -> PathBuf {
    PathBuf::from("server/imginfo.json")
}
fn default_log_path() -> PathBuf {
    PathBuf::from("server/log.txt")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
            catalog_path: default_catalog_path(),
            log_path: default_log_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_blur_radius")]
    pub blur_radius: u32,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_blur_radius() -> u32 {
    pixelforge_filters::Filter::DEFAULT_BLUR_RADIUS
}
fn default_jpeg_quality() -> u8 {
    80
}
fn default_max_upload_bytes() -> usize {
    10 << 20
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            blur_radius: default_blur_radius(),
            jpeg_quality: default_jpeg_quality(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActivityLogConfig {
    /// Seconds between flushes of buffered activity lines
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
}

fn default_flush_interval() -> u64 {
    10
}

impl Default for ActivityLogConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_interval(),
        }
    }
}
