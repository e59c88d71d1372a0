use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Root of the file areas (`public/files`, `private/files`).
    #[serde(default = "default_site_directory")]
    pub site_directory: String,
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            site_directory: default_site_directory(),
            database_path: None,
            worker_count: default_worker_count(),
            ocr: OcrConfig::default(),
            batch: BatchConfig::default(),
            conversion: ConversionConfig::default(),
            tools: ToolsConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    pub fn site_directory(&self) -> PathBuf {
        PathBuf::from(&self.site_directory)
    }

    /// Configured database path, falling back to `~/.pdf-suite/data/pdf-suite.db`.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path
            .as_ref()
            .map(PathBuf::from)
            .or_else(crate::db::default_database_path)
    }
}

fn default_site_directory() -> String {
    dirs::home_dir()
        .map(|h| h.join(".pdf-suite").join("site"))
        .unwrap_or_else(|| PathBuf::from("site"))
        .to_string_lossy()
        .to_string()
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

fn default_languages() -> Vec<String> {
    vec!["eng".to_string()]
}

fn default_dpi() -> u32 {
    300
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            dpi: default_dpi(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_queue")]
    pub queue: String,
    #[serde(default = "default_batch_timeout")]
    pub timeout_seconds: u64,
}

fn default_queue() -> String {
    "long".to_string()
}

fn default_batch_timeout() -> u64 {
    600
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            queue: default_queue(),
            timeout_seconds: default_batch_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    #[serde(default = "default_conversion_timeout")]
    pub timeout_seconds: u64,
}

fn default_conversion_timeout() -> u64 {
    120
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_conversion_timeout(),
        }
    }
}

/// Names (or absolute paths) of the external binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_pdftoppm")]
    pub pdftoppm: String,
    #[serde(default = "default_tesseract")]
    pub tesseract: String,
    #[serde(default = "default_qpdf")]
    pub qpdf: String,
    #[serde(default = "default_libreoffice")]
    pub libreoffice: String,
}

fn default_pdftoppm() -> String {
    "pdftoppm".to_string()
}

fn default_tesseract() -> String {
    "tesseract".to_string()
}

fn default_qpdf() -> String {
    "qpdf".to_string()
}

fn default_libreoffice() -> String {
    "libreoffice".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            pdftoppm: default_pdftoppm(),
            tesseract: default_tesseract(),
            qpdf: default_qpdf(),
            libreoffice: default_libreoffice(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
