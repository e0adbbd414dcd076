use std::env;
use std::str::FromStr;

/// Which container backend the service talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StorageBackend {
    /// S3-compatible object storage (MinIO, AWS, ...)
    S3,
    /// Process-local container, lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Connection settings for the blob container
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Backend kind (default: s3)
    pub backend: StorageBackend,

    /// Endpoint URL, e.g. "http://127.0.0.1:9000"
    pub endpoint: Option<String>,

    pub access_key: Option<String>,
    pub secret_key: Option<String>,

    /// Region (default: "us-east-1")
    pub region: String,

    /// Container (bucket) name (default: "pdf-files")
    pub bucket: String,

    /// Maximum entries requested per listing page (default: 1000)
    pub list_page_size: i32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            endpoint: None,
            access_key: None,
            secret_key: None,
            region: "us-east-1".to_string(),
            bucket: "pdf-files".to_string(),
            list_page_size: 1000,
        }
    }
}

impl StorageConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            backend: env::var("STORAGE_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.backend),

            endpoint: env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),
            access_key: env::var("S3_ACCESS_KEY").ok().filter(|v| !v.is_empty()),
            secret_key: env::var("S3_SECRET_KEY").ok().filter(|v| !v.is_empty()),

            region: env::var("S3_REGION").unwrap_or(default.region),
            bucket: env::var("S3_BUCKET").unwrap_or(default.bucket),

            list_page_size: env::var("LIST_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &i32| *v > 0)
                .unwrap_or(default.list_page_size),
        }
    }

    /// In-memory container, used for local development and tests
    pub fn memory() -> Self {
        Self {
            backend: StorageBackend::Memory,
            ..Self::default()
        }
    }
}

/// Limits applied to every uploaded file
#[derive(Debug, Clone)]
pub struct UploadRules {
    /// Maximum size of a single file in bytes (default: 5,000,000)
    pub max_file_size: u64,

    /// The only content type accepted (default: "application/pdf")
    pub allowed_content_type: String,

    /// Maximum size of a whole upload request body (default: 64 MB)
    pub max_request_size: usize,
}

impl Default for UploadRules {
    fn default() -> Self {
        Self {
            max_file_size: 5_000_000,
            allowed_content_type: mime::APPLICATION_PDF.essence_str().to_string(),
            max_request_size: 64 * 1024 * 1024,
        }
    }
}

impl UploadRules {
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            allowed_content_type: env::var("ALLOWED_CONTENT_TYPE")
                .unwrap_or(default.allowed_content_type),

            max_request_size: env::var("MAX_REQUEST_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_request_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_storage_config() {
        let config = StorageConfig::default();
        assert_eq!(config.backend, StorageBackend::S3);
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.bucket, "pdf-files");
        assert_eq!(config.list_page_size, 1000);
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_memory_config() {
        let config = StorageConfig::memory();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert_eq!(config.bucket, "pdf-files");
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("s3".parse::<StorageBackend>(), Ok(StorageBackend::S3));
        assert_eq!(" Memory ".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert!("azure".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_default_upload_rules() {
        let rules = UploadRules::default();
        assert_eq!(rules.max_file_size, 5_000_000);
        assert_eq!(rules.allowed_content_type, "application/pdf");
    }
}
