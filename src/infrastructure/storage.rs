use crate::config::{StorageBackend, StorageConfig};
use crate::services::memory_storage::MemoryContainer;
use crate::services::storage::{BlobContainer, S3Container, StorageError, object_uri};
use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use url::Url;

/// Produces handles to the configured blob container.
///
/// Every operation acquires a fresh handle; acquisition has no side effects
/// on the store and can be retried freely.
#[async_trait]
pub trait ContainerFactory: Send + Sync {
    async fn acquire_container(&self) -> Result<Arc<dyn BlobContainer>, StorageError>;

    /// Releases any shared connection state. Later acquisitions start fresh.
    async fn shutdown(&self) {}
}

pub struct S3ContainerFactory {
    config: StorageConfig,
    client: Mutex<Option<aws_sdk_s3::Client>>,
}

impl S3ContainerFactory {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            client: Mutex::new(None),
        }
    }

    /// Returns the shared client, building it on first use.
    async fn client(&self) -> Result<aws_sdk_s3::Client, StorageError> {
        let mut guard = self.client.lock().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let client = build_client(&self.config).await?;
        *guard = Some(client.clone());
        Ok(client)
    }

    fn base_uri(&self) -> Result<Url, StorageError> {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .ok_or_else(|| StorageError::Connection("S3_ENDPOINT is not set".to_string()))?;
        let endpoint = Url::parse(endpoint).map_err(|e| {
            StorageError::Connection(format!("invalid endpoint '{}': {}", endpoint, e))
        })?;
        object_uri(&endpoint, &self.config.bucket)
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Creates the bucket when it does not exist yet.
    pub async fn ensure_container(&self) -> Result<(), StorageError> {
        let client = self.client().await?;
        let bucket = &self.config.bucket;

        match client.head_bucket().bucket(bucket).send().await {
            Ok(_) => info!("✅ Bucket '{}' is ready", bucket),
            Err(_) => {
                info!("🪣 Bucket '{}' not found, creating...", bucket);
                client
                    .create_bucket()
                    .bucket(bucket)
                    .send()
                    .await
                    .map_err(|e| {
                        tracing::error!("❌ Failed to create bucket '{}': {}", bucket, e);
                        StorageError::Connection(format!(
                            "failed to create bucket '{}': {}",
                            bucket,
                            DisplayErrorContext(&e)
                        ))
                    })?;
                info!("✅ Bucket '{}' created successfully", bucket);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerFactory for S3ContainerFactory {
    async fn acquire_container(&self) -> Result<Arc<dyn BlobContainer>, StorageError> {
        let base_uri = self.base_uri()?;
        let client = self.client().await?;

        client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|e| {
                StorageError::Connection(format!(
                    "container '{}' is unreachable: {}",
                    self.config.bucket,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(Arc::new(S3Container::new(
            client,
            self.config.bucket.clone(),
            base_uri,
            self.config.list_page_size,
        )))
    }

    async fn shutdown(&self) {
        if self.client.lock().await.take().is_some() {
            info!("🔌 S3 client released");
        }
    }
}

async fn build_client(config: &StorageConfig) -> Result<aws_sdk_s3::Client, StorageError> {
    let endpoint_url = config
        .endpoint
        .clone()
        .ok_or_else(|| StorageError::Connection("S3_ENDPOINT is not set".to_string()))?;
    let access_key = config
        .access_key
        .clone()
        .ok_or_else(|| StorageError::Connection("S3_ACCESS_KEY is not set".to_string()))?;
    let secret_key = config
        .secret_key
        .clone()
        .ok_or_else(|| StorageError::Connection("S3_SECRET_KEY is not set".to_string()))?;

    info!(
        "☁️  S3 Storage: {} (Bucket: {})",
        endpoint_url, config.bucket
    );

    let aws_config = aws_config::from_env()
        .endpoint_url(&endpoint_url)
        .region(Region::new(config.region.clone()))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key, secret_key, None, None, "static",
        ))
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(true)
        .build();

    Ok(aws_sdk_s3::Client::from_conf(s3_config))
}

/// Hands out the same in-memory container on every acquisition.
pub struct MemoryContainerFactory {
    container: Arc<MemoryContainer>,
}

impl MemoryContainerFactory {
    pub fn new(container: Arc<MemoryContainer>) -> Self {
        Self { container }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let endpoint = config.endpoint.as_deref().unwrap_or("memory://local/");
        let endpoint = Url::parse(endpoint)
            .map_err(|e| StorageError::Connection(format!("invalid endpoint: {}", e)))?;
        let base_uri = object_uri(&endpoint, &config.bucket)?;
        let page_size = usize::try_from(config.list_page_size).unwrap_or(1);

        Ok(Self::new(Arc::new(MemoryContainer::new(base_uri, page_size))))
    }

    pub fn container(&self) -> Arc<MemoryContainer> {
        self.container.clone()
    }
}

#[async_trait]
impl ContainerFactory for MemoryContainerFactory {
    async fn acquire_container(&self) -> Result<Arc<dyn BlobContainer>, StorageError> {
        Ok(self.container.clone())
    }
}

pub async fn setup_storage(
    config: &StorageConfig,
) -> Result<Arc<dyn ContainerFactory>, StorageError> {
    match config.backend {
        StorageBackend::S3 => {
            let factory = S3ContainerFactory::new(config.clone());
            factory.ensure_container().await?;
            Ok(Arc::new(factory))
        }
        StorageBackend::Memory => {
            info!("🧠 In-memory storage (Bucket: {})", config.bucket);
            Ok(Arc::new(MemoryContainerFactory::from_config(config)?))
        }
    }
}
