use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use chrono::{DateTime, Utc};
use rand::RngCore;
use shared::EmotionClass;
use std::path::Path;
use url::Url;

use crate::config::StorageConfig;

#[derive(Debug, thiserror::Error)]
pub enum S3ServiceError {
    #[error("S3 error: {0}")]
    S3(String),
    #[error("File too large")]
    FileTooLarge,
}

/// Destination for the original uploads of classified images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores `image_data` under `key` and returns its public URL.
    async fn store_image(
        &self,
        image_data: &[u8],
        key: &str,
        content_type: &str,
    ) -> Result<String, S3ServiceError>;
}

#[derive(Clone)]
pub struct S3Service {
    client: Client,
    bucket_name: String,
    region: String,
    public_base_url: Option<Url>,
    public_read: bool,
}

impl S3Service {
    pub fn new(client: Client, config: &StorageConfig) -> Self {
        Self {
            client,
            bucket_name: config.bucket.clone(),
            region: config.region.clone(),
            public_base_url: config.public_base_url.clone(),
            public_read: config.public_read,
        }
    }

    pub fn generate_object_key(
        label: EmotionClass,
        file_extension: &str,
        timestamp: DateTime<Utc>,
    ) -> String {
        let mut suffix = [0u8; 4];
        rand::rng().fill_bytes(&mut suffix);
        format!(
            "{}_{}_{}.{}",
            label,
            timestamp.format("%Y%m%d_%H%M%S"),
            hex::encode(suffix),
            file_extension
        )
    }

    /// Extension of the uploaded file name, or of the sniffed image format.
    pub fn file_extension(file_name: Option<&str>, image_data: &[u8]) -> String {
        file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(|ext| ext.to_ascii_lowercase())
            .or_else(|| {
                image::guess_format(image_data)
                    .ok()
                    .and_then(|format| format.extensions_str().first())
                    .map(|ext| ext.to_string())
            })
            .unwrap_or_else(|| "bin".to_string())
    }

    pub fn content_type_for_extension(file_extension: &str) -> &'static str {
        match file_extension {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            "bmp" => "image/bmp",
            "tif" | "tiff" => "image/tiff",
            _ => "application/octet-stream",
        }
    }

    pub fn validate_image_size(image_data: &[u8]) -> Result<(), S3ServiceError> {
        const MAX_SIZE: usize = 50 * 1024 * 1024;
        if image_data.len() > MAX_SIZE {
            return Err(S3ServiceError::FileTooLarge);
        }
        Ok(())
    }

    pub fn object_url(&self, s3_key: &str) -> String {
        let encoded = urlencoding::encode(s3_key);
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.as_str().trim_end_matches('/'), encoded),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket_name, self.region, encoded
            ),
        }
    }
}

#[async_trait]
impl ImageStore for S3Service {
    async fn store_image(
        &self,
        image_data: &[u8],
        s3_key: &str,
        content_type: &str,
    ) -> Result<String, S3ServiceError> {
        S3Service::validate_image_size(image_data)?;

        let body = ByteStream::from(image_data.to_vec());

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(s3_key)
            .body(body)
            .content_type(content_type);
        if self.public_read {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }

        request
            .send()
            .await
            .map_err(|e| S3ServiceError::S3(e.to_string()))?;

        Ok(self.object_url(s3_key))
    }
}
