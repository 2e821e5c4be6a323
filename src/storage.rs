//! Image storage on an S3-compatible bucket.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use thiserror::Error;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    Upload(String),
}

#[derive(Clone)]
pub struct Storage {
    client: S3Client,
    bucket: String,
    public_base_url: String,
}

impl Storage {
    pub async fn connect(config: &StorageConfig) -> Self {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        let mut builder = aws_sdk_s3::config::Builder::from(&aws_config);

        // Custom S3-compatible endpoints (MinIO etc.) need path-style keys.
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: S3Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }

    pub async fn put_image(
        &self,
        key: String,
        content_type: String,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        Ok(public_url(&self.public_base_url, &self.bucket, &key))
    }
}

/// Builds a public URL from a configurable base. The base may carry the
/// bucket in its host, in its path, or as a `{bucket}`/`{key}` template.
pub fn public_url(base: &str, bucket: &str, key: &str) -> String {
    let trimmed = base.trim_end_matches('/');

    if trimmed.contains("{bucket}") || trimmed.contains("{key}") {
        return trimmed.replace("{bucket}", bucket).replace("{key}", key);
    }

    if trimmed.contains(bucket) {
        format!("{trimmed}/{key}")
    } else {
        format!("{trimmed}/{bucket}/{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_variants() {
        assert_eq!(
            public_url("https://img.example.com", "shop", "products/a.jpg"),
            "https://img.example.com/shop/products/a.jpg"
        );
        assert_eq!(
            public_url("https://shop.s3.amazonaws.com/", "shop", "products/a.jpg"),
            "https://shop.s3.amazonaws.com/products/a.jpg"
        );
        assert_eq!(
            public_url("https://cdn.example.com/{bucket}/{key}", "shop", "k.png"),
            "https://cdn.example.com/shop/k.png"
        );
    }
}
