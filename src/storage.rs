use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use uuid::Uuid;

use crate::{accounts::Asset, config::MediaConfig};

/// Image hosting collaborator.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, folder: &str, body: Bytes, content_type: &str)
        -> anyhow::Result<Asset>;
    async fn destroy(&self, public_id: &str) -> anyhow::Result<()>;
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

pub fn object_key(prefix: &str, folder: &str, ext: &str) -> String {
    format!(
        "{}/{}/{}.{}",
        prefix.trim_matches('/'),
        folder.trim_matches('/'),
        Uuid::new_v4(),
        ext
    )
}

pub fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

#[derive(Clone)]
pub struct S3MediaStore {
    client: Client,
    bucket: String,
    public_url: String,
    prefix: String,
}

impl S3MediaStore {
    pub async fn new(cfg: &MediaConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            public_url: cfg.public_url.clone(),
            prefix: cfg.prefix.clone(),
        })
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn upload(
        &self,
        folder: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<Asset> {
        let ext = ext_from_mime(content_type)
            .with_context(|| format!("unsupported content type {content_type}"))?;
        let key = object_key(&self.prefix, folder, ext);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("s3 put_object {key}"))?;
        Ok(Asset {
            url: public_url(&self.public_url, &key),
            public_id: key,
        })
    }

    async fn destroy(&self, public_id: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(public_id)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("text/html"), None);
    }

    #[test]
    fn keys_and_urls() {
        let key = object_key("/uploads/", "avatars", "png");
        assert!(key.starts_with("uploads/avatars/"));
        assert!(key.ends_with(".png"));
        assert_eq!(
            public_url("https://cdn.example/media/", "uploads/a.png"),
            "https://cdn.example/media/uploads/a.png"
        );
    }
}
