use crate::application_port::{MediaError, MediaHost};
use crate::domain_model::{MediaUrl, UploadedFile};
use crate::logger::*;
use std::path::PathBuf;
use uuid::Uuid;

/// Stores uploads under `root` and serves them from `public_base_url`.
pub struct LocalMediaHost {
    root: PathBuf,
    public_base_url: String,
}

impl LocalMediaHost {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        LocalMediaHost {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    fn object_name(file: &UploadedFile) -> String {
        match file.extension() {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        }
    }
}

#[async_trait::async_trait]
impl MediaHost for LocalMediaHost {
    async fn upload(&self, file: UploadedFile) -> Result<MediaUrl, MediaError> {
        if let Some(content_type) = file.content_type.as_deref() {
            if !content_type.starts_with("image/") {
                return Err(MediaError::Rejected(format!(
                    "{} must be an image, got {content_type}",
                    file.field
                )));
            }
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let name = Self::object_name(&file);
        tokio::fs::write(self.root.join(&name), &file.bytes).await?;

        let url = format!("{}/{}", self.public_base_url.trim_end_matches('/'), name);
        debug!(field = %file.field, bytes = file.bytes.len(), %url, "stored upload");
        Ok(MediaUrl(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::UploadField;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("vidtube-media-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn upload_writes_file_and_returns_public_url() {
        let root = scratch_dir();
        let host = LocalMediaHost::new(&root, "http://localhost:8000/media/");

        let url = host
            .upload(UploadedFile {
                field: UploadField::Avatar,
                file_name: Some("me.PNG".to_string()),
                content_type: Some("image/png".to_string()),
                bytes: b"png-bytes".to_vec(),
            })
            .await
            .unwrap();

        let name = url.0.strip_prefix("http://localhost:8000/media/").unwrap();
        assert!(name.ends_with(".png"));
        let stored = tokio::fs::read(root.join(name)).await.unwrap();
        assert_eq!(stored, b"png-bytes");

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn non_image_is_rejected() {
        let host = LocalMediaHost::new(scratch_dir(), "http://localhost/media");
        let result = host
            .upload(UploadedFile {
                field: UploadField::CoverImage,
                file_name: Some("notes.txt".to_string()),
                content_type: Some("text/plain".to_string()),
                bytes: b"hello".to_vec(),
            })
            .await;
        assert!(matches!(result, Err(MediaError::Rejected(_))));
    }
}
