use crate::application_port::{MediaError, MediaHost};
use crate::domain_model::{MediaUrl, UploadedFile};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct FakeMediaHost {
    uploads: AtomicUsize,
}

impl FakeMediaHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

// Keeps nothing, hands back a deterministic URL.
#[async_trait::async_trait]
impl MediaHost for FakeMediaHost {
    async fn upload(&self, file: UploadedFile) -> Result<MediaUrl, MediaError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        let name = file.file_name.unwrap_or_else(|| format!("upload-{n}"));
        Ok(MediaUrl(format!("fake://media/{}/{}", file.field, name)))
    }
}
