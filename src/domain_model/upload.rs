use serde::Serialize;
use std::fmt;

/// Which form field a file arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UploadField {
    Avatar,
    CoverImage,
}

impl UploadField {
    pub fn form_name(&self) -> &'static str {
        match self {
            UploadField::Avatar => "avatar",
            UploadField::CoverImage => "coverImage",
        }
    }

    pub fn from_form_name(name: &str) -> Option<Self> {
        match name {
            "avatar" => Some(UploadField::Avatar),
            "coverImage" => Some(UploadField::CoverImage),
            _ => None,
        }
    }
}

impl fmt::Display for UploadField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.form_name())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field: UploadField,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

// Bytes are omitted, they can be megabytes.
impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl UploadedFile {
    /// Lower-cased extension taken from the client supplied file name.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name.as_deref()?;
        let (_, ext) = name.rsplit_once('.')?;
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Files pulled out of a multipart body, at most one per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedUpload {
    pub avatar: Option<UploadedFile>,
    pub cover_image: Option<UploadedFile>,
}

impl ParsedUpload {
    /// Keeps the first file per field; empty files are ignored.
    pub fn accept(&mut self, file: UploadedFile) {
        if file.bytes.is_empty() {
            return;
        }
        let slot = match file.field {
            UploadField::Avatar => &mut self.avatar,
            UploadField::CoverImage => &mut self.cover_image,
        };
        if slot.is_none() {
            *slot = Some(file);
        }
    }

    pub fn take(&mut self, field: UploadField) -> Option<UploadedFile> {
        match field {
            UploadField::Avatar => self.avatar.take(),
            UploadField::CoverImage => self.cover_image.take(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaUrl(pub String);

impl fmt::Display for MediaUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
