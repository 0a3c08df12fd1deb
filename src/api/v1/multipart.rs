use super::error::ApiError;
use crate::domain_model::{ParsedUpload, UploadField, UploadedFile};
use futures_util::TryStreamExt;
use std::collections::HashMap;
use warp::Buf;
use warp::multipart::{FormData, Part};

/// A fully buffered multipart body: text fields plus the recognised files.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub uploads: ParsedUpload,
}

impl MultipartForm {
    /// Text value of `name`, or empty when the field was not sent.
    pub fn field(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }
}

pub async fn read_form(form: FormData) -> Result<MultipartForm, ApiError> {
    let mut parts = std::pin::pin!(form);
    let mut out = MultipartForm::default();

    while let Some(part) = parts.try_next().await.map_err(malformed)? {
        let name = part.name().to_string();
        let file_name = part.filename().map(str::to_string);
        let content_type = part.content_type().map(str::to_string);
        let bytes = read_part(part).await?;

        match UploadField::from_form_name(&name) {
            Some(field) => out.uploads.accept(UploadedFile {
                field,
                file_name,
                content_type,
                bytes,
            }),
            None => {
                let value = String::from_utf8(bytes).map_err(|_| {
                    ApiError::bad_request(format!("Field {} is not valid UTF-8", name))
                })?;
                // first occurrence wins
                out.fields.entry(name).or_insert(value);
            }
        }
    }

    Ok(out)
}

async fn read_part(part: Part) -> Result<Vec<u8>, ApiError> {
    part.stream()
        .try_fold(Vec::new(), |mut acc, mut buf| async move {
            while buf.has_remaining() {
                let n = {
                    let chunk = buf.chunk();
                    acc.extend_from_slice(chunk);
                    chunk.len()
                };
                buf.advance(n);
            }
            Ok(acc)
        })
        .await
        .map_err(malformed)
}

fn malformed(e: warp::Error) -> ApiError {
    ApiError::bad_request("Malformed multipart body").with_errors(vec![e.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp::Filter;

    const BOUNDARY: &str = "X-VIDTUBE-BOUNDARY";

    fn body(parts: &[(&str, Option<&str>, &str)]) -> Vec<u8> {
        let mut out = String::new();
        for (name, file_name, value) in parts {
            out.push_str(&format!("--{}\r\n", BOUNDARY));
            match file_name {
                Some(file_name) => out.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                    name, file_name
                )),
                None => out.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    name
                )),
            }
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str(&format!("--{}--\r\n", BOUNDARY));
        out.into_bytes()
    }

    async fn parse(parts: &[(&str, Option<&str>, &str)]) -> MultipartForm {
        let filter = warp::multipart::form().and_then(|form: FormData| async move {
            read_form(form).await.map_err(warp::reject::custom)
        });
        warp::test::request()
            .method("POST")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(body(parts))
            .filter(&filter)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn splits_text_fields_from_files() {
        let form = parse(&[
            ("fullName", None, "Alice Liddell"),
            ("avatar", Some("me.png"), "png-bytes"),
            ("coverImage", Some("wide.png"), "wide-bytes"),
        ])
        .await;

        assert_eq!(form.field("fullName"), "Alice Liddell");
        assert_eq!(form.field("email"), "");

        let avatar = form.uploads.avatar.as_ref().unwrap();
        assert_eq!(avatar.file_name.as_deref(), Some("me.png"));
        assert_eq!(avatar.content_type.as_deref(), Some("image/png"));
        assert_eq!(avatar.bytes, b"png-bytes");
        assert!(form.uploads.cover_image.is_some());
    }

    #[tokio::test]
    async fn repeated_text_field_keeps_first_value() {
        let form = parse(&[("username", None, "alice"), ("username", None, "bob")]).await;
        assert_eq!(form.field("username"), "alice");
    }

    #[tokio::test]
    async fn unknown_file_fields_are_kept_as_text() {
        let form = parse(&[("banner", Some("b.png"), "bytes")]).await;
        assert!(form.uploads.avatar.is_none());
        assert_eq!(form.field("banner"), "bytes");
    }
}
