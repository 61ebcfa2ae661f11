use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{Error, Result};

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Clone)]
pub struct UploadService {
    root: PathBuf,
    max_bytes: usize,
}

/// Lowercased extension of `filename` when it is an allowed image type.
pub fn image_extension(filename: &str) -> Result<String> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(Error::BadRequest(format!(
            "File type not allowed. Allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }
    Ok(extension)
}

pub fn matches_signature(extension: &str, data: &[u8]) -> bool {
    match extension {
        "jpg" | "jpeg" => data.starts_with(&[0xFF, 0xD8, 0xFF]),
        "png" => data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
        "gif" => data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a"),
        "webp" => data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP",
        _ => false,
    }
}

impl UploadService {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Stores an image under `images/` and returns its public URL.
    pub async fn store_image(&self, filename: &str, data: &[u8]) -> Result<String> {
        if data.is_empty() {
            return Err(Error::BadRequest("Uploaded file is empty".to_string()));
        }
        if data.len() > self.max_bytes {
            return Err(Error::BadRequest(format!(
                "File exceeds the {} byte limit",
                self.max_bytes
            )));
        }
        let extension = image_extension(filename)?;
        if !matches_signature(&extension, data) {
            return Err(Error::BadRequest(
                "File content does not match its extension".to_string(),
            ));
        }

        let dir = self.root.join("images");
        tokio::fs::create_dir_all(&dir).await?;
        let saved = format!("{}.{}", Uuid::new_v4(), extension);
        tokio::fs::write(dir.join(&saved), data).await?;

        tracing::info!(file = %saved, bytes = data.len(), "Image stored");
        Ok(format!("/uploads/images/{}", saved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    #[test]
    fn extensions_are_case_insensitive_and_whitelisted() {
        assert_eq!(image_extension("Cat.JPG").unwrap(), "jpg");
        assert_eq!(image_extension("a.b.webp").unwrap(), "webp");
        assert!(image_extension("script.svg").is_err());
        assert!(image_extension("noext").is_err());
    }

    #[test]
    fn signatures_must_match_the_extension() {
        assert!(matches_signature("png", PNG));
        assert!(!matches_signature("jpg", PNG));
        assert!(matches_signature("jpeg", &[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(matches_signature("gif", b"GIF89a...."));
        assert!(matches_signature("webp", b"RIFF\0\0\0\0WEBPVP8 "));
        assert!(!matches_signature("webp", b"RIFF\0\0\0\0WAVE"));
    }

    #[tokio::test]
    async fn stores_valid_images_and_rejects_the_rest() {
        let root = std::env::temp_dir().join(format!("quizapp-uploads-{}", Uuid::new_v4()));
        let service = UploadService::new(&root, 16);

        let url = service.store_image("pic.png", PNG).await.unwrap();
        assert!(url.starts_with("/uploads/images/"));
        assert!(url.ends_with(".png"));
        let name = url.trim_start_matches("/uploads/images/");
        assert!(root.join("images").join(name).exists());

        assert!(service.store_image("pic.jpg", PNG).await.is_err());
        assert!(service.store_image("pic.png", &[0x89; 32]).await.is_err());
        assert!(service.store_image("pic.png", &[]).await.is_err());

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
