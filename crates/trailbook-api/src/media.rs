use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

/// On-disk image storage. Each upload is a flat file
/// `{dir}/{uuid}.{ext}`, served back at `{base_url}/uploads/{filename}`.
/// URLs reference files by value only; nothing counts references, so two
/// stories sharing a filename lose the image together.
pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Media storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn url_for(&self, base_url: &str, filename: &str) -> String {
        format!("{}/uploads/{}", base_url.trim_end_matches('/'), filename)
    }

    /// Persist uploaded bytes under a generated filename and return it.
    /// The extension comes from the uploaded filename when usable,
    /// otherwise from the content type.
    pub async fn store(
        &self,
        data: &[u8],
        original_name: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<String> {
        let ext = original_name
            .and_then(extension_of)
            .or_else(|| content_type.and_then(extension_for_type))
            .unwrap_or_else(|| "png".to_string());

        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        fs::write(self.dir.join(&filename), data).await?;
        Ok(filename)
    }

    /// Delete a stored file. Returns false when it was not present.
    pub async fn delete(&self, filename: &str) -> Result<bool> {
        match fs::remove_file(self.dir.join(filename)).await {
            Ok(()) => {
                info!("Deleted media file {}", filename);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Media file {} already gone", filename);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Derive a stored filename from a media URL: its last path segment.
    /// Rejects anything that could escape the storage directory.
    pub fn filename_from_url(url: &str) -> Option<String> {
        let segment = url.rsplit('/').next()?;
        if segment.is_empty() || segment == ".." || segment.contains('\\') {
            return None;
        }
        Some(segment.to_string())
    }
}

fn extension_of(name: &str) -> Option<String> {
    let ext = name.rsplit_once('.')?.1;
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn extension_for_type(content_type: &str) -> Option<String> {
    let ext = match content_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => return None,
    };
    Some(ext.to_string())
}
