//! # Uploads
//!
//! Asset ingestion for logo images.
//!
//! - One image per write request, validated in memory before anything touches disk or the store
//! - Stored under `<uploads dir>/<unix millis>-<random><.ext>`
//! - Records only keep the public URL `/uploads/<name>`, files are served read-only from there
//!
//! ## Policies
//!
//! | Path | Types | Max |
//! |---|---|---|
//! | Site logo | jpeg, jpg, png, gif | 5 MiB |
//! | Header settings | jpeg, jpg, png, gif, svg | 5 MiB |
//!
//! The file extension has to be one of the listed types and the declared `image/*` subtype has to
//! contain one, so legacy names like `image/pjpeg` or `image/x-png` pass.
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use axum::body::Bytes;
use chrono::Utc;
use rand::Rng;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::AppError;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const PUBLIC_PREFIX: &str = "/uploads";

const RASTER_TYPES: &[&str] = &["jpeg", "jpg", "png", "gif"];
const SETTINGS_TYPES: &[&str] = &["jpeg", "jpg", "png", "gif", "svg"];

#[derive(Debug, Clone, Copy)]
pub struct ImagePolicy {
    pub allowed: &'static [&'static str],
    pub max_bytes: usize,
}

impl ImagePolicy {
    pub const LOGO: Self = Self {
        allowed: RASTER_TYPES,
        max_bytes: MAX_UPLOAD_BYTES,
    };

    pub const SETTINGS: Self = Self {
        allowed: SETTINGS_TYPES,
        max_bytes: MAX_UPLOAD_BYTES,
    };

    fn allows(&self, extension: &str) -> bool {
        self.allowed.contains(&extension)
    }

    fn allows_subtype(&self, subtype: &str) -> bool {
        self.allowed.iter().any(|kind| subtype.contains(kind))
    }

    fn rejection(&self) -> AppError {
        AppError::UnsupportedMedia(self.allowed.join(", "))
    }

    /// Returns the lowercase extension the stored file will carry.
    pub fn check_type(&self, file_name: &str, content_type: Option<&str>) -> Result<String, AppError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| self.rejection())?;

        let subtype = content_type
            .and_then(|mime| mime.strip_prefix("image/"))
            .map(str::to_ascii_lowercase);

        match subtype {
            Some(subtype) if self.allows(&extension) && self.allows_subtype(&subtype) => {
                Ok(extension)
            }
            _ => Err(self.rejection()),
        }
    }

    pub fn check_size(&self, len: usize) -> Result<(), AppError> {
        if len > self.max_bytes {
            return Err(AppError::FileTooLarge {
                max_bytes: self.max_bytes,
            });
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct UploadedFile {
    pub extension: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredAsset {
    pub file_name: String,
}

impl StoredAsset {
    pub fn url(&self) -> String {
        format!("{PUBLIC_PREFIX}/{}", self.file_name)
    }

    pub fn path(&self) -> String {
        format!("uploads/{}", self.file_name)
    }
}

pub struct Uploads {
    dir: PathBuf,
}

impl Uploads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    pub async fn save(&self, file: &UploadedFile) -> Result<StoredAsset, AppError> {
        let asset = StoredAsset {
            file_name: unique_name(&file.extension),
        };

        fs::write(self.dir.join(&asset.file_name), &file.bytes)
            .await
            .map_err(AppError::io("Failed to store uploaded file"))?;

        debug!(file = %asset.file_name, bytes = file.bytes.len(), "Stored upload");

        Ok(asset)
    }

    /// Best-effort delete of a previously stored asset, given its URL or relative path.
    /// Failures are logged and swallowed.
    pub async fn remove_quietly(&self, reference: &str) {
        let Some(file_name) = file_name_of(reference) else {
            warn!(reference, "Not an uploaded asset, skipping delete");
            return;
        };

        match fs::remove_file(self.dir.join(file_name)).await {
            Ok(()) => debug!(file = file_name, "Removed upload"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(file = file_name, "Old upload already gone")
            }
            Err(e) => warn!(file = file_name, "Failed to remove old upload: {e}"),
        }
    }
}

fn unique_name(extension: &str) -> String {
    let suffix: u32 = rand::rng().random_range(0..1_000_000_000);

    format!("{}-{suffix}.{extension}", Utc::now().timestamp_millis())
}

/// Accepts `/uploads/<name>` or `uploads/<name>`, nothing that could escape the directory.
fn file_name_of(reference: &str) -> Option<&str> {
    let name = reference
        .strip_prefix("/uploads/")
        .or_else(|| reference.strip_prefix("uploads/"))?;

    let valid = !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != "..";

    valid.then_some(name)
}
