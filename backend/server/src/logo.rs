use tracing::info;

use crate::{
    error::AppError,
    models::{DEFAULT_LOGO_ALT, SiteLogo},
    store::HeaderStore,
    uploads::{StoredAsset, Uploads},
};

pub const LOGO_NOT_FOUND: &str = "Logo not found";

pub async fn get_logo(store: &dyn HeaderStore) -> Result<SiteLogo, AppError> {
    store
        .get_logo()
        .await
        .map_err(AppError::storage("Failed to fetch logo"))?
        .ok_or_else(|| AppError::not_found(LOGO_NOT_FOUND))
}

/// Points the site logo at a freshly stored asset, then drops the file the old logo used.
pub async fn replace_logo(
    store: &dyn HeaderStore,
    uploads: &Uploads,
    asset: &StoredAsset,
    alt: Option<&str>,
) -> Result<SiteLogo, AppError> {
    let previous = store
        .get_logo()
        .await
        .map_err(AppError::storage("Failed to update logo"))?;

    let logo = SiteLogo {
        url: asset.url(),
        path: asset.path(),
        alt: alt.unwrap_or(DEFAULT_LOGO_ALT).to_string(),
    };

    store
        .put_logo(&logo)
        .await
        .map_err(AppError::storage("Failed to update logo"))?;

    if let Some(previous) = previous.filter(|previous| !previous.path.is_empty()) {
        uploads.remove_quietly(&previous.path).await;
    }

    info!(url = %logo.url, "Replaced site logo");

    Ok(logo)
}

#[cfg(test)]
mod tests {
    use axum::body::Bytes;

    use super::*;
    use crate::{store::MemoryStore, uploads::UploadedFile};

    fn png() -> UploadedFile {
        UploadedFile {
            extension: "png".into(),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    #[tokio::test]
    async fn missing_logo_is_not_found() {
        let store = MemoryStore::new();

        let err = get_logo(&store).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(ref msg) if msg == LOGO_NOT_FOUND));
    }

    #[tokio::test]
    async fn replacing_logo_removes_old_file() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = Uploads::new(dir.path());
        let store = MemoryStore::new();

        let first = uploads.save(&png()).await.unwrap();
        let logo = replace_logo(&store, &uploads, &first, None).await.unwrap();
        assert_eq!(logo.alt, DEFAULT_LOGO_ALT);

        let second = uploads.save(&png()).await.unwrap();
        let logo = replace_logo(&store, &uploads, &second, Some("Acme"))
            .await
            .unwrap();

        assert_eq!(logo.alt, "Acme");
        assert_eq!(get_logo(&store).await.unwrap(), logo);
        assert!(!dir.path().join(&first.file_name).exists());
        assert!(dir.path().join(&second.file_name).exists());
    }
}
