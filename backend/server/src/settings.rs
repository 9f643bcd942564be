//! # Header Settings
//!
//! Text label + logo reference + display size records.
//!
//! ## Current Record
//!
//! The store keeps an explicit pointer to the current record instead of leaving clients to take
//! the last element of the list. It moves in the same store write as the record itself.
//!
//! - Create moves the pointer to the new record, unless an overlapping create already stored a
//!   newer one
//! - Deleting the current record moves it to the newest remaining one, or clears it
//! - A dangling pointer reads as no current record
//!
//! ## Notes
//!
//! - Update never deletes the file a replaced logo pointed at. Superseded files accumulate in the
//!   uploads directory.
use tracing::{debug, info};
use uuid::Uuid;

use crate::{error::AppError, models::HeaderSettings, store::HeaderStore};

pub const TEXT_AND_LOGO_REQUIRED: &str = "Text and logo are required";
pub const HEADER_NOT_FOUND: &str = "Header not found";

/// Everything a create or update may carry. `logo` is already a stored asset URL.
#[derive(Debug, Default, Clone)]
pub struct SettingsInput {
    pub text: Option<String>,
    pub logo: Option<String>,
    pub logo_width: Option<u32>,
    pub logo_height: Option<u32>,
}

impl SettingsInput {
    fn trimmed_text(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }
}

pub async fn create_settings(
    store: &dyn HeaderStore,
    input: SettingsInput,
) -> Result<HeaderSettings, AppError> {
    let (Some(text), Some(logo)) = (input.trimmed_text(), input.logo.clone()) else {
        return Err(AppError::validation(TEXT_AND_LOGO_REQUIRED));
    };

    let mut settings = HeaderSettings::new(text, logo);
    if let Some(width) = input.logo_width {
        settings.logo_width = width;
    }
    if let Some(height) = input.logo_height {
        settings.logo_height = height;
    }

    store
        .insert_settings(&settings)
        .await
        .map_err(AppError::storage("Error creating header"))?;

    info!(id = %settings.id, logo = %settings.logo, "Created header settings");

    Ok(settings)
}

/// Oldest first, so the last element is the newest record.
pub async fn list_settings(store: &dyn HeaderStore) -> Result<Vec<HeaderSettings>, AppError> {
    let mut settings = store
        .list_settings()
        .await
        .map_err(AppError::storage("Error fetching headers"))?;

    settings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    Ok(settings)
}

pub async fn get_settings(store: &dyn HeaderStore, id: Uuid) -> Result<HeaderSettings, AppError> {
    store
        .get_settings(id)
        .await
        .map_err(AppError::storage("Error fetching header"))?
        .ok_or_else(|| AppError::not_found(HEADER_NOT_FOUND))
}

pub async fn current_settings(store: &dyn HeaderStore) -> Result<HeaderSettings, AppError> {
    let id = store
        .current_settings_id()
        .await
        .map_err(AppError::storage("Error fetching header"))?
        .ok_or_else(|| AppError::not_found(HEADER_NOT_FOUND))?;

    get_settings(store, id).await
}

/// Merges supplied fields into the stored record. Empty text is ignored.
pub async fn update_settings(
    store: &dyn HeaderStore,
    id: Uuid,
    input: SettingsInput,
) -> Result<HeaderSettings, AppError> {
    let mut settings = store
        .get_settings(id)
        .await
        .map_err(AppError::storage("Error updating header"))?
        .ok_or_else(|| AppError::not_found(HEADER_NOT_FOUND))?;

    if let Some(text) = input.trimmed_text() {
        settings.text = text;
    }
    if let Some(logo) = input.logo.filter(|logo| !logo.is_empty()) {
        if logo != settings.logo {
            debug!(old = %settings.logo, new = %logo, "Logo replaced, old file kept on disk");
        }
        settings.logo = logo;
    }
    if let Some(width) = input.logo_width {
        settings.logo_width = width;
    }
    if let Some(height) = input.logo_height {
        settings.logo_height = height;
    }

    let replaced = store
        .replace_settings(&settings)
        .await
        .map_err(AppError::storage("Error updating header"))?;

    if !replaced {
        return Err(AppError::not_found(HEADER_NOT_FOUND));
    }

    info!(id = %settings.id, "Updated header settings");

    Ok(settings)
}

pub async fn delete_settings(store: &dyn HeaderStore, id: Uuid) -> Result<(), AppError> {
    store
        .remove_settings(id)
        .await
        .map_err(AppError::storage("Error deleting header"))?
        .ok_or_else(|| AppError::not_found(HEADER_NOT_FOUND))?;

    info!(%id, "Deleted header settings");

    Ok(())
}
