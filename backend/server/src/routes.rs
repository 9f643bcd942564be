use std::sync::Arc;

use axum::{
    Json,
    extract::{
        self, Multipart, OriginalUri, Path, multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::{Method, StatusCode},
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::json;

use crate::{
    error::AppError,
    header::{self, ITEM_NOT_FOUND},
    logo,
    models::NavigationItemPayload,
    settings::{self, HEADER_NOT_FOUND, SettingsInput, TEXT_AND_LOGO_REQUIRED},
    state::State,
    uploads::{ImagePolicy, StoredAsset, Uploads},
    utils::{json_payload, parse_id, positive_dimension, read_upload_form},
};

type AppState = extract::State<Arc<State>>;

#[derive(Serialize)]
struct Success<T> {
    success: bool,
    data: T,
}

fn success<T: Serialize>(data: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        data,
    })
}

/// Drops a freshly stored upload when the write that should reference it failed.
async fn discard_on_error<T>(
    uploads: &Uploads,
    asset: Option<&StoredAsset>,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    if result.is_err() {
        if let Some(asset) = asset {
            uploads.remove_quietly(&asset.url()).await;
        }
    }

    result
}

pub async fn root_handler() -> &'static str {
    "Site header backend API"
}

pub async fn not_found_handler(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::not_found(format!("Route not found: {uri}"))
}

pub async fn method_not_allowed_handler(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::MethodNotAllowed(format!("Method {method} not allowed on {}", uri.path()))
}

pub async fn list_items_handler(extract::State(state): AppState) -> Result<impl IntoResponse, AppError> {
    let items = header::list_items(state.store.as_ref()).await?;

    Ok(Json(items))
}

pub async fn create_item_handler(
    extract::State(state): AppState,
    payload: Result<Json<NavigationItemPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let payload = json_payload(payload)?;

    #[cfg(feature = "verbose")]
    tracing::info!(?payload, "Create header item");

    let item = header::create_item(state.store.as_ref(), payload).await?;

    Ok((StatusCode::CREATED, success(item)))
}

pub async fn update_item_handler(
    extract::State(state): AppState,
    Path(id): Path<String>,
    payload: Result<Json<NavigationItemPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let payload = json_payload(payload)?;

    #[cfg(feature = "verbose")]
    tracing::info!(%id, ?payload, "Update header item");

    // Missing text/link wins over an unknown id.
    header::required_fields(&payload)?;
    let id = parse_id(&id, ITEM_NOT_FOUND)?;

    let item = header::update_item(state.store.as_ref(), id, payload).await?;

    Ok(success(item))
}

pub async fn delete_item_handler(
    extract::State(state): AppState,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, ITEM_NOT_FOUND)?;

    header::delete_item(state.store.as_ref(), id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Header item deleted successfully",
    })))
}

pub async fn get_logo_handler(extract::State(state): AppState) -> Result<impl IntoResponse, AppError> {
    let logo = logo::get_logo(state.store.as_ref()).await?;

    Ok(success(logo))
}

pub async fn update_logo_handler(
    extract::State(state): AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let form = read_upload_form(multipart, "logo", &ImagePolicy::LOGO).await?;
    let Some(file) = form.file.as_ref() else {
        return Err(AppError::validation("No file uploaded"));
    };

    let asset = state.uploads.save(file).await?;
    let result = logo::replace_logo(
        state.store.as_ref(),
        &state.uploads,
        &asset,
        form.text("alt"),
    )
    .await;
    let logo = discard_on_error(&state.uploads, Some(&asset), result).await?;

    Ok(success(logo))
}

pub async fn create_settings_handler(
    extract::State(state): AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let form = read_upload_form(multipart, "logo", &ImagePolicy::SETTINGS).await?;

    #[cfg(feature = "verbose")]
    tracing::info!(fields = ?form.fields, has_file = form.file.is_some(), "Create header settings");

    let has_text = form.text("text").is_some_and(|text| !text.trim().is_empty());
    let Some(file) = form.file.as_ref().filter(|_| has_text) else {
        return Err(AppError::validation(TEXT_AND_LOGO_REQUIRED));
    };

    let logo_width = positive_dimension(&form, "logoWidth")?;
    let logo_height = positive_dimension(&form, "logoHeight")?;

    let asset = state.uploads.save(file).await?;
    let input = SettingsInput {
        text: form.text("text").map(str::to_string),
        logo: Some(asset.url()),
        logo_width,
        logo_height,
    };
    let result = settings::create_settings(state.store.as_ref(), input).await;
    let created = discard_on_error(&state.uploads, Some(&asset), result).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_settings_handler(
    extract::State(state): AppState,
) -> Result<impl IntoResponse, AppError> {
    let all = settings::list_settings(state.store.as_ref()).await?;

    Ok(Json(all))
}

pub async fn current_settings_handler(
    extract::State(state): AppState,
) -> Result<impl IntoResponse, AppError> {
    let current = settings::current_settings(state.store.as_ref()).await?;

    Ok(Json(current))
}

pub async fn get_settings_handler(
    extract::State(state): AppState,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, HEADER_NOT_FOUND)?;
    let found = settings::get_settings(state.store.as_ref(), id).await?;

    Ok(Json(found))
}

pub async fn update_settings_handler(
    extract::State(state): AppState,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, HEADER_NOT_FOUND)?;
    let form = read_upload_form(multipart, "logo", &ImagePolicy::SETTINGS).await?;

    #[cfg(feature = "verbose")]
    tracing::info!(%id, fields = ?form.fields, has_file = form.file.is_some(), "Update header settings");

    let logo_width = positive_dimension(&form, "logoWidth")?;
    let logo_height = positive_dimension(&form, "logoHeight")?;

    // Nothing is written to disk for a record that does not exist.
    settings::get_settings(state.store.as_ref(), id).await?;

    let asset = match form.file.as_ref() {
        Some(file) => Some(state.uploads.save(file).await?),
        None => None,
    };
    let input = SettingsInput {
        text: form.text("text").map(str::to_string),
        logo: asset
            .as_ref()
            .map(StoredAsset::url)
            .or_else(|| form.text("logo").map(str::to_string)),
        logo_width,
        logo_height,
    };
    let result = settings::update_settings(state.store.as_ref(), id, input).await;
    let updated = discard_on_error(&state.uploads, asset.as_ref(), result).await?;

    Ok(Json(updated))
}

pub async fn delete_settings_handler(
    extract::State(state): AppState,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, HEADER_NOT_FOUND)?;

    settings::delete_settings(state.store.as_ref(), id).await?;

    Ok(Json(json!({ "message": "Header deleted successfully" })))
}
