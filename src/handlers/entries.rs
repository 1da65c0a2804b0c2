use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::NaiveDate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::entry::{GratitudeEntry, NewEntry, NewItem, SaveEntryRequest};
use crate::services::summary;
use crate::AppState;

pub async fn list_entries(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<GratitudeEntry>>> {
    let store = state.stores.store_for(auth_user.id).await;
    let mut store = store.lock().await;
    if !store.is_loaded() {
        store.fetch_all().await?;
    }

    Ok(Json(store.entries().into_iter().cloned().collect()))
}

pub async fn save_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<SaveEntryRequest>,
) -> AppResult<Json<GratitudeEntry>> {
    // Trimmed-empty items are dropped; at least one must remain.
    let items: Vec<NewItem> = body
        .items
        .into_iter()
        .map(|item| NewItem {
            title: item.title.trim().to_string(),
            content: item.content.trim().to_string(),
        })
        .filter(|item| !item.content.is_empty())
        .collect();

    if items.is_empty() {
        return Err(AppError::Validation(
            "At least one gratitude item is required".into(),
        ));
    }

    // The one-line summary comes from the client when it already has one;
    // otherwise the generation service is asked before anything is persisted.
    // A failed generation blocks the save.
    let summary = match body.summary.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => summary::generate_summary(&state.config, body.emotion, &items)
            .await
            .map_err(|e| AppError::SummaryGeneration(e.to_string()))?,
    };

    let store = state.stores.store_for(auth_user.id).await;
    let mut store = store.lock().await;
    if !store.is_loaded() {
        store.fetch_all().await?;
    }

    let entry = store
        .save(NewEntry {
            entry_date: body.entry_date,
            emotion: body.emotion,
            summary,
            items,
        })
        .await?;

    Ok(Json(entry))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(date): Path<NaiveDate>,
) -> AppResult<Json<GratitudeEntry>> {
    let store = state.stores.store_for(auth_user.id).await;
    let mut store = store.lock().await;
    if !store.is_loaded() {
        store.fetch_all().await?;
    }

    store
        .by_date(date)
        .cloned()
        .map(Json)
        .ok_or(AppError::NotFound("No entry for that date".into()))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(date): Path<NaiveDate>,
) -> AppResult<Json<serde_json::Value>> {
    let store = state.stores.store_for(auth_user.id).await;
    let mut store = store.lock().await;

    // Idempotent: deleting a date with no entry still reports success.
    store.remove(date).await?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}
