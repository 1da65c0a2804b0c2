use axum::{
    extract::{Query, State},
    Extension, Json,
};

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::entry::{GratitudeEntry, MonthQuery};
use crate::report::{self, MonthlyReport};
use crate::AppState;

pub async fn monthly_report(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<MonthlyReport>> {
    if !(1..=12).contains(&query.month) {
        return Err(AppError::Validation("Month must be between 1 and 12".into()));
    }

    let store = state.stores.store_for(auth_user.id).await;
    let mut store = store.lock().await;
    if !store.is_loaded() {
        store.fetch_all().await?;
    }

    let entries: Vec<GratitudeEntry> = store
        .by_month(query.year, query.month)
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(report::monthly(&entries, query.year, query.month)))
}
