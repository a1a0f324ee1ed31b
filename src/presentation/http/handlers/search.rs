//! Search Handler

use axum::{
    extract::{Query, State},
    Json,
};

use crate::application::dto::request::ListQuery;
use crate::application::dto::response::SearchResponse;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Posts, releases and comments containing `?pattern=`
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let pattern = query.pattern.as_deref().unwrap_or_default();
    let results = state.services.search.search(pattern, query.page()?).await?;
    Ok(Json(results.into()))
}
