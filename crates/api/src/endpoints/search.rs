//! Search endpoints.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;
use vidtube_common::AppResult;
use vidtube_core::{SearchKind, SearchQuery, SearchResults, SearchSort, UploadWindow};

use crate::{extractors::Pagination, middleware::AppState, response::ApiResponse};

/// Search query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default, rename = "type")]
    pub kind: SearchKind,
    pub category: Option<String>,
    pub upload_date: Option<UploadWindow>,
    #[serde(default)]
    pub sort_by: SearchSort,
}

/// Suggestion query parameters.
#[derive(Debug, Deserialize)]
pub struct SuggestionParams {
    #[serde(default)]
    pub q: String,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
    Query(page): Query<Pagination>,
) -> AppResult<ApiResponse<SearchResults>> {
    let query = SearchQuery {
        q: params.q,
        kind: params.kind,
        category: params.category,
        upload_date: params.upload_date,
        sort: params.sort_by,
    };
    let results = state
        .search_service
        .search(query, page.limit(), page.offset())
        .await?;
    Ok(ApiResponse::ok(results))
}

async fn suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestionParams>,
) -> AppResult<ApiResponse<Vec<String>>> {
    let suggestions = state.search_service.suggestions(&params.q).await?;
    Ok(ApiResponse::ok(suggestions))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search))
        .route("/suggestions", get(suggestions))
}
