//! Request handlers for `/api/v1`.

use axum::extract::{Query, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use wxrelay_core::AppError;
use wxrelay_stats::{StatsRequest, StatsReport, VALID_QUERY_PARAMETERS};
use wxrelay_store::AccountRow;
use wxrelay_weather::{normalize_city_name, WeatherSummary};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CityQuery {
    #[serde(default)]
    pub city: String,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct BookmarkRequest {
    pub username: String,
    #[serde(default)]
    pub locations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub name: String,
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub name: String,
    pub id: i64,
    pub bookmark_collection_id: i64,
    pub bookmarked_location_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BookmarksResponse {
    pub bookmarks: Vec<String>,
}

pub async fn status() -> Json<serde_json::Value> {
    Json(json!({ "message": "ok" }))
}

pub async fn location_weather(
    State(state): State<AppState>,
    Query(query): Query<CityQuery>,
) -> Result<Json<WeatherSummary>, ApiError> {
    let summary = state.weather.get_weather(&query.city).await?;
    Ok(Json(summary))
}

pub async fn weather_stats(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Response, ApiError> {
    let raw = raw.unwrap_or_default();
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect();

    if pairs.is_empty() {
        let doc = json!({ "valid_query_parameters": VALID_QUERY_PARAMETERS });
        return Ok((StatusCode::ACCEPTED, Json(doc)).into_response());
    }

    let request = StatsRequest::from_pairs(pairs)?;
    let report: StatsReport = state.stats.report(request).await?;
    Ok(Json(report).into_response())
}

pub async fn get_account(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = existing_account(&state, &query.username).await?;
    Ok(Json(AccountResponse {
        name: account.name,
        id: account.id,
    }))
}

pub async fn register_account(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::invalid_request("a username is required").into());
    }

    let (account, bookmarks) = state
        .with_store(move |store| store.register_account(&username))
        .await?;

    tracing::info!("Registered account {} ({})", account.name, account.id);

    Ok(Json(RegisterResponse {
        name: account.name,
        id: account.id,
        bookmark_collection_id: bookmarks.id,
        bookmarked_location_ids: bookmarks.location_ids,
    }))
}

pub async fn get_bookmarks(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<BookmarksResponse>, ApiError> {
    let account = existing_account(&state, &query.username).await?;
    let account_id = account.id;

    let names = state
        .with_store(move |store| {
            store
                .bookmarks(account_id)?
                .map(|collection| store.location_names_by_ids(&collection.location_ids))
                .transpose()
        })
        .await?
        .ok_or_else(|| no_collection(account_id))?;

    Ok(Json(BookmarksResponse { bookmarks: names }))
}

pub async fn add_bookmarks(
    State(state): State<AppState>,
    Json(payload): Json<BookmarkRequest>,
) -> Result<Json<BookmarksResponse>, ApiError> {
    let account = existing_account(&state, &payload.username).await?;
    let account_id = account.id;
    let names: Vec<String> = payload
        .locations
        .iter()
        .map(|name| normalize_city_name(name))
        .filter(|name| !name.is_empty())
        .collect();

    let updated = state
        .with_store(move |store| {
            let ids = store.location_ids_by_names(&names)?;
            store
                .append_bookmarks(account_id, &ids)?
                .map(|collection| store.location_names_by_ids(&collection.location_ids))
                .transpose()
        })
        .await?
        .ok_or_else(|| no_collection(account_id))?;

    Ok(Json(BookmarksResponse { bookmarks: updated }))
}

async fn existing_account(state: &AppState, username: &str) -> Result<AccountRow, AppError> {
    let lookup = username.trim().to_string();
    let found = state
        .with_store(move |store| store.find_account(&lookup))
        .await?;

    found.ok_or_else(|| {
        AppError::not_found(format!("no account found with that username: {}", username))
    })
}

fn no_collection(account_id: i64) -> AppError {
    AppError::not_found(format!(
        "no bookmark collection associated with that id: {}",
        account_id
    ))
}
