use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use common_cache::ClearOutcome;

use crate::{
    api::errors::ApiError,
    router::AppState,
    types::{
        CacheStatsResponse, ClearCacheResponse, DataResponse, HealthResponse, WriteResponse,
        REDIS_NOT_CONNECTED,
    },
    users::user_models::{NewUser, UpdateUser, User},
};

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let redis = if state.cache_admin.is_connected() {
        "connected"
    } else {
        "disconnected"
    };

    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        redis,
    })
}

pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<User>>>, ApiError> {
    let (data, source) = state.users.list().await?.into_parts();
    tracing::info!(%source, "Serving user list");
    Ok(Json(DataResponse { data, source }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<User>>, ApiError> {
    let id = parse_user_id(&id)?;
    let (data, source) = state.users.get(id).await?.into_parts();
    tracing::info!(user_id = id, %source, "Serving user");
    Ok(Json(DataResponse { data, source }))
}

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<WriteResponse<User>>), ApiError> {
    let Json(new_user) = payload?;
    let user = state.users.create(new_user).await?;
    Ok((
        StatusCode::CREATED,
        Json(WriteResponse {
            data: user,
            message: "User created successfully",
        }),
    ))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUser>, JsonRejection>,
) -> Result<Json<WriteResponse<User>>, ApiError> {
    let Json(update) = payload?;
    let user = state.users.update(parse_user_id(&id)?, update).await?;
    Ok(Json(WriteResponse {
        data: user,
        message: "User updated successfully",
    }))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WriteResponse<User>>, ApiError> {
    let user = state.users.delete(parse_user_id(&id)?).await?;
    Ok(Json(WriteResponse {
        data: user,
        message: "User deleted successfully",
    }))
}

pub async fn cache_stats(
    State(state): State<AppState>,
) -> Result<Json<CacheStatsResponse>, ApiError> {
    let stats = state.cache_admin.stats().await?;
    Ok(Json(stats.into()))
}

pub async fn clear_cache(
    State(state): State<AppState>,
) -> Result<Json<ClearCacheResponse>, ApiError> {
    let response = match state.cache_admin.clear().await? {
        ClearOutcome::Cleared => {
            tracing::info!("Cache cleared");
            ClearCacheResponse::Cleared {
                message: "Cache cleared successfully",
            }
        }
        ClearOutcome::NotConnected => ClearCacheResponse::NotConnected {
            error: REDIS_NOT_CONNECTED,
        },
    };
    Ok(Json(response))
}

/// Ids that are not numbers cannot exist, so they are reported as not found.
fn parse_user_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse().map_err(|_| ApiError::UserNotFound)
}
