use axum::{
    http::{Method, StatusCode},
    routing::get,
    Router,
};
use std::future::ready;

use common_cache::CacheAdmin;
use common_metrics::track_metrics;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::api::endpoints::{
    cache_stats, clear_cache, create_user, delete_user, get_user, health, list_users,
    update_user,
};
use crate::users::user_service::UserService;

#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub cache_admin: CacheAdmin,
}

pub fn router(
    users: UserService,
    cache_admin: CacheAdmin,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let state = AppState { users, cache_admin };

    // Permissive: the API is consumed straight from browsers on other origins.
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .allow_origin(AllowOrigin::mirror_request());

    let status_router = Router::new()
        .route("/_readiness", get(|| ready(StatusCode::OK)))
        .route("/health", get(health));

    let users_router = Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        );

    let cache_router = Router::new()
        .route("/api/cache/stats", get(cache_stats))
        .route("/api/cache", axum::routing::delete(clear_cache));

    let router = Router::new()
        .merge(status_router)
        .merge(users_router)
        .merge(cache_router)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(track_metrics))
        .layer(cors)
        .with_state(state);

    match metrics {
        Some(recorder_handle) => {
            router.route("/metrics", get(move || ready(recorder_handle.render())))
        }
        None => router,
    }
}
