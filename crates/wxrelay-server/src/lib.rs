//! HTTP surface for wxrelay.
//!
//! All routes live under `/api/v1`. Handlers are thin: they parse the
//! request, call the weather, stats or account layer and map `AppError`
//! onto a status code.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/status", get(routes::status))
        .route("/location/weather", get(routes::location_weather))
        .route("/location/weather/stats", get(routes::weather_stats))
        .route("/account/user", get(routes::get_account))
        .route(
            "/account/user/register",
            axum::routing::post(routes::register_account),
        )
        .route(
            "/account/user/bookmark",
            get(routes::get_bookmarks).post(routes::add_bookmarks),
        );

    Router::new().nest("/api/v1", api).with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
