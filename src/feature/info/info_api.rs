//! APIs for getting information about the application.

use crate::infra::{extract::Json, state::AppState};
use axum::{routing::get, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The info API endpoints.
pub fn routes() -> Router<AppState> {
    Router::new().route("/info", get(info))
}

/// Application information.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AppInfo {
    /// The application name.
    pub name: String,
    /// The application version.
    pub version: String,
}

/// Returns application information.
#[utoipa::path(
    get,
    path = "/v1/info",
    responses(
        (status = 200, description = "Success", body = AppInfo),
    )
)]
pub async fn info() -> Json<AppInfo> {
    Json(AppInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_crate_name() {
        let Json(info) = info().await;
        assert_eq!("item-catalog", info.name);
    }
}
