//! HTTP server assembly and lifecycle.
//!
//! # Examples
//!
//! Serving a router until a signal completes.
//!
//! ```rust
//! # tokio_test::block_on(async {
//! use axum::{routing::get, Router};
//! use std::time::Duration;
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
//! let app = Router::new().route("/", get(|| async { "Hello, World!" }));
//! let result = item_catalog::server::serve(listener, app, Duration::from_secs(5), async {}).await;
//! assert!(result.is_ok());
//! # });
//! ```

use crate::infra::{
    config::ServerConfig,
    error::{ApiError, ClientError, InternalError, PanicHandler},
    middleware::MakeRequestIdSpan,
    openapi::ApiDoc,
    shutdown::shutdown_signal,
    state::AppState,
};
use axum::{error_handling::HandleErrorLayer, response::IntoResponse, BoxError, Router};
use http::header::AUTHORIZATION;
use std::{future::Future, future::IntoFuture, iter, sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::Notify};
use tower::{limit::GlobalConcurrencyLimitLayer, ServiceBuilder};
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Maps failures of fallible tower middleware to error responses.
async fn handle_middleware_error(e: BoxError) -> axum::response::Response {
    if e.is::<tower::timeout::error::Elapsed>() {
        ApiError::from(ClientError::RequestTimeout).into_response()
    } else {
        ApiError::from(InternalError::Other(format!("Tower middleware failed: {e}")))
            .into_response()
    }
}

/// Constructs the full axum application.
pub fn app(state: AppState, config: &ServerConfig) -> Router {
    let router = Router::new()
        .merge(SwaggerUi::new("/api/swagger-ui").url("/api/openapi.json", ApiDoc::openapi()))
        .nest("/v1", crate::feature::api(state))
        .fallback(|| async { ClientError::NotFound("no such route".to_string()) });
    with_middleware(router, config)
}

/// Wraps every route of `router` in the shared middleware stack.
fn with_middleware(router: Router, config: &ServerConfig) -> Router {
    // Fallible middleware from tower, mapped to infallible response with [`HandleErrorLayer`].
    // The global limit shares one semaphore between the per-route copies of the layer.
    let tower_middleware = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_middleware_error))
        .layer(GlobalConcurrencyLimitLayer::new(config.concurrency_limit))
        .timeout(config.request_timeout);

    router
        .layer(axum::middleware::from_fn(
            crate::infra::middleware::log_request_response,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(MakeRequestIdSpan)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(()),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(SetSensitiveRequestHeadersLayer::new(iter::once(
            AUTHORIZATION,
        )))
        .layer(tower_middleware)
        .layer(CatchPanicLayer::custom(PanicHandler))
}

/// Serves `app` until `signal` completes, then lets in-flight requests
/// drain for at most `grace` before dropping them.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    grace: Duration,
    signal: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!("Starting axum on {}", listener.local_addr()?);

    let draining = Arc::new(Notify::new());
    let shutdown = {
        let draining = draining.clone();
        async move {
            signal.await;
            tracing::info!("Shutting down, draining in-flight requests");
            draining.notify_one();
        }
    };
    let server = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .into_future();
    let deadline = async {
        draining.notified().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result?;
            tracing::info!("Successfully shut down");
        }
        _ = deadline => {
            tracing::warn!("Requests still running after {:?}, forcing shutdown", grace);
        }
    }
    Ok(())
}

/// Starts the axum server and runs it until a termination signal.
pub async fn run_app(
    listener: TcpListener,
    state: AppState,
    config: &ServerConfig,
) -> std::io::Result<()> {
    let app = app(state, config);
    serve(listener, app, config.shutdown_grace_period, shutdown_signal()).await
}
