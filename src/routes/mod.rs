pub mod cart_routes;

use axum::{http::Method, middleware, Extension, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::middleware::auth::AuthState;
use crate::middleware::logging::logging_middleware;
use crate::service::orders::OrderClient;

use cart_routes::cart_routes;

pub fn api_router(db: Arc<DatabaseConnection>, orders: OrderClient, auth: AuthState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1", cart_routes(auth))
        .layer(Extension(db))
        .layer(Extension(orders))
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors)
}
