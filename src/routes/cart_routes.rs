use axum::{
    extract::Extension,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::middleware::auth::{auth_middleware, AuthState, Claims};
use crate::service::cart::{self, CartError, ItemSpec};
use crate::service::orders::OrderClient;

//ROUTERS
pub fn cart_routes(auth: AuthState) -> Router {
    Router::new()
        .route("/cart", get(get_cart).post(create_cart))
        .route("/cart/cart-items", patch(add_items))
        .route("/cart/cancel", patch(cancel_cart))
        .route("/cart/checkout", post(checkout_cart))
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
}

//Routes
async fn get_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    match cart::get_cart(&db, &claims.email).await {
        Ok(cart) => (StatusCode::OK, Json(cart)).into_response(),
        Err(err @ (CartError::UserNotFound | CartError::NoActiveCart)) => not_found(err),
        Err(err) => internal_error(err),
    }
}

async fn create_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCartPayload>,
) -> Response {
    if let Err(err) = payload.validate() {
        return bad_payload(err);
    }

    match cart::create_cart(&db, &claims.email, &payload.items).await {
        Ok(cart) => (StatusCode::OK, Json(cart)).into_response(),
        Err(err @ CartError::UserNotFound) => not_found(err),
        Err(err @ CartError::CartAlreadyExists) => bad_request(err),
        Err(err) => internal_error(err),
    }
}

async fn add_items(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<Vec<ItemSpec>>,
) -> Response {
    if let Err(err) = payload.iter().try_for_each(|item| item.validate()) {
        return bad_payload(err);
    }

    match cart::add_items(&db, &claims.email, &payload).await {
        Ok(cart) => (StatusCode::OK, Json(cart)).into_response(),
        Err(err @ (CartError::UserNotFound | CartError::NoActiveCart)) => not_found(err),
        Err(err) => internal_error(err),
    }
}

async fn cancel_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    match cart::cancel_cart(&db, &claims.email).await {
        Ok(cart) => (StatusCode::OK, Json(cart)).into_response(),
        Err(err @ (CartError::UserNotFound | CartError::NoActiveCart)) => not_found(err),
        Err(err) => internal_error(err),
    }
}

async fn checkout_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(orders): Extension<OrderClient>,
    Extension(claims): Extension<Claims>,
) -> Response {
    match cart::checkout_cart(&db, &orders, &claims.email).await {
        Ok(cart) => (StatusCode::OK, Json(cart)).into_response(),
        Err(err @ CartError::UserNotFound) => not_found(err),
        Err(
            err @ (CartError::NoActiveCart | CartError::EmptyCart | CartError::OrderRejected(_)),
        ) => bad_request(err),
        Err(err) => internal_error(err),
    }
}

//Structs
#[derive(Deserialize, Debug, Validate)]
struct CreateCartPayload {
    #[validate(nested)]
    items: Vec<ItemSpec>,
}

//Error -> response mapping, done once here at the boundary.
fn not_found(err: CartError) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": err.to_string()
        })),
    )
        .into_response()
}

fn bad_request(err: CartError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": err.to_string()
        })),
    )
        .into_response()
}

fn bad_payload(err: validator::ValidationErrors) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": err.to_string()
        })),
    )
        .into_response()
}

fn internal_error(err: CartError) -> Response {
    tracing::error!(error = %err, "Request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": err.to_string()
        })),
    )
        .into_response()
}
