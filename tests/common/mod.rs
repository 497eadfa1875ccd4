use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};
use std::sync::{Arc, Mutex};

use cart_service::entities::{setup_schema, user};
use cart_service::middleware::auth::{generate_token, AuthState};
use cart_service::routes::api_router;
use cart_service::service::orders::OrderClient;

const TEST_SECRET: &str = "test-secret";

//Stand-in for the downstream order service: records every payload it
//receives and optionally rejects them.
#[derive(Clone, Default)]
pub struct OrderStub {
    pub received: Arc<Mutex<Vec<serde_json::Value>>>,
    pub fail: bool,
}

async fn record_order(
    State(stub): State<OrderStub>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    stub.received.lock().unwrap().push(body);
    if stub.fail {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    }
}

pub struct TestApp {
    pub base: String,
    pub db: DatabaseConnection,
    pub client: reqwest::Client,
    pub orders: OrderStub,
}

impl TestApp {
    pub async fn seed_user(&self, email: &str) -> i32 {
        let user = user::ActiveModel {
            email: Set(email.to_owned()),
            ..Default::default()
        };
        user::Entity::insert(user)
            .exec(&self.db)
            .await
            .expect("Failed to insert user")
            .last_insert_id
    }

    pub fn token_for(&self, email: &str) -> String {
        generate_token(TEST_SECRET, email).expect("Failed to generate token")
    }

    pub fn order_count(&self) -> usize {
        self.orders.received.lock().unwrap().len()
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_orders(false).await
}

pub async fn spawn_app_with_failing_orders() -> TestApp {
    spawn_app_with_orders(true).await
}

async fn spawn_app_with_orders(fail: bool) -> TestApp {
    let stub = OrderStub {
        fail,
        ..Default::default()
    };
    let order_service = Router::new()
        .route("/orders", post(record_order))
        .with_state(stub.clone());
    let order_listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind order stub");
    let order_url = format!("http://{}", order_listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(order_listener, order_service).await.unwrap();
    });

    //Single connection so every request sees the same in-memory database.
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options.max_connections(1).min_connections(1);
    let db = Database::connect(options)
        .await
        .expect("Failed to open database");
    setup_schema(&db).await.expect("Failed to set up schema");

    let orders = OrderClient::new(&order_url).expect("Failed to build order client");
    let auth = AuthState {
        jwt_secret: TEST_SECRET.to_owned(),
    };
    let app = api_router(Arc::new(db.clone()), orders, auth);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind app");
    let base = format!("http://{}/api/v1", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        base,
        db,
        client: reqwest::Client::new(),
        orders: stub,
    }
}
