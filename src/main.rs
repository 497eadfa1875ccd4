use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;

use cart_service::config::Config;
use cart_service::entities::{seed_demo_users, setup_schema};
use cart_service::middleware::auth::AuthState;
use cart_service::routes::api_router;
use cart_service::service::orders::OrderClient;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();

    let config = Config::from_env().expect("Incomplete configuration");

    let db: DatabaseConnection = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");
    setup_schema(&db).await.expect("Failed to set up schema");
    seed_demo_users(&db).await.expect("Failed to seed users");

    let orders =
        OrderClient::new(&config.order_service_url).expect("Failed to build order client");
    let auth = AuthState {
        jwt_secret: config.jwt_secret.clone(),
    };

    let app = api_router(Arc::new(db), orders, auth);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await.unwrap();
    tracing::info!("Running at {:?}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}
