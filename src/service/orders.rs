use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Order service rejected the order: {status} - {message}")]
    Rejected { status: StatusCode, message: String },
}

//Client for the downstream order service. Checkout hands it the cart
//contents and fails if the order is not accepted.
#[derive(Clone)]
pub struct OrderClient {
    client: reqwest::Client,
    base_url: String,
}

impl OrderClient {
    pub fn new(base_url: &str) -> Result<Self, OrderError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub async fn submit_order(&self, order: &OrderRequest) -> Result<(), OrderError> {
        let url = format!("{}/orders", self.base_url);

        let response = self.client.post(&url).json(order).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OrderError::Rejected { status, message });
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub user_id: i32,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: f64,
}
