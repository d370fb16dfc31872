use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use common::config::Credentials;
use common::{Error, ExchangeClient, Fill, Order, Result};

use super::public::{parse_decimal, PublicClient};
use super::unwrap_envelope;

pub const PRIVATE_BASE_URL: &str = "https://api.bitbank.cc";

/// Authenticated REST client for bitbank. Used for balance queries and
/// market orders; prices come from the public ticker.
pub struct BitbankClient {
    credentials: Credentials,
    base_url: String,
    http: Client,
    public: PublicClient,
    /// Last nonce sent; bitbank rejects nonces that do not increase.
    last_nonce: AtomicU64,
}

impl BitbankClient {
    pub fn new(credentials: Credentials, public: PublicClient) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self::with_client(credentials, PRIVATE_BASE_URL, http, public))
    }

    pub fn with_client(
        credentials: Credentials,
        base_url: impl Into<String>,
        http: Client,
        public: PublicClient,
    ) -> Self {
        Self {
            credentials,
            base_url: base_url.into(),
            http,
            public,
            last_nonce: AtomicU64::new(0),
        }
    }

    /// Millisecond timestamp, bumped past the previous nonce when two
    /// requests land in the same millisecond.
    fn nonce(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        next_nonce(&self.last_nonce, now).to_string()
    }

    fn authorize(&self, request: RequestBuilder, nonce: &str, message: &str) -> RequestBuilder {
        request
            .header("ACCESS-KEY", &self.credentials.api_key)
            .header("ACCESS-NONCE", nonce)
            .header("ACCESS-SIGNATURE", sign(&self.credentials.api_secret, message))
    }

    async fn signed_get(&self, path: &str) -> Result<String> {
        let nonce = self.nonce();
        let url = format!("{}{path}", self.base_url);
        let request = self.authorize(self.http.get(&url), &nonce, &format!("{nonce}{path}"));
        send(request).await
    }

    async fn signed_post(&self, path: &str, body: String) -> Result<String> {
        let nonce = self.nonce();
        let url = format!("{}{path}", self.base_url);
        let message = format!("{nonce}{body}");
        let request = self
            .authorize(self.http.post(&url), &nonce, &message)
            .header("Content-Type", "application/json")
            .body(body);
        send(request).await
    }
}

fn next_nonce(last: &AtomicU64, now_ms: u64) -> u64 {
    let mut prev = last.load(Ordering::Relaxed);
    loop {
        let next = now_ms.max(prev + 1);
        match last.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}

/// Hex HMAC-SHA256 of `message` keyed with the API secret.
pub fn sign(secret: &str, message: &str) -> String {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Base-asset amount as bitbank expects it: at most 8 decimals, no
/// trailing zeros.
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{amount:.8}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

async fn send(request: RequestBuilder) -> Result<String> {
    let resp = request.send().await.map_err(|e| Error::Http(e.to_string()))?;
    let status = resp.status();
    let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
    if !status.is_success() && !body.contains("\"success\"") {
        return Err(Error::Exchange(format!("HTTP {status}: {body}")));
    }
    Ok(body)
}

#[async_trait]
impl ExchangeClient for BitbankClient {
    async fn submit_order(&self, order: &Order) -> Result<Fill> {
        let request = OrderRequest {
            pair: &order.pair,
            amount: format_amount(order.amount),
            side: order.side.as_api_str(),
            order_type: "market",
        };
        let body = serde_json::to_string(&request)?;

        debug!(pair = %order.pair, side = %order.side, amount = %request.amount, "Submitting order to bitbank");
        let text = self.signed_post("/v1/user/spot/order", body).await?;
        let resp: OrderResponse = unwrap_envelope(&text)?;

        let price = resp
            .average_price
            .as_deref()
            .and_then(|p| p.parse::<f64>().ok())
            .filter(|p| *p > 0.0);

        Ok(Fill {
            order_id: resp.order_id.to_string(),
            pair: order.pair.clone(),
            side: order.side,
            price,
            amount: order.amount,
            timestamp: Utc::now(),
        })
    }

    async fn free_balance(&self, asset: &str) -> Result<f64> {
        let text = self.signed_get("/v1/user/assets").await?;
        let assets: AssetsResponse = unwrap_envelope(&text)?;
        match assets.assets.iter().find(|a| a.asset == asset) {
            Some(a) => parse_decimal("free_amount", &a.free_amount),
            None => Ok(0.0),
        }
    }

    async fn current_price(&self, pair: &str) -> Result<f64> {
        self.public.ticker(pair).await
    }
}

// ─── Request / response types ─────────────────────────────────────────────────

#[derive(Serialize)]
struct OrderRequest<'a> {
    pair: &'a str,
    amount: String,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
}

#[derive(Deserialize)]
struct OrderResponse {
    order_id: u64,
    #[serde(default)]
    average_price: Option<String>,
}

#[derive(Deserialize)]
struct AssetsResponse {
    assets: Vec<Asset>,
}

#[derive(Deserialize)]
struct Asset {
    asset: String,
    free_amount: String,
}
