//! Signed HTTP client for the Bybit V5 order endpoints.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use tracing::{debug, error};

use crate::error::{ExchangeError, ExchangeResult};
use crate::types::{
    CreateEnvelope, ExchangeCancelRequest, ExchangeOrderRequest, ExchangeOrderResponse,
    RealtimeEnvelope,
};
use crate::ExchangeApi;

const MAINNET_URL: &str = "https://api.bybit.com";
const TESTNET_URL: &str = "https://api-testnet.bybit.com";

const CREATE_ENDPOINT: &str = "/v5/order/create";
const CANCEL_ENDPOINT: &str = "/v5/order/cancel";
const REALTIME_ENDPOINT: &str = "/v5/order/realtime";

const HEADER_API_KEY: &str = "X-BAPI-API-KEY";
const HEADER_SIGN: &str = "X-BAPI-SIGN";
const HEADER_TIMESTAMP: &str = "X-BAPI-TIMESTAMP";
const HEADER_RECV_WINDOW: &str = "X-BAPI-RECV-WINDOW";

const RECV_WINDOW_MS: &str = "5000";

/// Per-call timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated Bybit V5 REST client.
pub struct BybitClient {
    api_key: String,
    api_secret: String,
    testnet: bool,
    http: Client,
}

impl BybitClient {
    /// Create a client against mainnet or testnet.
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        testnet: bool,
    ) -> ExchangeResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ExchangeError::HttpClient(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            testnet,
            http,
        })
    }

    fn base_url(&self) -> &'static str {
        if self.testnet {
            TESTNET_URL
        } else {
            MAINNET_URL
        }
    }

    /// HMAC-SHA256 of `timestamp + api_key + payload`, hex-encoded.
    fn sign(&self, timestamp: i64, payload: &str) -> String {
        let mut mac = match Hmac::<Sha256>::new_from_slice(self.api_secret.as_bytes()) {
            Ok(mac) => mac,
            Err(e) => {
                error!(error = %e, "HMAC key initialization failed, request will be rejected");
                return String::new();
            }
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(self.api_key.as_bytes());
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    async fn post_signed(&self, endpoint: &str, body: String) -> ExchangeResult<reqwest::Response> {
        let timestamp = timestamp_ms();
        let signature = self.sign(timestamp, &body);

        self.http
            .post(format!("{}{}", self.base_url(), endpoint))
            .header(HEADER_API_KEY, &self.api_key)
            .header(HEADER_SIGN, signature)
            .header(HEADER_TIMESTAMP, timestamp.to_string())
            .header(HEADER_RECV_WINDOW, RECV_WINDOW_MS)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))
    }

    async fn check_status(resp: reqwest::Response) -> ExchangeResult<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExchangeError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl ExchangeApi for BybitClient {
    async fn execute_order(
        &self,
        mut req: ExchangeOrderRequest,
    ) -> ExchangeResult<ExchangeOrderResponse> {
        req.timestamp = timestamp_ms();

        let body = serde_json::to_string(&req)
            .map_err(|e| ExchangeError::Decode(format!("failed to encode order request: {e}")))?;

        debug!(symbol = %req.symbol, side = %req.side, order_type = %req.order_type, "Submitting order");

        let resp = self.post_signed(CREATE_ENDPOINT, body).await?;
        let resp = Self::check_status(resp).await?;

        let envelope: CreateEnvelope = resp
            .json()
            .await
            .map_err(|e| ExchangeError::Decode(e.to_string()))?;
        Ok(envelope.result)
    }

    async fn terminate_order(&self, mut req: ExchangeCancelRequest) -> ExchangeResult<()> {
        req.timestamp = timestamp_ms();

        let body = serde_json::to_string(&req)
            .map_err(|e| ExchangeError::Decode(format!("failed to encode cancel request: {e}")))?;

        debug!(symbol = %req.symbol, order_id = %req.order_id, "Cancelling order");

        let resp = self.post_signed(CANCEL_ENDPOINT, body).await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn fetch_order_info(
        &self,
        symbol: &str,
        order_id: &str,
    ) -> ExchangeResult<ExchangeOrderResponse> {
        let timestamp = timestamp_ms();
        let query = realtime_query(symbol, order_id, timestamp);
        let signature = self.sign(timestamp, &query);

        let resp = self
            .http
            .get(format!("{}{}?{}", self.base_url(), REALTIME_ENDPOINT, query))
            .header(HEADER_API_KEY, &self.api_key)
            .header(HEADER_SIGN, signature)
            .header(HEADER_TIMESTAMP, timestamp.to_string())
            .header(HEADER_RECV_WINDOW, RECV_WINDOW_MS)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        let resp = Self::check_status(resp).await?;

        let envelope: RealtimeEnvelope = resp
            .json()
            .await
            .map_err(|e| ExchangeError::Decode(e.to_string()))?;

        envelope
            .result
            .list
            .into_iter()
            .next()
            .ok_or(ExchangeError::OrderNotFound)
    }
}

/// Canonical query string for the realtime endpoint.
///
/// Keys in lexicographic order, values percent-encoded; the exact string
/// is both signed and sent, so the two can never disagree.
fn realtime_query(symbol: &str, order_id: &str, timestamp: i64) -> String {
    format!(
        "orderId={}&symbol={}&timestamp={}",
        urlencoding::encode(order_id),
        urlencoding::encode(symbol),
        timestamp
    )
}

fn timestamp_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
