//! Wire structs for the Bybit V5 order endpoints.

use serde::{Deserialize, Serialize};

/// Body of `POST /v5/order/create`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeOrderRequest {
    pub symbol: String,
    pub side: String,
    #[serde(rename = "orderType")]
    pub order_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub qty: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub price: String,
    #[serde(rename = "timeInForce", default, skip_serializing_if = "String::is_empty")]
    pub time_in_force: String,
    /// Stamped by the client immediately before signing.
    #[serde(default)]
    pub timestamp: i64,
}

/// Body of `POST /v5/order/cancel`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeCancelRequest {
    pub symbol: String,
    #[serde(rename = "orderId", default, skip_serializing_if = "String::is_empty")]
    pub order_id: String,
    #[serde(default)]
    pub timestamp: i64,
}

/// Order payload as Bybit reports it.
///
/// The create endpoint fills only a couple of these fields; the realtime
/// endpoint fills them all. Everything defaults so both decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeOrderResponse {
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "orderId", default)]
    pub order_id: String,
    #[serde(rename = "orderLinkId", default)]
    pub order_link_id: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub qty: String,
    #[serde(rename = "executedQty", default)]
    pub executed_qty: String,
    #[serde(rename = "orderStatus", default)]
    pub status: String,
    #[serde(rename = "timeInForce", default)]
    pub time_in_force: String,
    #[serde(rename = "orderType", default)]
    pub order_type: String,
    #[serde(default)]
    pub side: String,
    #[serde(rename = "createdTime", default)]
    pub created_time: String,
}

/// Envelope of `POST /v5/order/create`.
#[derive(Debug, Deserialize)]
pub(crate) struct CreateEnvelope {
    #[serde(default)]
    pub result: ExchangeOrderResponse,
}

/// Envelope of `GET /v5/order/realtime`.
#[derive(Debug, Deserialize)]
pub(crate) struct RealtimeEnvelope {
    #[serde(default)]
    pub result: RealtimeResult,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RealtimeResult {
    #[serde(default)]
    pub list: Vec<ExchangeOrderResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_order_body_omits_empty_fields() {
        let req = ExchangeOrderRequest {
            symbol: "SOLUSDT".to_string(),
            side: "BUY".to_string(),
            order_type: "MARKET".to_string(),
            qty: "100".to_string(),
            timestamp: 1700000000000,
            ..Default::default()
        };

        let body = serde_json::to_string(&req).unwrap();
        assert!(body.contains("\"orderType\":\"MARKET\""));
        assert!(!body.contains("price"));
        assert!(!body.contains("timeInForce"));
    }

    #[test]
    fn test_create_envelope_decodes_sparse_result() {
        let body = r#"{"retCode":0,"retMsg":"OK","result":{"orderId":"abc-1","orderLinkId":""}}"#;
        let envelope: CreateEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.result.order_id, "abc-1");
        assert!(envelope.result.price.is_empty());
    }

    #[test]
    fn test_realtime_envelope_decodes_list() {
        let body = r#"{"result":{"list":[{"symbol":"SOLUSDT","orderId":"abc-2","orderStatus":"Filled","executedQty":"50"}]}}"#;
        let envelope: RealtimeEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.result.list.len(), 1);
        assert_eq!(envelope.result.list[0].status, "Filled");
        assert_eq!(envelope.result.list[0].executed_qty, "50");
    }

    #[test]
    fn test_realtime_envelope_tolerates_empty_result() {
        let envelope: RealtimeEnvelope = serde_json::from_str(r#"{"result":{}}"#).unwrap();
        assert!(envelope.result.list.is_empty());
    }
}
