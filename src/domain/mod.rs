use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod validate;

pub use validate::ValidationError;

// ============================================================================
// Domain Model - Order Aggregate
// ============================================================================
//
// An Order owns exactly one Delivery, exactly one Payment, and an ordered,
// non-empty list of Items. The aggregate is built from an inbound message,
// validated, persisted once, and never mutated afterwards; later lookups
// return the stored or cached copy unchanged.
//
// Field names double as the JSON wire names. Every field except
// `date_created` falls back to its zero value when missing from the payload,
// so required-field enforcement lives in the validator, not the decoder.
// `date_created` must parse as RFC3339 or decoding fails outright.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub order_uid: String,
    #[serde(default)]
    pub track_number: String,
    #[serde(default)]
    pub entry: String,
    #[serde(default)]
    pub delivery: Delivery,
    #[serde(default)]
    pub payment: Payment,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub internal_signature: String,
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub delivery_service: String,
    #[serde(default)]
    pub shardkey: String,
    #[serde(default)]
    pub sm_id: i64,
    pub date_created: DateTime<Utc>,
    #[serde(default)]
    pub oof_shard: String,
}

/// Recipient details, 1:1 with its Order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

/// Payment details, 1:1 with its Order. `payment_dt` is unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payment {
    pub transaction: String,
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i64,
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

/// One order line. An Order carries at least one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i64,
    pub rid: String,
    pub name: String,
    pub sale: i64,
    pub size: String,
    pub total_price: i64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i64,
}

/// Terminal record of a message that exhausted its retries. Written by the
/// dead-letter consumer, never republished or retried.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetterRecord {
    pub topic: String,
    pub key: String,
    pub value: String,
    pub error_type: String,
    pub error_message: String,
    pub received_at: DateTime<Utc>,
}

/// Fully populated aggregate for tests.
#[cfg(test)]
pub(crate) fn test_order(uid: &str) -> Order {
    Order {
        order_uid: uid.to_string(),
        track_number: "WBILMTESTTRACK".to_string(),
        entry: "WBIL".to_string(),
        delivery: Delivery {
            name: "Test Testov".to_string(),
            phone: "+9720000000".to_string(),
            zip: "2639809".to_string(),
            city: "Kiryat Mozkin".to_string(),
            address: "Ploshad Mira 15".to_string(),
            region: "Kraiot".to_string(),
            email: "test@gmail.com".to_string(),
        },
        payment: Payment {
            transaction: uid.to_string(),
            request_id: String::new(),
            currency: "USD".to_string(),
            provider: "wbpay".to_string(),
            amount: 1817,
            payment_dt: 1637907727,
            bank: "alpha".to_string(),
            delivery_cost: 1500,
            goods_total: 317,
            custom_fee: 0,
        },
        items: vec![Item {
            chrt_id: 9934930,
            track_number: "WBILMTESTTRACK".to_string(),
            price: 453,
            rid: "ab4219087a764ae0btest".to_string(),
            name: "Mascaras".to_string(),
            sale: 30,
            size: "0".to_string(),
            total_price: 317,
            nm_id: 2389212,
            brand: "Vivienne Sabo".to_string(),
            status: 202,
        }],
        locale: "en".to_string(),
        internal_signature: String::new(),
        customer_id: "test".to_string(),
        delivery_service: "meest".to_string(),
        shardkey: "9".to_string(),
        sm_id: 99,
        date_created: "2021-11-26T06:22:19Z".parse().expect("valid timestamp"),
        oof_shard: "1".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIRE_DOC: &str = r#"{
        "order_uid": "b563feb7b2b84b6test",
        "track_number": "WBILMTESTTRACK",
        "entry": "WBIL",
        "delivery": {
            "name": "Test Testov",
            "phone": "+9720000000",
            "zip": "2639809",
            "city": "Kiryat Mozkin",
            "address": "Ploshad Mira 15",
            "region": "Kraiot",
            "email": "test@gmail.com"
        },
        "payment": {
            "transaction": "b563feb7b2b84b6test",
            "request_id": "",
            "currency": "USD",
            "provider": "wbpay",
            "amount": 1817,
            "payment_dt": 1637907727,
            "bank": "alpha",
            "delivery_cost": 1500,
            "goods_total": 317,
            "custom_fee": 0
        },
        "items": [
            {
                "chrt_id": 9934930,
                "track_number": "WBILMTESTTRACK",
                "price": 453,
                "rid": "ab4219087a764ae0btest",
                "name": "Mascaras",
                "sale": 30,
                "size": "0",
                "total_price": 317,
                "nm_id": 2389212,
                "brand": "Vivienne Sabo",
                "status": 202
            }
        ],
        "locale": "en",
        "internal_signature": "",
        "customer_id": "test",
        "delivery_service": "meest",
        "shardkey": "9",
        "sm_id": 99,
        "date_created": "2021-11-26T06:22:19Z",
        "oof_shard": "1"
    }"#;

    #[test]
    fn test_decode_wire_document() {
        let order: Order = serde_json::from_str(WIRE_DOC).unwrap();

        assert_eq!(order.order_uid, "b563feb7b2b84b6test");
        assert_eq!(order.delivery.city, "Kiryat Mozkin");
        assert_eq!(order.payment.amount, 1817);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].chrt_id, 9934930);
        assert_eq!(order.date_created.to_rfc3339(), "2021-11-26T06:22:19+00:00");
    }

    #[test]
    fn test_roundtrip_preserves_document() {
        let order: Order = serde_json::from_str(WIRE_DOC).unwrap();
        let encoded = serde_json::to_vec(&order).unwrap();
        let decoded: Order = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, order);
    }

    #[test]
    fn test_missing_fields_decode_to_defaults() {
        // Required-field enforcement belongs to the validator; the decoder
        // accepts sparse documents the way upstream producers emit them.
        let order: Order = serde_json::from_str(
            r#"{"track_number": "T1", "date_created": "2021-11-26T06:22:19Z"}"#,
        )
        .unwrap();

        assert_eq!(order.order_uid, "");
        assert_eq!(order.track_number, "T1");
        assert!(order.items.is_empty());
        assert_eq!(order.payment, Payment::default());
    }

    #[test]
    fn test_bad_timestamp_fails_decode() {
        let result = serde_json::from_str::<Order>(
            r#"{"order_uid": "A1", "date_created": "yesterday"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_timestamp_fails_decode() {
        assert!(serde_json::from_str::<Order>(r#"{"order_uid": "A1"}"#).is_err());
    }
}
