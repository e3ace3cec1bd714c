//! Synthetic order producer for local runs: emits one valid order document
//! to the main topic per interval until interrupted.

use chrono::Utc;
use rdkafka::message::OwnedHeaders;
use uuid::Uuid;

use orderstream::config::Config;
use orderstream::domain::{Delivery, Item, Order, Payment};
use orderstream::messaging::{KafkaPublisher, MessagePublisher};

fn sample_order(sequence: u64) -> Order {
    let order_uid = Uuid::new_v4().simple().to_string();
    let track_number = format!("TRACK{}", &order_uid[..8].to_uppercase());
    let now = Utc::now();

    Order {
        order_uid: order_uid.clone(),
        track_number: track_number.clone(),
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
            transaction: order_uid.clone(),
            request_id: String::new(),
            currency: "USD".to_string(),
            provider: "wbpay".to_string(),
            amount: 1817,
            payment_dt: now.timestamp(),
            bank: "alpha".to_string(),
            delivery_cost: 1500,
            goods_total: 317,
            custom_fee: 0,
        },
        items: vec![Item {
            chrt_id: 9_000_000 + sequence as i64,
            track_number,
            price: 453,
            rid: format!("{order_uid}-rid"),
            name: "Mascaras".to_string(),
            sale: 30,
            size: "0".to_string(),
            total_price: 317,
            nm_id: 2_389_212,
            brand: "Vivienne Sabo".to_string(),
            status: 202,
        }],
        locale: "en".to_string(),
        internal_signature: String::new(),
        customer_id: format!("customer_{}", &order_uid[..8]),
        delivery_service: "meest".to_string(),
        shardkey: "9".to_string(),
        sm_id: 99,
        date_created: now,
        oof_shard: "1".to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let publisher = KafkaPublisher::new(&config.kafka_brokers)?;

    tracing::info!(
        brokers = %config.kafka_brokers,
        topic = %config.kafka_topic,
        interval_ms = config.producer_interval.as_millis() as u64,
        "🛒 Order producer started"
    );

    let mut ticker = tokio::time::interval(config.producer_interval);
    let mut produced: u64 = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                produced += 1;
                let order = sample_order(produced);
                let payload = serde_json::to_vec(&order)?;
                let sent = publisher
                    .publish(
                        &config.kafka_topic,
                        order.order_uid.as_bytes(),
                        &payload,
                        OwnedHeaders::new(),
                    )
                    .await;
                match sent {
                    Ok(()) => tracing::info!(order_uid = %order.order_uid, produced, "Order published"),
                    Err(error) => tracing::error!(%error, "Publish failed"),
                }
            }
        }
    }

    tracing::info!(produced, "Order producer stopped");
    Ok(())
}
