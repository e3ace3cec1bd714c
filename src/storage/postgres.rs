use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::OrderStore;
use crate::domain::{DeadLetterRecord, Delivery, Item, Order, Payment};
use crate::error::StoreError;

// ============================================================================
// PostgreSQL Order Store
// ============================================================================
//
// One aggregate spans four tables: orders, delivery, payment, and items,
// all keyed by order_uid. Inserts run in a single transaction so a failed
// write leaves no partial aggregate behind. Dead letters land in their own
// append-only table.
//
// ============================================================================

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS orders (
        order_uid          TEXT PRIMARY KEY,
        track_number       TEXT NOT NULL,
        entry              TEXT NOT NULL,
        locale             TEXT NOT NULL,
        internal_signature TEXT NOT NULL DEFAULT '',
        customer_id        TEXT NOT NULL,
        delivery_service   TEXT NOT NULL,
        shardkey           TEXT NOT NULL,
        sm_id              BIGINT NOT NULL,
        date_created       TIMESTAMPTZ NOT NULL,
        oof_shard          TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS delivery (
        order_uid TEXT PRIMARY KEY REFERENCES orders(order_uid) ON DELETE CASCADE,
        name      TEXT NOT NULL,
        phone     TEXT NOT NULL,
        zip       TEXT NOT NULL,
        city      TEXT NOT NULL,
        address   TEXT NOT NULL,
        region    TEXT NOT NULL,
        email     TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS payment (
        order_uid     TEXT PRIMARY KEY REFERENCES orders(order_uid) ON DELETE CASCADE,
        transaction   TEXT NOT NULL,
        request_id    TEXT NOT NULL,
        currency      TEXT NOT NULL,
        provider      TEXT NOT NULL,
        amount        BIGINT NOT NULL,
        payment_dt    BIGINT NOT NULL,
        bank          TEXT NOT NULL,
        delivery_cost BIGINT NOT NULL,
        goods_total   BIGINT NOT NULL,
        custom_fee    BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS items (
        id           BIGSERIAL PRIMARY KEY,
        order_uid    TEXT NOT NULL REFERENCES orders(order_uid) ON DELETE CASCADE,
        chrt_id      BIGINT NOT NULL,
        track_number TEXT NOT NULL,
        price        BIGINT NOT NULL,
        rid          TEXT NOT NULL,
        name         TEXT NOT NULL,
        sale         BIGINT NOT NULL,
        size         TEXT NOT NULL,
        total_price  BIGINT NOT NULL,
        nm_id        BIGINT NOT NULL,
        brand        TEXT NOT NULL,
        status       BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS dead_letters (
        id            BIGSERIAL PRIMARY KEY,
        topic         TEXT NOT NULL,
        key           TEXT NOT NULL,
        value         TEXT NOT NULL,
        error_type    TEXT NOT NULL,
        error_message TEXT NOT NULL,
        received_at   TIMESTAMPTZ NOT NULL
    )",
];

type OrderRow = (
    String,        // order_uid
    String,        // track_number
    String,        // entry
    String,        // locale
    String,        // internal_signature
    String,        // customer_id
    String,        // delivery_service
    String,        // shardkey
    i64,           // sm_id
    DateTime<Utc>, // date_created
    String,        // oof_shard
);

type DeliveryRow = (String, String, String, String, String, String, String);

type PaymentRow = (String, String, String, String, i64, i64, String, i64, i64, i64);

type ItemRow = (i64, String, i64, String, String, i64, String, i64, i64, String, i64);

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates any missing tables. Run once at startup before serving.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for ddl in SCHEMA {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        tracing::info!("📦 Database schema ready");
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (order_uid, track_number, entry, locale, internal_signature, \
             customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shardkey)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .execute(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        sqlx::query(
            "INSERT INTO delivery (order_uid, name, phone, zip, city, address, region, email) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&order.order_uid)
        .bind(&order.delivery.name)
        .bind(&order.delivery.phone)
        .bind(&order.delivery.zip)
        .bind(&order.delivery.city)
        .bind(&order.delivery.address)
        .bind(&order.delivery.region)
        .bind(&order.delivery.email)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO payment (order_uid, transaction, request_id, currency, provider, \
             amount, payment_dt, bank, delivery_cost, goods_total, custom_fee) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&order.order_uid)
        .bind(&order.payment.transaction)
        .bind(&order.payment.request_id)
        .bind(&order.payment.currency)
        .bind(&order.payment.provider)
        .bind(order.payment.amount)
        .bind(order.payment.payment_dt)
        .bind(&order.payment.bank)
        .bind(order.payment.delivery_cost)
        .bind(order.payment.goods_total)
        .bind(order.payment.custom_fee)
        .execute(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO items (order_uid, chrt_id, track_number, price, rid, name, \
                 sale, size, total_price, nm_id, brand, status) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(&order.order_uid)
            .bind(item.chrt_id)
            .bind(&item.track_number)
            .bind(item.price)
            .bind(&item.rid)
            .bind(&item.name)
            .bind(item.sale)
            .bind(&item.size)
            .bind(item.total_price)
            .bind(item.nm_id)
            .bind(&item.brand)
            .bind(item.status)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(order_uid = %order.order_uid, "Order persisted");
        Ok(())
    }

    async fn get_order(&self, order_uid: &str) -> Result<Order, StoreError> {
        let order_row: OrderRow = sqlx::query_as(
            "SELECT order_uid, track_number, entry, locale, internal_signature, customer_id, \
             delivery_service, shardkey, sm_id, date_created, oof_shard \
             FROM orders WHERE order_uid = $1",
        )
        .bind(order_uid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        let delivery_row: DeliveryRow = sqlx::query_as(
            "SELECT name, phone, zip, city, address, region, email \
             FROM delivery WHERE order_uid = $1",
        )
        .bind(order_uid)
        .fetch_one(&self.pool)
        .await?;

        let payment_row: PaymentRow = sqlx::query_as(
            "SELECT transaction, request_id, currency, provider, amount, payment_dt, bank, \
             delivery_cost, goods_total, custom_fee \
             FROM payment WHERE order_uid = $1",
        )
        .bind(order_uid)
        .fetch_one(&self.pool)
        .await?;

        let item_rows: Vec<ItemRow> = sqlx::query_as(
            "SELECT chrt_id, track_number, price, rid, name, sale, size, total_price, \
             nm_id, brand, status \
             FROM items WHERE order_uid = $1 ORDER BY id",
        )
        .bind(order_uid)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble_order(order_row, delivery_row, payment_row, item_rows))
    }

    async fn list_order_uids(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT order_uid FROM orders")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(uid,)| uid).collect())
    }

    async fn append_dead_letter(&self, record: &DeadLetterRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO dead_letters (topic, key, value, error_type, error_message, received_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&record.topic)
        .bind(&record.key)
        .bind(&record.value)
        .bind(&record.error_type)
        .bind(&record.error_message)
        .bind(record.received_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = err {
        if db.kind() == sqlx::error::ErrorKind::UniqueViolation {
            return StoreError::Duplicate;
        }
    }
    StoreError::Database(err)
}

/// Rebuilds the aggregate from its four relational parts. Pure so the
/// column-to-field mapping stays unit-testable without a database.
fn assemble_order(
    order_row: OrderRow,
    delivery_row: DeliveryRow,
    payment_row: PaymentRow,
    item_rows: Vec<ItemRow>,
) -> Order {
    let (
        order_uid,
        track_number,
        entry,
        locale,
        internal_signature,
        customer_id,
        delivery_service,
        shardkey,
        sm_id,
        date_created,
        oof_shard,
    ) = order_row;
    let (name, phone, zip, city, address, region, email) = delivery_row;
    let (
        transaction,
        request_id,
        currency,
        provider,
        amount,
        payment_dt,
        bank,
        delivery_cost,
        goods_total,
        custom_fee,
    ) = payment_row;

    Order {
        order_uid,
        track_number,
        entry,
        delivery: Delivery {
            name,
            phone,
            zip,
            city,
            address,
            region,
            email,
        },
        payment: Payment {
            transaction,
            request_id,
            currency,
            provider,
            amount,
            payment_dt,
            bank,
            delivery_cost,
            goods_total,
            custom_fee,
        },
        items: item_rows
            .into_iter()
            .map(
                |(
                    chrt_id,
                    track_number,
                    price,
                    rid,
                    name,
                    sale,
                    size,
                    total_price,
                    nm_id,
                    brand,
                    status,
                )| Item {
                    chrt_id,
                    track_number,
                    price,
                    rid,
                    name,
                    sale,
                    size,
                    total_price,
                    nm_id,
                    brand,
                    status,
                },
            )
            .collect(),
        locale,
        internal_signature,
        customer_id,
        delivery_service,
        shardkey,
        sm_id,
        date_created,
        oof_shard,
    }
}
