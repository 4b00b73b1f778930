use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{
    Closing, CustomerInfo, Money, Order, OrderItem, OrderParts, OrderStatus, ProductId, StatusKind,
};
use sqlx::{Acquire, PgConnection, PgPool, Row, postgres::PgRow};

use crate::{
    CatalogStore, Closure, OrderLedger, Product, Result, Settlement, StockDecrement, StoreError,
    shortfall_closing, stock_debits,
};

const ORDER_COLUMNS: &str = r#"
    order_id, customer_name, customer_email, customer_phone,
    shipping_address, shipping_city, shipping_state, shipping_pincode,
    total_amount_minor, currency, status, status_reason,
    gateway_order_ref, gateway_payment_ref, created_at, updated_at
"#;

/// PostgreSQL-backed ledger and catalog.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn fetch_order(conn: &mut PgConnection, order_id: &str) -> Result<Option<Order>> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1");
        let Some(row) = sqlx::query(&query)
            .bind(order_id)
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query(
            r#"
            SELECT product_id, product_name, quantity, unit_price_minor
            FROM order_items
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(|row| Self::row_to_item(order_id, row))
        .collect::<Result<Vec<_>>>()?;

        Self::row_to_order(row, items).map(Some)
    }

    fn row_to_item(order_id: &str, row: PgRow) -> Result<OrderItem> {
        let product_id: String = row.try_get("product_id")?;
        let quantity: i64 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity).map_err(|_| StoreError::Corrupt {
            key: order_id.to_string(),
            reason: format!("quantity {quantity} for {product_id} out of range"),
        })?;

        Ok(OrderItem {
            product_id: ProductId::new(product_id),
            product_name: row.try_get("product_name")?,
            quantity,
            unit_price: Money::from_minor(row.try_get("unit_price_minor")?),
        })
    }

    fn row_to_order(row: PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let order_id: String = row.try_get("order_id")?;
        let status_label: String = row.try_get("status")?;
        let kind = StatusKind::parse(&status_label).ok_or_else(|| StoreError::Corrupt {
            key: order_id.clone(),
            reason: format!("unknown status {status_label}"),
        })?;
        let status = OrderStatus::from_parts(
            kind,
            row.try_get("gateway_payment_ref")?,
            row.try_get("status_reason")?,
        )?;

        let order = Order::restore(OrderParts {
            id: OrderId::from_stored(order_id),
            customer: CustomerInfo {
                name: row.try_get("customer_name")?,
                email: row.try_get("customer_email")?,
                phone: row.try_get("customer_phone")?,
                shipping_address: row.try_get("shipping_address")?,
                shipping_city: row.try_get("shipping_city")?,
                shipping_state: row.try_get("shipping_state")?,
                shipping_pincode: row.try_get("shipping_pincode")?,
            },
            items,
            total_amount: Money::from_minor(row.try_get("total_amount_minor")?),
            currency: row.try_get("currency")?,
            gateway_order_ref: row.try_get("gateway_order_ref")?,
            status,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })?;
        Ok(order)
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let id: String = row.try_get("id")?;
        let stock: i64 = row.try_get("stock_quantity")?;
        let stock_quantity = u32::try_from(stock).map_err(|_| StoreError::Corrupt {
            key: id.clone(),
            reason: format!("stock {stock} out of range"),
        })?;

        Ok(Product {
            id: ProductId::new(id),
            name: row.try_get("name")?,
            price: Money::from_minor(row.try_get("price_minor")?),
            stock_quantity,
            is_available: row.try_get("is_available")?,
        })
    }

    async fn current_stock(conn: &mut PgConnection, product_id: &ProductId) -> Result<Option<u32>> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
                .bind(product_id.as_str())
                .fetch_optional(&mut *conn)
                .await?;
        // Negative stock is prevented by a CHECK constraint
        Ok(stock.map(|s| u32::try_from(s).unwrap_or(0)))
    }

    async fn order_ids_where(&self, clause: &str, value: &str) -> Result<Vec<String>> {
        let query = format!("SELECT order_id FROM orders WHERE {clause}");
        let ids = sqlx::query_scalar(&query)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn load_orders(&self, ids: Vec<String>) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let mut orders = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(order) = Self::fetch_order(&mut conn, &id).await? {
                orders.push(order);
            }
        }
        Ok(orders)
    }
}

fn map_unique(err: sqlx::Error, entity: &'static str, key: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        let entity = match db_err.constraint() {
            Some("orders_gateway_order_ref_key") => "gateway order reference",
            _ => entity,
        };
        return StoreError::Duplicate {
            entity,
            key: key.to_string(),
        };
    }
    StoreError::Database(err)
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, price_minor, stock_quantity, is_available
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn decrement_stock(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<StockDecrement> {
        let mut conn = self.pool.acquire().await?;
        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - $2, updated_at = NOW()
            WHERE id = $1 AND stock_quantity >= $2
            RETURNING stock_quantity
            "#,
        )
        .bind(product_id.as_str())
        .bind(i64::from(quantity))
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(remaining) = remaining {
            return Ok(StockDecrement::Applied {
                remaining: u32::try_from(remaining).unwrap_or(0),
            });
        }

        Ok(match Self::current_stock(&mut conn, product_id).await? {
            Some(available) => StockDecrement::Insufficient { available },
            None => StockDecrement::UnknownProduct,
        })
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_minor, stock_quantity, is_available, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                price_minor = EXCLUDED.price_minor,
                stock_quantity = EXCLUDED.stock_quantity,
                is_available = EXCLUDED.is_available,
                updated_at = NOW()
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(product.price.minor())
        .bind(i64::from(product.stock_quantity))
        .bind(product.is_available)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderLedger for PostgresStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let key = order.id().as_str();
        let customer = order.customer();
        let status = order.status();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                order_id, customer_name, customer_email, customer_phone,
                shipping_address, shipping_city, shipping_state, shipping_pincode,
                total_amount_minor, currency, status, status_reason,
                gateway_order_ref, gateway_payment_ref, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(key)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.shipping_address)
        .bind(&customer.shipping_city)
        .bind(&customer.shipping_state)
        .bind(&customer.shipping_pincode)
        .bind(order.total_amount().minor())
        .bind(order.currency())
        .bind(status.kind().as_str())
        .bind(status.reason())
        .bind(order.gateway_order_ref())
        .bind(status.payment_ref())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique(e, "order", key))?;

        for (position, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, product_name, quantity, unit_price_minor)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(key)
            .bind(position as i32)
            .bind(item.product_id.as_str())
            .bind(&item.product_name)
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.minor())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_order(&mut conn, order_id.as_str()).await
    }

    async fn find_by_gateway_ref(&self, gateway_order_ref: &str) -> Result<Option<Order>> {
        let ids = self
            .order_ids_where("gateway_order_ref = $1", gateway_order_ref)
            .await?;
        Ok(self.load_orders(ids).await?.into_iter().next())
    }

    async fn orders_for_customer(&self, email: &str) -> Result<Vec<Order>> {
        let ids = self
            .order_ids_where(
                "LOWER(customer_email) = LOWER($1) ORDER BY created_at DESC, order_id DESC",
                email.trim(),
            )
            .await?;
        self.load_orders(ids).await
    }

    async fn settle_payment(
        &self,
        order_id: &OrderId,
        payment_ref: &str,
        at: DateTime<Utc>,
    ) -> Result<Settlement> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the order serializes concurrent settlements
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE order_id = $1 FOR UPDATE")
                .bind(order_id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(status) = status else {
            tx.rollback().await?;
            return Ok(Settlement::NotFound);
        };
        if status != StatusKind::Pending.as_str() {
            let current = Self::fetch_order(&mut *tx, order_id.as_str()).await?;
            tx.rollback().await?;
            return Ok(match current {
                Some(order) => Settlement::NotPending(order),
                None => Settlement::NotFound,
            });
        }

        let Some(pending) = Self::fetch_order(&mut *tx, order_id.as_str()).await? else {
            tx.rollback().await?;
            return Ok(Settlement::NotFound);
        };

        // Debits run under a savepoint so a shortfall can undo them and still
        // record the failure in this transaction
        let mut debits = Acquire::begin(&mut *tx).await?;
        let mut shortfall = None;
        for debit in stock_debits(&pending) {
            let applied = sqlx::query(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity - $2, updated_at = NOW()
                WHERE id = $1 AND stock_quantity >= $2
                "#,
            )
            .bind(debit.product_id.as_str())
            .bind(i64::from(debit.quantity))
            .execute(&mut *debits)
            .await?
            .rows_affected()
                == 1;

            if !applied {
                let available = Self::current_stock(&mut *debits, &debit.product_id)
                    .await?
                    .unwrap_or(0);
                shortfall = Some((debit, available));
                break;
            }
        }

        if let Some((debit, available)) = shortfall {
            debits.rollback().await?;
            let closing = shortfall_closing(&debit.product_id, debit.quantity, available);
            sqlx::query(
                r#"
                UPDATE orders
                SET status = $2, status_reason = $3, updated_at = $4
                WHERE order_id = $1
                "#,
            )
            .bind(order_id.as_str())
            .bind(closing.kind().as_str())
            .bind(closing.reason())
            .bind(at)
            .execute(&mut *tx)
            .await?;
            let failed = Self::fetch_order(&mut *tx, order_id.as_str()).await?;
            tx.commit().await?;

            tracing::debug!(
                order_id = %order_id,
                product_id = %debit.product_id,
                requested = debit.quantity,
                available,
                "Settlement debits rolled back on stock shortfall"
            );
            return Ok(match failed {
                Some(order) => Settlement::OutOfStock {
                    order,
                    product_id: debit.product_id,
                    requested: debit.quantity,
                    available,
                },
                None => Settlement::NotFound,
            });
        }
        debits.commit().await?;

        sqlx::query(
            r#"
            UPDATE orders
            SET status = 'PAID', gateway_payment_ref = $2, status_reason = NULL, updated_at = $3
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_str())
        .bind(payment_ref)
        .bind(at)
        .execute(&mut *tx)
        .await?;
        let paid = Self::fetch_order(&mut *tx, order_id.as_str()).await?;
        tx.commit().await?;

        Ok(match paid {
            Some(order) => Settlement::Applied(order),
            None => Settlement::NotFound,
        })
    }

    async fn close_order(
        &self,
        order_id: &OrderId,
        closing: Closing,
        at: DateTime<Utc>,
    ) -> Result<Closure> {
        let mut tx = self.pool.begin().await?;

        let closed = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, status_reason = $3, updated_at = $4
            WHERE order_id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(order_id.as_str())
        .bind(closing.kind().as_str())
        .bind(closing.reason())
        .bind(at)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        let current = Self::fetch_order(&mut *tx, order_id.as_str()).await?;
        tx.commit().await?;

        Ok(match current {
            Some(order) if closed => Closure::Closed(order),
            Some(order) => Closure::NotPending(order),
            None => Closure::NotFound,
        })
    }
}
