//! Payment repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::connection::conflict_on_unique;
use crate::database::store::PaymentStore;
use crate::models::payment::{NewPayment, Payment};
use crate::utils::errors::Result;

macro_rules! payment_columns {
    () => {
        "id, student_id, event_id, amount, currency, gateway_order_id, gateway_payment_id, \
         gateway_signature, status, created_at, paid_at"
    };
}

#[derive(Clone, Debug)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PaymentRepository {
    /// Persist a freshly created gateway order
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment> {
        sqlx::query_as::<_, Payment>(concat!(
            r#"
            INSERT INTO payments (id, student_id, event_id, amount, currency, gateway_order_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'created', $7)
            RETURNING "#,
            payment_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(payment.student_id)
        .bind(payment.event_id)
        .bind(payment.amount)
        .bind(payment.currency)
        .bind(payment.gateway_order_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "gateway order id already recorded"))
    }

    async fn find_paid(&self, student_id: Uuid, event_id: Uuid) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(concat!(
            "SELECT ",
            payment_columns!(),
            " FROM payments WHERE student_id = $1 AND event_id = $2 AND status = 'paid'"
        ))
        .bind(student_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn find_by_order(&self, order_id: &str, student_id: Uuid, event_id: Uuid) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(concat!(
            "SELECT ",
            payment_columns!(),
            " FROM payments WHERE gateway_order_id = $1 AND student_id = $2 AND event_id = $3"
        ))
        .bind(order_id)
        .bind(student_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn complete_payment(
        &self,
        id: Uuid,
        gateway_payment_id: &str,
        gateway_signature: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Payment>> {
        sqlx::query_as::<_, Payment>(concat!(
            r#"
            UPDATE payments
            SET status = 'paid', gateway_payment_id = $2, gateway_signature = $3, paid_at = $4
            WHERE id = $1 AND status = 'created'
            RETURNING "#,
            payment_columns!()
        ))
        .bind(id)
        .bind(gateway_payment_id)
        .bind(gateway_signature)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "another payment for this event is already completed"))
    }
}
