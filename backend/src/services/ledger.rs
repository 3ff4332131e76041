//! Ledger service for farmer payments and outstanding balances
//!
//! Payments apply to a (buyer, farmer) pair's aggregate balance, never to a
//! single invoice. The balance check and the payment insert share one
//! transaction that locks the pair's pending invoices, so two concurrent
//! payments cannot both pass the check against a stale balance.
//!
//! Paid invoices absorb their covering payments: the outstanding balance is
//! the pending invoice total minus the payments not yet absorbed, which
//! equals all non-cancelled invoice totals minus all payments.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthUser, Role};
use crate::services::pricing::Invoice;
use crate::services::AuditService;
use shared::{covered_invoice_count, validate_payment_amount, PaymentMode};

/// Ledger service for payments and balances
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

/// Payment record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub farmer_id: Uuid,
    pub amount: Decimal,
    pub mode: String,
    pub transaction_ref: Option<String>,
    pub payment_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}

/// Input for recording a payment
#[derive(Debug, Deserialize)]
pub struct RecordPaymentInput {
    /// Required when an admin records on a buyer's behalf; buyers record
    /// their own payments
    pub buyer_id: Option<Uuid>,
    pub farmer_id: Uuid,
    pub amount: Decimal,
    pub mode: PaymentMode,
    pub transaction_ref: Option<String>,
    pub payment_date: Option<NaiveDate>,
}

/// Outstanding balance for a (buyer, farmer) pair
#[derive(Debug, Clone, Serialize)]
pub struct OutstandingBalance {
    pub buyer_id: Uuid,
    pub farmer_id: Uuid,
    pub pending_invoice_total: Decimal,
    pub unallocated_payment_total: Decimal,
    pub balance: Decimal,
}

/// Statement for a (buyer, farmer) pair: invoices, payments, balance
#[derive(Debug, Clone, Serialize)]
pub struct PairStatement {
    pub invoices: Vec<Invoice>,
    pub payments: Vec<Payment>,
    pub outstanding: OutstandingBalance,
}

/// Pending invoice row locked during a payment
#[derive(Debug, sqlx::FromRow)]
struct PendingInvoice {
    id: Uuid,
    grand_total: Decimal,
}

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a payment against the pair's outstanding balance.
    ///
    /// Rejects amounts that would overdraw the balance, then marks as PAID
    /// the oldest pending invoices now fully covered by cumulative payments
    /// (display allocation only; the balance never depends on it).
    pub async fn record_payment(
        &self,
        actor: &AuthUser,
        input: RecordPaymentInput,
    ) -> AppResult<Payment> {
        if input.amount <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "amount".to_string(),
                message: "Payment amount must be greater than 0".to_string(),
            });
        }

        let buyer_id = match actor.role {
            Role::Buyer => actor.user_id,
            _ => input.buyer_id.ok_or_else(|| AppError::Validation {
                field: "buyer_id".to_string(),
                message: "buyer_id is required when recording on a buyer's behalf".to_string(),
            })?,
        };

        let payment_date = input
            .payment_date
            .unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        // Locking the pair's pending invoices serializes concurrent payments
        // for the same pair; the balance is recomputed under the lock
        let pending = sqlx::query_as::<_, PendingInvoice>(
            r#"
            SELECT id, grand_total
            FROM invoices
            WHERE buyer_id = $1 AND farmer_id = $2 AND status = 'pending'
            ORDER BY invoice_date ASC, created_at ASC
            FOR UPDATE
            "#,
        )
        .bind(buyer_id)
        .bind(input.farmer_id)
        .fetch_all(&mut *tx)
        .await?;

        let paid_invoice_total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(grand_total), 0)
            FROM invoices
            WHERE buyer_id = $1 AND farmer_id = $2 AND status = 'paid'
            "#,
        )
        .bind(buyer_id)
        .bind(input.farmer_id)
        .fetch_one(&mut *tx)
        .await?;

        let payment_total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE buyer_id = $1 AND farmer_id = $2",
        )
        .bind(buyer_id)
        .bind(input.farmer_id)
        .fetch_one(&mut *tx)
        .await?;

        let pending_total: Decimal = pending.iter().map(|i| i.grand_total).sum();
        let unallocated = payment_total - paid_invoice_total;
        let balance = pending_total - unallocated;

        // amount > 0 was already validated; the only remaining failure is an
        // overdraw, and the transaction rolls back with nothing written
        validate_payment_amount(input.amount, balance).map_err(AppError::BusinessRule)?;

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (buyer_id, farmer_id, amount, mode, transaction_ref, payment_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, buyer_id, farmer_id, amount, mode, transaction_ref,
                      payment_date, recorded_at
            "#,
        )
        .bind(buyer_id)
        .bind(input.farmer_id)
        .bind(input.amount)
        .bind(input.mode.as_str())
        .bind(&input.transaction_ref)
        .bind(payment_date)
        .fetch_one(&mut *tx)
        .await?;

        // Oldest-first display allocation over the locked pending invoices
        let totals: Vec<Decimal> = pending.iter().map(|i| i.grand_total).collect();
        let covered = covered_invoice_count(&totals, unallocated + input.amount);
        if covered > 0 {
            let covered_ids: Vec<Uuid> = pending[..covered].iter().map(|i| i.id).collect();
            sqlx::query(
                "UPDATE invoices SET status = 'paid', updated_at = NOW() WHERE id = ANY($1)",
            )
            .bind(&covered_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        AuditService::new(self.db.clone()).emit(actor.user_id, "payment.recorded", "payment", payment.id);

        Ok(payment)
    }

    /// Outstanding balance for a (buyer, farmer) pair
    pub async fn get_outstanding_balance(
        &self,
        buyer_id: Uuid,
        farmer_id: Uuid,
    ) -> AppResult<OutstandingBalance> {
        let (pending_total, paid_total) = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT COALESCE(SUM(grand_total) FILTER (WHERE status = 'pending'), 0),
                   COALESCE(SUM(grand_total) FILTER (WHERE status = 'paid'), 0)
            FROM invoices
            WHERE buyer_id = $1 AND farmer_id = $2
            "#,
        )
        .bind(buyer_id)
        .bind(farmer_id)
        .fetch_one(&self.db)
        .await?;

        let payment_total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE buyer_id = $1 AND farmer_id = $2",
        )
        .bind(buyer_id)
        .bind(farmer_id)
        .fetch_one(&self.db)
        .await?;

        let unallocated = payment_total - paid_total;

        Ok(OutstandingBalance {
            buyer_id,
            farmer_id,
            pending_invoice_total: pending_total,
            unallocated_payment_total: unallocated,
            balance: pending_total - unallocated,
        })
    }

    /// Full statement for a (buyer, farmer) pair
    pub async fn get_statement(
        &self,
        buyer_id: Uuid,
        farmer_id: Uuid,
    ) -> AppResult<PairStatement> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, invoice_number, buyer_id, farmer_id, invoice_date,
                   grand_total, status, created_at, updated_at
            FROM invoices
            WHERE buyer_id = $1 AND farmer_id = $2 AND status <> 'cancelled'
            ORDER BY invoice_date ASC, created_at ASC
            "#,
        )
        .bind(buyer_id)
        .bind(farmer_id)
        .fetch_all(&self.db)
        .await?;

        let payments = self.list_payments(Some(buyer_id), Some(farmer_id)).await?;
        let outstanding = self.get_outstanding_balance(buyer_id, farmer_id).await?;

        Ok(PairStatement {
            invoices,
            payments,
            outstanding,
        })
    }

    /// List payments, optionally filtered by buyer and farmer
    pub async fn list_payments(
        &self,
        buyer_id: Option<Uuid>,
        farmer_id: Option<Uuid>,
    ) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, buyer_id, farmer_id, amount, mode, transaction_ref,
                   payment_date, recorded_at
            FROM payments
            WHERE ($1::uuid IS NULL OR buyer_id = $1)
              AND ($2::uuid IS NULL OR farmer_id = $2)
            ORDER BY payment_date DESC, recorded_at DESC
            "#,
        )
        .bind(buyer_id)
        .bind(farmer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(payments)
    }
}
