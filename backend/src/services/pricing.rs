//! Pricing and settlement engine
//!
//! Converts a day's unpriced collection chits into invoices, exactly once.
//!
//! The concurrency token is the chit's own is_priced flag: each
//! (buyer, farmer) group is settled in a transaction that first claims its
//! chits with a conditional false→true update and then writes the invoice
//! from the claimed set only. A run that loses a claim simply leaves that
//! chit to whichever run won it; re-running the operation is always safe.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::AuditService;
use shared::{format_invoice_number, line_total, validate_price_map};

/// Pricing service for daily prices and invoice generation
#[derive(Clone)]
pub struct PricingService {
    db: PgPool,
}

/// Daily farm-gate price for one commodity
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyPrice {
    pub price_date: NaiveDate,
    pub commodity_name: String,
    pub price_per_kg: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Input for a pricing run
#[derive(Debug, Deserialize)]
pub struct SetDailyPricesInput {
    pub price_date: NaiveDate,
    /// commodity name → price per kg
    pub prices: BTreeMap<String, Decimal>,
}

/// Summary of one pricing run, returned for display
#[derive(Debug, Clone, Serialize)]
pub struct PricingRunSummary {
    pub invoices_generated: u32,
    pub total_amount: Decimal,
}

/// Invoice information
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub buyer_id: Uuid,
    pub farmer_id: Uuid,
    pub invoice_date: NaiveDate,
    pub grand_total: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Invoice line item; records its source chit for traceability
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InvoiceLineItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub chit_id: Uuid,
    pub commodity_name: String,
    pub weight_kg: Decimal,
    pub price_per_kg: Decimal,
    pub line_total: Decimal,
}

/// Invoice with its line items
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceWithLines {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub line_items: Vec<InvoiceLineItem>,
}

/// Query filter for listing invoices
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceFilter {
    pub date: Option<NaiveDate>,
    pub buyer_id: Option<Uuid>,
    pub farmer_id: Option<Uuid>,
    pub status: Option<String>,
}

/// Unpriced chit eligible for this run
#[derive(Debug, sqlx::FromRow)]
struct EligibleChit {
    id: Uuid,
    buyer_id: Uuid,
    farmer_id: Uuid,
}

/// Collected item joined with its daily price
#[derive(Debug, sqlx::FromRow)]
struct PricedItem {
    chit_id: Uuid,
    commodity_name: String,
    weight_kg: Decimal,
    price_per_kg: Decimal,
}

impl PricingService {
    /// Create a new PricingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Set the day's prices and convert every fully-priced unpriced chit for
    /// that date into invoice line items.
    ///
    /// Safe to re-run and safe to run concurrently for the same date: chits
    /// already claimed by another run drop out of this one.
    pub async fn set_daily_prices_and_generate_invoices(
        &self,
        actor: &AuthUser,
        input: SetDailyPricesInput,
    ) -> AppResult<PricingRunSummary> {
        // The whole call aborts before any write on a bad price
        validate_price_map(&input.prices).map_err(|msg| AppError::Validation {
            field: "prices".to_string(),
            message: msg,
        })?;

        self.upsert_prices(input.price_date, &input.prices).await?;

        let eligible = self.select_eligible_chits(input.price_date).await?;

        // Partition by (buyer, farmer); BTreeMap keeps settlement order stable
        let mut groups: BTreeMap<(Uuid, Uuid), Vec<Uuid>> = BTreeMap::new();
        for chit in eligible {
            groups
                .entry((chit.buyer_id, chit.farmer_id))
                .or_default()
                .push(chit.id);
        }

        let mut invoices_generated = 0u32;
        let mut total_amount = Decimal::ZERO;

        for ((buyer_id, farmer_id), chit_ids) in groups {
            if let Some((invoice_id, grand_total)) = self
                .settle_group(buyer_id, farmer_id, input.price_date, &chit_ids)
                .await?
            {
                invoices_generated += 1;
                total_amount += grand_total;
                AuditService::new(self.db.clone()).emit(
                    actor.user_id,
                    "invoice.generated",
                    "invoice",
                    invoice_id,
                );
            }
        }

        Ok(PricingRunSummary {
            invoices_generated,
            total_amount,
        })
    }

    /// Upsert the day's price set, all-or-nothing. Re-setting a price
    /// overwrites the prior value but never touches existing invoices.
    async fn upsert_prices(
        &self,
        date: NaiveDate,
        prices: &BTreeMap<String, Decimal>,
    ) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        for (commodity, price) in prices {
            sqlx::query(
                r#"
                INSERT INTO daily_prices (price_date, commodity_name, price_per_kg)
                VALUES ($1, $2, $3)
                ON CONFLICT (price_date, commodity_name)
                DO UPDATE SET price_per_kg = EXCLUDED.price_per_kg, updated_at = NOW()
                "#,
            )
            .bind(date)
            .bind(commodity.trim())
            .bind(price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Unpriced chits for the date whose items are all covered by the
    /// now-current price set. A chit with any unpriced commodity is skipped
    /// whole, never partially billed.
    async fn select_eligible_chits(&self, date: NaiveDate) -> AppResult<Vec<EligibleChit>> {
        let chits = sqlx::query_as::<_, EligibleChit>(
            r#"
            SELECT c.id, c.buyer_id, c.farmer_id
            FROM collection_chits c
            WHERE c.collection_date = $1
              AND c.is_priced = FALSE
              AND NOT EXISTS (
                  SELECT 1
                  FROM collection_items i
                  WHERE i.chit_id = c.id
                    AND NOT EXISTS (
                        SELECT 1
                        FROM daily_prices p
                        WHERE p.price_date = $1
                          AND p.commodity_name = i.commodity_name
                    )
              )
            ORDER BY c.buyer_id, c.farmer_id, c.collected_at
            "#,
        )
        .bind(date)
        .fetch_all(&self.db)
        .await?;

        Ok(chits)
    }

    /// Settle one (buyer, farmer) group in a single transaction: claim the
    /// chits, price their items, and create or extend the pair's invoice for
    /// the date. Either the invoice write and every claimed chit's flip
    /// commit together, or none of it does.
    ///
    /// Returns the affected invoice's id and grand total, or None when every
    /// chit was claimed by a concurrent run first.
    async fn settle_group(
        &self,
        buyer_id: Uuid,
        farmer_id: Uuid,
        date: NaiveDate,
        chit_ids: &[Uuid],
    ) -> AppResult<Option<(Uuid, Decimal)>> {
        let mut tx = self.db.begin().await?;

        // The false→true flip is the concurrency token: only chits still
        // unpriced are claimed, and the flip is undone if this transaction
        // fails
        let claimed = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE collection_chits
            SET is_priced = TRUE
            WHERE id = ANY($1) AND is_priced = FALSE
            RETURNING id
            "#,
        )
        .bind(chit_ids)
        .fetch_all(&mut *tx)
        .await?;

        if claimed.is_empty() {
            tx.rollback().await?;
            return Ok(None);
        }

        let items = sqlx::query_as::<_, PricedItem>(
            r#"
            SELECT i.chit_id, i.commodity_name, i.weight_kg, p.price_per_kg
            FROM collection_items i
            JOIN daily_prices p
              ON p.price_date = $2 AND p.commodity_name = i.commodity_name
            WHERE i.chit_id = ANY($1)
            ORDER BY i.chit_id, i.commodity_name
            "#,
        )
        .bind(&claimed)
        .bind(date)
        .fetch_all(&mut *tx)
        .await?;

        let group_total: Decimal = items
            .iter()
            .map(|item| line_total(item.weight_kg, item.price_per_kg))
            .sum();

        let (invoice_id, grand_total) = self
            .create_or_extend_invoice(&mut tx, buyer_id, farmer_id, date, group_total)
            .await?;

        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO invoice_line_items
                    (invoice_id, chit_id, commodity_name, weight_kg, price_per_kg, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(invoice_id)
            .bind(item.chit_id)
            .bind(&item.commodity_name)
            .bind(item.weight_kg)
            .bind(item.price_per_kg)
            .bind(line_total(item.weight_kg, item.price_per_kg))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Some((invoice_id, grand_total)))
    }

    /// Create the pair's PENDING invoice for the date, or extend the
    /// existing non-cancelled one. Creation that loses the unique-index race
    /// to a concurrent run falls back to extending the winner's invoice.
    async fn create_or_extend_invoice(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        buyer_id: Uuid,
        farmer_id: Uuid,
        date: NaiveDate,
        group_total: Decimal,
    ) -> AppResult<(Uuid, Decimal)> {
        let existing = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM invoices
            WHERE buyer_id = $1 AND farmer_id = $2 AND invoice_date = $3
              AND status <> 'cancelled'
            FOR UPDATE
            "#,
        )
        .bind(buyer_id)
        .bind(farmer_id)
        .bind(date)
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(invoice_id) = existing {
            let grand_total = self.extend_invoice(tx, invoice_id, group_total).await?;
            return Ok((invoice_id, grand_total));
        }

        // Globally monotonic sequence; no read-then-write race on the number
        let sequence = sqlx::query_scalar::<_, i64>("SELECT nextval('invoice_number_seq')")
            .fetch_one(&mut **tx)
            .await?;
        let invoice_number = format_invoice_number(date.year(), sequence);

        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO invoices (invoice_number, buyer_id, farmer_id, invoice_date, grand_total, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            ON CONFLICT (buyer_id, farmer_id, invoice_date) WHERE (status <> 'cancelled')
            DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&invoice_number)
        .bind(buyer_id)
        .bind(farmer_id)
        .bind(date)
        .bind(group_total)
        .fetch_optional(&mut **tx)
        .await?;

        match inserted {
            Some(invoice_id) => Ok((invoice_id, group_total)),
            None => {
                // A concurrent run created the invoice between the select and
                // the insert; extend it instead
                let invoice_id = sqlx::query_scalar::<_, Uuid>(
                    r#"
                    SELECT id
                    FROM invoices
                    WHERE buyer_id = $1 AND farmer_id = $2 AND invoice_date = $3
                      AND status <> 'cancelled'
                    FOR UPDATE
                    "#,
                )
                .bind(buyer_id)
                .bind(farmer_id)
                .bind(date)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!(
                        "Invoice insert conflicted but no invoice exists for ({}, {}, {})",
                        buyer_id,
                        farmer_id,
                        date
                    ))
                })?;

                let grand_total = self.extend_invoice(tx, invoice_id, group_total).await?;
                Ok((invoice_id, grand_total))
            }
        }
    }

    /// Add a group total to an existing invoice and return the new total.
    async fn extend_invoice(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        invoice_id: Uuid,
        group_total: Decimal,
    ) -> AppResult<Decimal> {
        let grand_total = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE invoices
            SET grand_total = grand_total + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING grand_total
            "#,
        )
        .bind(invoice_id)
        .bind(group_total)
        .fetch_one(&mut **tx)
        .await?;

        Ok(grand_total)
    }

    /// List the price set for a date
    pub async fn list_daily_prices(&self, date: NaiveDate) -> AppResult<Vec<DailyPrice>> {
        let prices = sqlx::query_as::<_, DailyPrice>(
            r#"
            SELECT price_date, commodity_name, price_per_kg, updated_at
            FROM daily_prices
            WHERE price_date = $1
            ORDER BY commodity_name
            "#,
        )
        .bind(date)
        .fetch_all(&self.db)
        .await?;

        Ok(prices)
    }

    /// Get an invoice with its line items
    pub async fn get_invoice(&self, invoice_id: Uuid) -> AppResult<InvoiceWithLines> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, invoice_number, buyer_id, farmer_id, invoice_date,
                   grand_total, status, created_at, updated_at
            FROM invoices
            WHERE id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        let line_items = sqlx::query_as::<_, InvoiceLineItem>(
            r#"
            SELECT id, invoice_id, chit_id, commodity_name, weight_kg, price_per_kg, line_total
            FROM invoice_line_items
            WHERE invoice_id = $1
            ORDER BY chit_id, commodity_name
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.db)
        .await?;

        Ok(InvoiceWithLines { invoice, line_items })
    }

    /// List invoices filtered by date, buyer, farmer, and status
    pub async fn list_invoices(&self, filter: InvoiceFilter) -> AppResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, invoice_number, buyer_id, farmer_id, invoice_date,
                   grand_total, status, created_at, updated_at
            FROM invoices
            WHERE ($1::date IS NULL OR invoice_date = $1)
              AND ($2::uuid IS NULL OR buyer_id = $2)
              AND ($3::uuid IS NULL OR farmer_id = $3)
              AND ($4::text IS NULL OR status = $4)
            ORDER BY invoice_date DESC, created_at DESC
            "#,
        )
        .bind(filter.date)
        .bind(filter.buyer_id)
        .bind(filter.farmer_id)
        .bind(filter.status)
        .fetch_all(&self.db)
        .await?;

        Ok(invoices)
    }
}
