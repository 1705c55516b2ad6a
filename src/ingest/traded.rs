//! Handler for bonding-curve trade events.
//!
//! Trades are applied strictly in ledger order within the batch: each one
//! updates the token's mirrored reserves, moves the traded amount between
//! the curve's holder row and the trader's, and may stamp the one-time
//! legend milestone. A trade whose token has not been created locally yet
//! aborts the whole batch as retryable; the created-event handler will
//! catch up and the batch lands on a later cycle.

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::context::WorkerContext;
use crate::error::WorkerError;
use crate::ingest::cursor::{self, EventCategory};
use crate::ingest::users::{derive_users, insert_users};
use crate::ingest::BatchSummary;
use crate::ledger::{RawEvent, TradedTokenEvent};

const UPSERT_HOLDER_BUY: &str = "INSERT INTO holders (token_addr, holder_addr, amount) \
     VALUES ($1, $2, $3) \
     ON CONFLICT (token_addr, holder_addr) \
     DO UPDATE SET amount = holders.amount + EXCLUDED.amount";

const UPSERT_HOLDER_SELL: &str = "INSERT INTO holders (token_addr, holder_addr, amount) \
     VALUES ($1, $2, $3) \
     ON CONFLICT (token_addr, holder_addr) \
     DO UPDATE SET amount = holders.amount - EXCLUDED.amount";

/// Signed change to the curve's own holder balance: a buy takes tokens
/// out of the curve, a sell returns them.
fn curve_delta(is_buy: bool, amount: Decimal) -> Decimal {
    if is_buy {
        -amount
    } else {
        amount
    }
}

/// Returns true exactly when this trade should stamp the legend milestone:
/// the reserve has reached the target and the milestone was never set.
/// Once stamped, later trades never change it.
fn should_stamp_legend(
    legend_tx: Option<i64>,
    reserves: Decimal,
    target: Decimal,
) -> bool {
    legend_tx.is_none() && reserves >= target
}

/// Runs one ingestion cycle for trade events.
///
/// Returns `Ok(None)` when no new events exist. All mutations and the
/// cursor advance commit together; any per-event miss rolls the whole
/// batch back.
///
/// # Errors
///
/// Returns [`WorkerError::TokenMissing`] (ignorable) if a trade precedes
/// its token locally, [`WorkerError::CursorMissing`] if the category
/// cursor was never seeded, or a database/ledger error for the cycle.
pub async fn handle_traded(ctx: &WorkerContext) -> Result<Option<BatchSummary>, WorkerError> {
    let mut tx = ctx.db.begin().await?;

    let cursor = cursor::fetch_cursor(&mut tx, EventCategory::Traded).await?;

    let events: Vec<RawEvent<TradedTokenEvent>> = ctx
        .ledger
        .fetch_events(
            &cursor.indexed_type(&ctx.config.module_addr),
            cursor.end_idx,
            ctx.config.batch_size,
        )
        .await?;

    if events.is_empty() {
        debug!("no new trade events");
        return Ok(None);
    }

    for event in &events {
        let trade = &event.data;

        let updated = sqlx::query_as::<_, (Decimal, Option<i64>)>(
            "UPDATE tokens SET \
                 virtual_aptos_reserves = $1, \
                 virtual_token_reserves = $2, \
                 tx_at = $3, \
                 tx_c = tx_c + 1 \
             WHERE addr = $4 \
             RETURNING virtual_aptos_reserves, legend_tx",
        )
        .bind(trade.virtual_aptos_reserves)
        .bind(trade.virtual_token_reserves)
        .bind(trade.timestamp())
        .bind(&trade.token_address)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((reserves, legend_tx)) = updated else {
            return Err(WorkerError::TokenMissing {
                address: trade.token_address.clone(),
                category: EventCategory::Traded,
            });
        };

        sqlx::query(
            "UPDATE holders SET amount = amount + $1 \
             WHERE token_addr = $2 AND holder_addr = $3",
        )
        .bind(curve_delta(trade.is_buy, trade.token_amount))
        .bind(&trade.token_address)
        .bind(&ctx.config.module_addr)
        .execute(&mut *tx)
        .await?;

        let upsert = if trade.is_buy {
            UPSERT_HOLDER_BUY
        } else {
            UPSERT_HOLDER_SELL
        };
        sqlx::query(upsert)
            .bind(&trade.token_address)
            .bind(&trade.user)
            .bind(trade.token_amount)
            .execute(&mut *tx)
            .await?;

        if should_stamp_legend(legend_tx, reserves, ctx.config.legend_target_cap) {
            sqlx::query("UPDATE tokens SET legend_at = $1, legend_tx = $2 WHERE addr = $3")
                .bind(trade.timestamp())
                .bind(event.transaction_version)
                .bind(&trade.token_address)
                .execute(&mut *tx)
                .await?;

            info!(token = %trade.token_address, "legend milestone reached");
        }
    }

    let mut versions = Vec::with_capacity(events.len());
    let mut token_addrs = Vec::with_capacity(events.len());
    let mut user_addrs = Vec::with_capacity(events.len());
    let mut is_buys = Vec::with_capacity(events.len());
    let mut aptos_amounts = Vec::with_capacity(events.len());
    let mut token_amounts = Vec::with_capacity(events.len());
    let mut aptos_reserves = Vec::with_capacity(events.len());
    let mut token_reserves = Vec::with_capacity(events.len());
    let mut timestamps = Vec::with_capacity(events.len());

    for event in &events {
        let trade = &event.data;
        versions.push(event.transaction_version);
        token_addrs.push(trade.token_address.clone());
        user_addrs.push(trade.user.clone());
        is_buys.push(trade.is_buy);
        aptos_amounts.push(trade.aptos_amount);
        token_amounts.push(trade.token_amount);
        aptos_reserves.push(trade.virtual_aptos_reserves);
        token_reserves.push(trade.virtual_token_reserves);
        timestamps.push(trade.timestamp());
    }

    sqlx::query(
        "INSERT INTO trade (\
             transaction_version, token_addr, user_addr, is_buy, aptos_amount, \
             token_amount, virtual_aptos_reserves, virtual_token_reserves, ts\
         ) \
         SELECT * FROM UNNEST(\
             $1::bigint[], $2::text[], $3::text[], $4::bool[], $5::numeric[], \
             $6::numeric[], $7::numeric[], $8::numeric[], $9::timestamptz[]\
         ) \
         ON CONFLICT (transaction_version) DO NOTHING",
    )
    .bind(&versions)
    .bind(&token_addrs)
    .bind(&user_addrs)
    .bind(&is_buys)
    .bind(&aptos_amounts)
    .bind(&token_amounts)
    .bind(&aptos_reserves)
    .bind(&token_reserves)
    .bind(&timestamps)
    .execute(&mut *tx)
    .await?;

    let new_users = derive_users(user_addrs.iter().map(String::as_str));
    let user_count = insert_users(&mut tx, &new_users).await?;

    sqlx::query("UPDATE counting_metadata SET user_c = user_c + $1 WHERE id = 1")
        .bind(i64::try_from(user_count).unwrap_or(0))
        .execute(&mut *tx)
        .await?;

    cursor::advance_cursor(&mut tx, &cursor, events.len()).await?;

    tx.commit().await?;

    let summary = BatchSummary {
        category: EventCategory::Traded,
        from: cursor.end_idx,
        to: cursor.next_end(events.len()),
        events: events.len(),
    };

    info!(
        from = summary.from,
        to = summary.to,
        trades = summary.events,
        users = user_count,
        "trade batch committed"
    );

    Ok(Some(summary))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_delta_buy_drains_curve() {
        assert_eq!(curve_delta(true, Decimal::from(100)), Decimal::from(-100));
    }

    #[test]
    fn test_curve_delta_sell_refills_curve() {
        assert_eq!(curve_delta(false, Decimal::from(100)), Decimal::from(100));
    }

    #[test]
    fn test_trade_conserves_total_supply() {
        // Curve starts with the full reserve; trades shuffle amounts
        // between curve and trader without changing the sum.
        let initial = Decimal::from(1000);
        let mut curve = initial;
        let mut trader = Decimal::ZERO;

        for (is_buy, amount) in [
            (true, Decimal::from(100)),
            (true, Decimal::from(250)),
            (false, Decimal::from(50)),
        ] {
            curve += curve_delta(is_buy, amount);
            trader -= curve_delta(is_buy, amount);
            assert_eq!(curve + trader, initial);
        }

        assert_eq!(curve, Decimal::from(700));
        assert_eq!(trader, Decimal::from(300));
    }

    #[test]
    fn test_legend_stamped_at_first_crossing() {
        let target = Decimal::from(1000);
        assert!(should_stamp_legend(None, Decimal::from(1000), target));
        assert!(should_stamp_legend(None, Decimal::from(2000), target));
    }

    #[test]
    fn test_legend_not_stamped_below_target() {
        let target = Decimal::from(1000);
        assert!(!should_stamp_legend(None, Decimal::from(999), target));
    }

    #[test]
    fn test_legend_never_restamped() {
        // Even a higher reserve leaves an already-stamped milestone alone.
        let target = Decimal::from(1000);
        assert!(!should_stamp_legend(Some(7), Decimal::from(5000), target));
    }
}
