use crate::config::LoyaltyConfig;
use crate::entities::{
    point_account_entity as accounts, point_transaction_entity as transactions,
    PointTransactionKind,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    BalanceResponse, EarnPointsResponse, PaginatedResponse, PaginationParams,
    PointStatisticsResponse, PointTransactionQuery, PointTransactionResponse, RefundPointsResponse,
    SpendPointsResponse,
};
use crate::utils::{points_for_order, proportional_clawback};
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    Insert, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    SqlErr, TransactionTrait,
};
use std::collections::BTreeMap;

/// Signed contribution of one ledger entry to the balance.
pub fn signed_amount(t: &transactions::Model) -> i64 {
    if t.kind.is_credit() {
        t.amount
    } else {
        -t.amount
    }
}

/// Raw fold of a user's log. May be transiently negative after an
/// administrative expiry outran spending; committed writes are checked
/// against the clamped value, never this one.
pub fn fold_signed(log: &[transactions::Model]) -> i64 {
    log.iter().map(signed_amount).sum()
}

/// Display balance: the fold clamped at zero.
pub fn fold_balance(log: &[transactions::Model]) -> i64 {
    fold_signed(log).max(0)
}

/// Statistics over a user's full log.
pub fn fold_statistics(
    log: &[transactions::Model],
    now: DateTime<Utc>,
    expiring_soon_window: Duration,
) -> PointStatisticsResponse {
    let mut total_earned = 0;
    let mut total_used = 0;
    let mut total_expired = 0;
    let mut expiring_soon = 0;
    let soon_deadline = now + expiring_soon_window;

    for t in log {
        match t.kind {
            PointTransactionKind::Earned | PointTransactionKind::Bonus => {
                total_earned += t.amount;
                if let Some(expires_at) = t.expires_at
                    && expires_at > now
                    && expires_at <= soon_deadline
                {
                    expiring_soon += t.amount;
                }
            }
            PointTransactionKind::Used => total_used += t.amount,
            PointTransactionKind::Expired => total_expired += t.amount,
            PointTransactionKind::Clawback => {}
        }
    }

    PointStatisticsResponse {
        total_earned,
        total_used,
        total_expired,
        current_balance: fold_balance(log),
        expiring_soon,
    }
}

/// First-contact insert for a user's account row. `ON CONFLICT DO
/// NOTHING` keeps a concurrent bootstrap from aborting the surrounding
/// transaction.
fn account_bootstrap_insert(user_id: i64) -> Insert<accounts::ActiveModel> {
    accounts::Entity::insert(accounts::ActiveModel {
        user_id: Set(user_id),
        balance: Set(0),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::column(accounts::Column::UserId)
            .do_nothing()
            .to_owned(),
    )
}

/// Lapsed `earned|bonus` grants that have no offsetting `expired` row
/// yet. The exclusion is an anti-join in SQL, so a sweep only loads the
/// rows it still has to offset rather than every grant ever expired.
fn lapsed_grant_query(now: DateTime<Utc>) -> Select<transactions::Entity> {
    transactions::Entity::find()
        .filter(
            transactions::Column::Kind
                .is_in([PointTransactionKind::Earned, PointTransactionKind::Bonus]),
        )
        .filter(transactions::Column::ExpiresAt.lt(now))
        .filter(
            transactions::Column::Id.not_in_subquery(
                Query::select()
                    .column(transactions::Column::SourceTransactionId)
                    .from(transactions::Entity)
                    .and_where(Expr::col(transactions::Column::SourceTransactionId).is_not_null())
                    .to_owned(),
            ),
        )
}

/// The ledger write API and balance aggregator. The transaction log is
/// the single source of truth; the per-user account row is a cached
/// fold that also serves as the serialization point for writes.
#[derive(Clone)]
pub struct PointService {
    pool: DatabaseConnection,
    settings: LoyaltyConfig,
}

impl PointService {
    pub fn new(pool: DatabaseConnection, settings: LoyaltyConfig) -> Self {
        Self { pool, settings }
    }

    /// Accrue points for a completed order. The order subsystem passes
    /// the order total; the accrual rate comes from configuration. A
    /// total too small to accrue anything is a no-op, not an error.
    pub async fn earn_for_order(
        &self,
        user_id: i64,
        order_id: &str,
        order_amount: i64,
    ) -> AppResult<EarnPointsResponse> {
        if order_amount <= 0 {
            return Err(AppError::ValidationError(
                "Order amount must be positive".to_string(),
            ));
        }
        let points = points_for_order(order_amount, self.settings.accrual_rate_bp);
        if points == 0 {
            return Ok(EarnPointsResponse {
                transaction_id: None,
                points_earned: 0,
                expires_at: None,
            });
        }
        self.earn_points(
            user_id,
            order_id,
            points,
            format!("Earned on order {order_id}"),
        )
        .await
    }

    /// Insert one earned entry. Idempotent per (user, order): a repeat
    /// call trips the partial unique index and is reported as
    /// DuplicateTransaction without having written anything.
    pub async fn earn_points(
        &self,
        user_id: i64,
        order_id: &str,
        amount: i64,
        description: String,
    ) -> AppResult<EarnPointsResponse> {
        if amount <= 0 {
            return Err(AppError::ValidationError(
                "Point amount must be positive".to_string(),
            ));
        }
        if order_id.is_empty() {
            return Err(AppError::ValidationError(
                "Order id must not be empty".to_string(),
            ));
        }

        let expires_at = Utc::now() + Duration::days(self.settings.expiry_days);

        let txn = self.pool.begin().await?;
        let account = self.ensure_account_tx(&txn, user_id).await?;
        let log = self.load_log_tx(&txn, user_id).await?;

        let insert_result = transactions::ActiveModel {
            user_id: Set(user_id),
            order_id: Set(Some(order_id.to_string())),
            kind: Set(PointTransactionKind::Earned),
            amount: Set(amount),
            description: Set(Some(description)),
            expires_at: Set(Some(expires_at)),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        let inserted = match insert_result {
            Ok(model) => model,
            // The unique index is the idempotency guard; the violation
            // is the "already processed" signal.
            Err(e) => {
                return match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        Err(AppError::DuplicateTransaction(format!(
                            "Points already earned for order {order_id}"
                        )))
                    }
                    _ => Err(e.into()),
                };
            }
        };

        let new_balance = (fold_signed(&log) + amount).max(0);
        self.refresh_account_tx(&txn, account, new_balance).await?;
        txn.commit().await?;

        Ok(EarnPointsResponse {
            transaction_id: Some(inserted.id),
            points_earned: amount,
            expires_at: Some(expires_at),
        })
    }

    /// Administrative bonus grant, not tied to an order. Carries the
    /// same expiry window as an earn but no idempotency key; callers
    /// own retry discipline here.
    pub async fn grant_bonus(
        &self,
        user_id: i64,
        amount: i64,
        description: Option<String>,
    ) -> AppResult<EarnPointsResponse> {
        if amount <= 0 {
            return Err(AppError::ValidationError(
                "Point amount must be positive".to_string(),
            ));
        }

        let expires_at = Utc::now() + Duration::days(self.settings.expiry_days);

        let txn = self.pool.begin().await?;
        let account = self.ensure_account_tx(&txn, user_id).await?;
        let log = self.load_log_tx(&txn, user_id).await?;

        let inserted = transactions::ActiveModel {
            user_id: Set(user_id),
            order_id: Set(None),
            kind: Set(PointTransactionKind::Bonus),
            amount: Set(amount),
            description: Set(description),
            expires_at: Set(Some(expires_at)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let new_balance = (fold_signed(&log) + amount).max(0);
        self.refresh_account_tx(&txn, account, new_balance).await?;
        txn.commit().await?;

        Ok(EarnPointsResponse {
            transaction_id: Some(inserted.id),
            points_earned: amount,
            expires_at: Some(expires_at),
        })
    }

    /// Spend points against an order. Balance check and write happen in
    /// one transaction holding the account row lock, so two concurrent
    /// spends cannot both pass the check.
    pub async fn use_points(
        &self,
        user_id: i64,
        order_id: &str,
        amount: i64,
        description: Option<String>,
    ) -> AppResult<SpendPointsResponse> {
        if amount <= 0 {
            return Err(AppError::ValidationError(
                "Point amount must be positive".to_string(),
            ));
        }

        let txn = self.pool.begin().await?;
        let account = self.ensure_account_tx(&txn, user_id).await?;
        let log = self.load_log_tx(&txn, user_id).await?;

        let available = fold_balance(&log);
        if available < amount {
            return Err(AppError::InsufficientBalance {
                required: amount,
                available,
            });
        }

        let inserted = transactions::ActiveModel {
            user_id: Set(user_id),
            order_id: Set(Some(order_id.to_string())),
            kind: Set(PointTransactionKind::Used),
            amount: Set(amount),
            description: Set(description),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let new_balance = (fold_signed(&log) - amount).max(0);
        self.refresh_account_tx(&txn, account, new_balance).await?;
        txn.commit().await?;

        Ok(SpendPointsResponse {
            transaction_id: inserted.id,
            points_spent: amount,
            balance: new_balance,
        })
    }

    /// Claw back previously earned points after a (partial) refund.
    /// Proportional to the refunded share, rounded down, and capped so
    /// repeated partial refunds never reverse more than the original
    /// earn.
    pub async fn refund_points(
        &self,
        user_id: i64,
        order_id: &str,
        refund_amount: i64,
        original_order_amount: i64,
    ) -> AppResult<RefundPointsResponse> {
        if original_order_amount <= 0 {
            return Err(AppError::InvalidRatio(format!(
                "Original order amount must be positive, got {original_order_amount}"
            )));
        }

        let txn = self.pool.begin().await?;
        let account = self.ensure_account_tx(&txn, user_id).await?;
        let log = self.load_log_tx(&txn, user_id).await?;

        let order_entries: Vec<&transactions::Model> = log
            .iter()
            .filter(|t| t.order_id.as_deref() == Some(order_id))
            .collect();

        let total_earned: i64 = order_entries
            .iter()
            .filter(|t| t.kind == PointTransactionKind::Earned)
            .map(|t| t.amount)
            .sum();
        if total_earned == 0 {
            return Err(AppError::NotFound(format!(
                "No earned points found for order {order_id}"
            )));
        }

        let already_clawed: i64 = order_entries
            .iter()
            .filter(|t| t.kind == PointTransactionKind::Clawback)
            .map(|t| t.amount)
            .sum();

        let desired = proportional_clawback(total_earned, refund_amount, original_order_amount)?;
        let clawback = desired.min(total_earned - already_clawed);

        if clawback <= 0 {
            // Nothing left to reverse; not an error.
            let balance = fold_balance(&log);
            return Ok(RefundPointsResponse {
                transaction_id: None,
                points_clawed_back: 0,
                balance,
            });
        }

        let available = fold_balance(&log);
        if available < clawback {
            return Err(AppError::InsufficientBalance {
                required: clawback,
                available,
            });
        }

        let inserted = transactions::ActiveModel {
            user_id: Set(user_id),
            order_id: Set(Some(order_id.to_string())),
            kind: Set(PointTransactionKind::Clawback),
            amount: Set(clawback),
            description: Set(Some(format!(
                "Refund of {refund_amount}/{original_order_amount} on order {order_id}"
            ))),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let new_balance = (fold_signed(&log) - clawback).max(0);
        self.refresh_account_tx(&txn, account, new_balance).await?;
        txn.commit().await?;

        Ok(RefundPointsResponse {
            transaction_id: Some(inserted.id),
            points_clawed_back: clawback,
            balance: new_balance,
        })
    }

    /// Batch expiry sweep. Appends one offsetting `expired` entry per
    /// lapsed grant instead of mutating it; the unique index on
    /// `source_transaction_id` makes overlapping sweeps expire each
    /// grant exactly once. Returns the number of grants expired.
    pub async fn expire_points(&self) -> AppResult<u64> {
        let now = Utc::now();

        let candidates = lapsed_grant_query(now).all(&self.pool).await?;
        if candidates.is_empty() {
            return Ok(0);
        }

        let mut by_user: BTreeMap<i64, Vec<transactions::Model>> = BTreeMap::new();
        for t in candidates {
            by_user.entry(t.user_id).or_default().push(t);
        }

        let mut expired_count = 0u64;
        for (user_id, lapsed) in by_user {
            let txn = self.pool.begin().await?;
            let account = self.ensure_account_tx(&txn, user_id).await?;

            let mut user_expired = 0u64;
            let mut lost_race = false;
            for grant in &lapsed {
                let insert_result = transactions::ActiveModel {
                    user_id: Set(user_id),
                    order_id: Set(grant.order_id.clone()),
                    kind: Set(PointTransactionKind::Expired),
                    amount: Set(grant.amount),
                    description: Set(Some(format!("Expired grant {}", grant.id))),
                    source_transaction_id: Set(Some(grant.id)),
                    ..Default::default()
                }
                .insert(&txn)
                .await;

                match insert_result {
                    Ok(_) => user_expired += 1,
                    // A concurrent sweep offset this grant first. The
                    // violation aborts the whole transaction on Postgres,
                    // so hand this user over to the competing sweep.
                    Err(e) => match e.sql_err() {
                        Some(SqlErr::UniqueConstraintViolation(_)) => {
                            log::debug!("Grant {} already expired by another sweep", grant.id);
                            lost_race = true;
                            break;
                        }
                        _ => return Err(e.into()),
                    },
                }
            }
            if lost_race {
                txn.rollback().await?;
                continue;
            }

            let log = self.load_log_tx(&txn, user_id).await?;
            let new_balance = fold_balance(&log);
            self.refresh_account_tx(&txn, account, new_balance).await?;
            txn.commit().await?;
            expired_count += user_expired;
        }

        Ok(expired_count)
    }

    /// Current balance, folded from the full log.
    pub async fn get_balance(&self, user_id: i64) -> AppResult<BalanceResponse> {
        let log = self.load_log(user_id).await?;
        Ok(BalanceResponse {
            user_id,
            balance: fold_balance(&log),
        })
    }

    /// Earned/used/expired totals plus the expiring-soon window sum.
    pub async fn get_statistics(&self, user_id: i64) -> AppResult<PointStatisticsResponse> {
        let log = self.load_log(user_id).await?;
        Ok(fold_statistics(
            &log,
            Utc::now(),
            Duration::days(self.settings.expiring_soon_days),
        ))
    }

    /// Paginated transaction history, newest first.
    pub async fn list_transactions(
        &self,
        user_id: i64,
        query: &PointTransactionQuery,
    ) -> AppResult<PaginatedResponse<PointTransactionResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let base_query =
            transactions::Entity::find().filter(transactions::Column::UserId.eq(user_id));

        let total = base_query.clone().count(&self.pool).await? as i64;

        let items = base_query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(PointTransactionResponse::from)
            .collect();

        Ok(PaginatedResponse::new(
            items,
            params.get_page(),
            params.get_limit(),
            total,
        ))
    }

    // -----------------------------
    // Internal helpers
    // -----------------------------

    /// Lock the user's account row for the duration of the transaction,
    /// creating it on first contact. Bootstrap is `ON CONFLICT DO
    /// NOTHING` plus a re-select, so when two first-ever writes race the
    /// loser blocks on the winner's insert and then locks the committed
    /// row instead of failing on the primary key.
    async fn ensure_account_tx(
        &self,
        txn: &DatabaseTransaction,
        user_id: i64,
    ) -> Result<accounts::Model, DbErr> {
        if let Some(m) = accounts::Entity::find_by_id(user_id)
            .lock_exclusive()
            .one(txn)
            .await?
        {
            return Ok(m);
        }
        match account_bootstrap_insert(user_id).exec(txn).await {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
        accounts::Entity::find_by_id(user_id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("point account for user {user_id}")))
    }

    async fn refresh_account_tx(
        &self,
        txn: &DatabaseTransaction,
        account: accounts::Model,
        balance: i64,
    ) -> Result<(), DbErr> {
        let mut am = account.into_active_model();
        am.balance = Set(balance);
        am.updated_at = Set(Some(Utc::now()));
        am.update(txn).await?;
        Ok(())
    }

    async fn load_log_tx(
        &self,
        txn: &DatabaseTransaction,
        user_id: i64,
    ) -> Result<Vec<transactions::Model>, DbErr> {
        transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_asc(transactions::Column::Id)
            .all(txn)
            .await
    }

    async fn load_log(&self, user_id: i64) -> Result<Vec<transactions::Model>, DbErr> {
        transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_asc(transactions::Column::Id)
            .all(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    fn entry(
        id: i64,
        kind: PointTransactionKind,
        amount: i64,
        expires_at: Option<DateTime<Utc>>,
    ) -> transactions::Model {
        transactions::Model {
            id,
            user_id: 1,
            order_id: Some(format!("order-{id}")),
            kind,
            amount,
            description: None,
            expires_at,
            source_transaction_id: None,
            created_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_fold_balance_applies_sign_by_kind() {
        let far = Some(Utc::now() + Duration::days(300));
        let log = vec![
            entry(1, PointTransactionKind::Earned, 500, far),
            entry(2, PointTransactionKind::Bonus, 50, far),
            entry(3, PointTransactionKind::Used, 200, None),
            entry(4, PointTransactionKind::Clawback, 100, None),
            entry(5, PointTransactionKind::Expired, 50, None),
        ];
        assert_eq!(fold_signed(&log), 200);
        assert_eq!(fold_balance(&log), 200);
    }

    #[test]
    fn test_fold_balance_clamps_negative_to_zero() {
        let log = vec![
            entry(1, PointTransactionKind::Earned, 100, None),
            entry(2, PointTransactionKind::Expired, 100, None),
            entry(3, PointTransactionKind::Used, 50, None),
        ];
        assert_eq!(fold_signed(&log), -50);
        assert_eq!(fold_balance(&log), 0);
    }

    #[test]
    fn test_fold_balance_empty_log() {
        assert_eq!(fold_balance(&[]), 0);
    }

    #[test]
    fn test_statistics_totals() {
        let now = Utc::now();
        let log = vec![
            entry(1, PointTransactionKind::Earned, 500, Some(now + Duration::days(10))),
            entry(2, PointTransactionKind::Earned, 300, Some(now + Duration::days(90))),
            entry(3, PointTransactionKind::Bonus, 100, Some(now + Duration::days(5))),
            entry(4, PointTransactionKind::Used, 200, None),
            entry(5, PointTransactionKind::Expired, 50, None),
        ];
        let stats = fold_statistics(&log, now, Duration::days(30));
        assert_eq!(stats.total_earned, 900);
        assert_eq!(stats.total_used, 200);
        assert_eq!(stats.total_expired, 50);
        assert_eq!(stats.current_balance, 650);
        // Only the grants expiring within 30 days count
        assert_eq!(stats.expiring_soon, 600);
    }

    #[test]
    fn test_statistics_skips_already_lapsed_grants() {
        let now = Utc::now();
        let log = vec![entry(
            1,
            PointTransactionKind::Earned,
            500,
            Some(now - Duration::days(1)),
        )];
        let stats = fold_statistics(&log, now, Duration::days(30));
        assert_eq!(stats.expiring_soon, 0);
    }

    #[test]
    fn test_spend_then_balance_decreases_by_amount() {
        let far = Some(Utc::now() + Duration::days(300));
        let mut log = vec![entry(1, PointTransactionKind::Earned, 500, far)];
        let before = fold_balance(&log);
        log.push(entry(2, PointTransactionKind::Used, 180, None));
        assert_eq!(fold_balance(&log), before - 180);
    }

    #[test]
    fn test_full_refund_scenario_returns_balance_to_zero() {
        // Earn 500 on a 50,000 order, then fully refund it.
        let far = Some(Utc::now() + Duration::days(300));
        let mut log = vec![entry(1, PointTransactionKind::Earned, 500, far)];
        let clawback = proportional_clawback(500, 50_000, 50_000).unwrap();
        log.push(entry(2, PointTransactionKind::Clawback, clawback, None));
        assert_eq!(fold_balance(&log), 0);
    }

    #[test]
    fn test_account_bootstrap_tolerates_concurrent_insert() {
        let sql = account_bootstrap_insert(7)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(
            sql.contains("ON CONFLICT (\"user_id\") DO NOTHING"),
            "bootstrap insert must not fail on an existing row: {sql}"
        );
    }

    #[test]
    fn test_lapsed_grant_query_excludes_offset_rows_in_sql() {
        let sql = lapsed_grant_query(Utc::now())
            .build(DbBackend::Postgres)
            .to_string();
        assert!(
            sql.contains("NOT IN (SELECT \"source_transaction_id\""),
            "already-offset grants must be excluded by the database: {sql}"
        );
        assert!(sql.contains("\"expires_at\" <"), "{sql}");
    }

    #[test]
    fn test_partial_refund_scenario_leaves_remainder() {
        let far = Some(Utc::now() + Duration::days(300));
        let mut log = vec![entry(1, PointTransactionKind::Earned, 500, far)];
        let clawback = proportional_clawback(500, 20_000, 50_000).unwrap();
        assert_eq!(clawback, 200);
        log.push(entry(2, PointTransactionKind::Clawback, clawback, None));
        assert_eq!(fold_balance(&log), 300);
    }
}
