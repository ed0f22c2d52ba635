use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Storage-level idempotency for the ledger.
///
/// - One `earned` entry per (user, order): a retried order-completion
///   webhook hits the unique index instead of racing a check-then-act
///   lookup. The violation is translated to DuplicateTransaction by the
///   service layer.
/// - One offsetting `expired` entry per source row: the batch expiry
///   sweep stays idempotent even if two sweeps overlap.
///
/// Partial indexes are not expressible through the sea-query builder, so
/// these are raw statements.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_point_transactions_earn_once \
             ON point_transactions (user_id, order_id, kind) \
             WHERE kind = 'earned'",
        )
        .await?;

        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_point_transactions_expire_once \
             ON point_transactions (source_transaction_id) \
             WHERE source_transaction_id IS NOT NULL",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP INDEX IF EXISTS uq_point_transactions_expire_once")
            .await?;
        db.execute_unprepared("DROP INDEX IF EXISTS uq_point_transactions_earn_once")
            .await?;
        Ok(())
    }
}
