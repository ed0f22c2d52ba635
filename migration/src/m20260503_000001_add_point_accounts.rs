use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum PointAccounts {
    Table,
    UserId,
    Balance,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Materialized balance per user. The transaction log stays canonical;
/// this row is recomputed from the log inside every write transaction
/// while held under FOR UPDATE, so it doubles as the per-user
/// serialization point for spend/clawback balance checks. The CHECK
/// constraint backstops any write that would drive a balance negative.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PointAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PointAccounts::UserId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PointAccounts::Balance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PointAccounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE point_accounts \
                 ADD CONSTRAINT chk_point_accounts_balance_non_negative CHECK (balance >= 0)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PointAccounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
