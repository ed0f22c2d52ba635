use sea_orm_migration::prelude::*;
use sea_orm_migration::prelude::extension::postgres::Type;

#[derive(DeriveIden)]
enum PointTransactions {
    Table,
    Id,
    UserId,
    OrderId,
    Kind,
    Amount,
    Description,
    ExpiresAt,
    SourceTransactionId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Coupons {
    Table,
    Id,
    Code,
    Name,
    DiscountType,
    DiscountValue,
    MinOrderAmount,
    MaxDiscountAmount,
    IsActive,
    UsageLimit,
    UsedCount,
    CreatedAt,
}

#[derive(DeriveIden)]
enum UserCoupons {
    Table,
    Id,
    UserId,
    CouponId,
    IsUsed,
    UsedAt,
    UsedOrderId,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Ledger entry kinds. Clawback is the refund-triggered reversal of a
        // prior earn; restoring spent points is a separate concern and not a
        // kind here.
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("point_transaction_kind"))
                    .values(vec![
                        Alias::new("earned"),
                        Alias::new("bonus"),
                        Alias::new("used"),
                        Alias::new("expired"),
                        Alias::new("clawback"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("coupon_discount_type"))
                    .values(vec![
                        Alias::new("percentage"),
                        Alias::new("fixed_amount"),
                    ])
                    .to_owned(),
            )
            .await?;

        // Append-only point transaction log
        manager
            .create_table(
                Table::create()
                    .table(PointTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PointTransactions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PointTransactions::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointTransactions::OrderId)
                            .string_len(64)
                            .null(), // NULL = manual/administrative grant
                    )
                    .col(
                        ColumnDef::new(PointTransactions::Kind)
                            .custom(Alias::new("point_transaction_kind"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointTransactions::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointTransactions::Description)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PointTransactions::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PointTransactions::SourceTransactionId)
                            .big_integer()
                            .null(), // set on expired rows, references the offset earn
                    )
                    .col(
                        ColumnDef::new(PointTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_point_transactions_user_created")
                    .table(PointTransactions::Table)
                    .col(PointTransactions::UserId)
                    .col(PointTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Coupon catalog templates
        manager
            .create_table(
                Table::create()
                    .table(Coupons::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Coupons::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Coupons::Code)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Coupons::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Coupons::DiscountType)
                            .custom(Alias::new("coupon_discount_type"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::DiscountValue)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::MinOrderAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Coupons::MaxDiscountAmount)
                            .big_integer()
                            .null(), // NULL = uncapped
                    )
                    .col(
                        ColumnDef::new(Coupons::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Coupons::UsageLimit).big_integer().null())
                    .col(
                        ColumnDef::new(Coupons::UsedCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Coupons::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // User coupon claims
        manager
            .create_table(
                Table::create()
                    .table(UserCoupons::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserCoupons::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserCoupons::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(UserCoupons::CouponId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserCoupons::IsUsed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(UserCoupons::UsedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(UserCoupons::UsedOrderId)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(UserCoupons::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserCoupons::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_user_coupons_user_is_used")
                    .table(UserCoupons::Table)
                    .col(UserCoupons::UserId)
                    .col(UserCoupons::IsUsed)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserCoupons::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Coupons::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PointTransactions::Table).to_owned())
            .await?;
        manager
            .drop_type(
                Type::drop()
                    .name(Alias::new("coupon_discount_type"))
                    .to_owned(),
            )
            .await?;
        manager
            .drop_type(
                Type::drop()
                    .name(Alias::new("point_transaction_kind"))
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
