pub use sea_orm_migration::prelude::*;

mod m20260412_000001_initial;
mod m20260425_000001_add_ledger_constraints;
mod m20260503_000001_add_point_accounts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260412_000001_initial::Migration),
            Box::new(m20260425_000001_add_ledger_constraints::Migration),
            Box::new(m20260503_000001_add_point_accounts::Migration),
        ]
    }
}
