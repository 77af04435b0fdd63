pub use sea_orm_migration::prelude::*;

mod m20250502_233100_create_users_table;
mod m20250502_233200_create_companies_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250502_233100_create_users_table::Migration),
            Box::new(m20250502_233200_create_companies_tables::Migration),
        ]
    }
}
