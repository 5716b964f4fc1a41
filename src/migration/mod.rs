pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_user_table;
mod m20250601_000002_create_lookup_tables;
mod m20250601_000003_create_ticket_table;
mod m20250601_000004_create_ticket_post_table;
mod m20250601_000005_create_ticket_follower_table;
mod m20250601_000006_seed_lookups;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_user_table::Migration),
            Box::new(m20250601_000002_create_lookup_tables::Migration),
            Box::new(m20250601_000003_create_ticket_table::Migration),
            Box::new(m20250601_000004_create_ticket_post_table::Migration),
            Box::new(m20250601_000005_create_ticket_follower_table::Migration),
            Box::new(m20250601_000006_seed_lookups::Migration),
        ]
    }
}
