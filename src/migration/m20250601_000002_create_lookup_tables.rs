use sea_orm::{EntityTrait, Schema};
use sea_orm_migration::prelude::*;
use crate::entity::{department, status, ticket_type};

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn create<E: EntityTrait>(manager: &SchemaManager<'_>, schema: &Schema, entity: E) -> Result<(), DbErr> {
    manager
        .create_table(
            schema
                .create_table_from_entity(entity)
                .if_not_exists()
                .to_owned()
        )
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());
        create(manager, &schema, status::Entity).await?;
        create(manager, &schema, department::Entity).await?;
        create(manager, &schema, ticket_type::Entity).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ticket_type::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(department::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(status::Entity).to_owned())
            .await
    }
}
