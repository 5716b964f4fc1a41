use sea_orm::Schema;
use sea_orm_migration::prelude::*;
use crate::entity::ticket_post::{Column, Entity};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());
        manager
            .create_table(
                schema
                    .create_table_from_entity(Entity)
                    .if_not_exists()
                    .to_owned()
            )
            .await?;

        // 첫 게시글 판정(티켓별 게시글 수)과 상세 화면 조회용
        manager
            .create_index(
                Index::create()
                    .name("idx_ticket_posts_ticket_id")
                    .table(Entity)
                    .col(Column::TicketId)
                    .to_owned()
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Entity).to_owned())
            .await
    }
}
