use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use sea_orm_migration::prelude::*;
use crate::entity::{department, status, ticket_type};

#[derive(DeriveMigrationName)]
pub struct Migration;

const STATUSES: [(&str, &str); 4] = [
    (status::OPEN, "Newly created, waiting for an agent"),
    ("In Progress", "An agent is working on it"),
    ("Resolved", "A fix has been provided"),
    ("Closed", "No further action"),
];

const DEPARTMENTS: [(&str, &str); 1] = [("General Support", "Default queue for new tickets")];

const TICKET_TYPES: [(&str, &str); 3] = [
    ("Incident", "Something is broken"),
    ("Service Request", "Access, hardware or software request"),
    ("Question", "How do I ..."),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        status::Entity::insert_many(STATUSES.map(|(label, description)| status::ActiveModel {
            label: Set(label.to_string()),
            description: Set(Some(description.to_string())),
            ..Default::default()
        }))
        .exec(db)
        .await?;

        department::Entity::insert_many(DEPARTMENTS.map(|(label, description)| department::ActiveModel {
            label: Set(label.to_string()),
            description: Set(Some(description.to_string())),
            ..Default::default()
        }))
        .exec(db)
        .await?;

        ticket_type::Entity::insert_many(TICKET_TYPES.map(|(label, description)| ticket_type::ActiveModel {
            label: Set(label.to_string()),
            description: Set(Some(description.to_string())),
            ..Default::default()
        }))
        .exec(db)
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        ticket_type::Entity::delete_many()
            .filter(ticket_type::Column::Label.is_in(TICKET_TYPES.map(|(label, _)| label)))
            .exec(db)
            .await?;
        department::Entity::delete_many()
            .filter(department::Column::Label.is_in(DEPARTMENTS.map(|(label, _)| label)))
            .exec(db)
            .await?;
        status::Entity::delete_many()
            .filter(status::Column::Label.is_in(STATUSES.map(|(label, _)| label)))
            .exec(db)
            .await?;

        Ok(())
    }
}
