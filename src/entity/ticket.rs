use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::base_time::Timestamped;
use crate::sentiment::Sentiment;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub created_by: Option<i32>,
    pub type_id: Option<i32>,
    pub department_id: Option<i32>,
    pub status_id: Option<i32>,
    pub priority: Priority,
    pub assigned_to: Option<i32>,
    /// 첫 번째 게시글이 등록될 때 한 번만 채워진다.
    pub sentiment: Option<Sentiment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum Priority {
    #[default]
    #[sea_orm(num_value = 1)]
    High,
    #[sea_orm(num_value = 2)]
    Medium,
    #[sea_orm(num_value = 3)]
    Low,
}

impl Priority {
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            1 => Some(Priority::High),
            2 => Some(Priority::Medium),
            3 => Some(Priority::Low),
            _ => None,
        }
    }

    pub fn value(&self) -> i32 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Creator,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AssignedTo",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Assignee,

    #[sea_orm(
        belongs_to = "super::ticket_type::Entity",
        from = "Column::TypeId",
        to = "super::ticket_type::Column::Id",
        on_delete = "SetNull"
    )]
    TicketType,

    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id",
        on_delete = "SetNull"
    )]
    Department,

    #[sea_orm(
        belongs_to = "super::status::Entity",
        from = "Column::StatusId",
        to = "super::status::Column::Id",
        on_delete = "SetNull"
    )]
    Status,

    #[sea_orm(has_many = "super::ticket_post::Entity")]
    Posts,

    #[sea_orm(has_many = "super::ticket_follower::Entity")]
    Followers,
}

impl Related<super::ticket_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TicketType.def()
    }
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::status::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Status.def()
    }
}

impl Related<super::ticket_post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::ticket_follower::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Followers.def()
    }
}

impl Timestamped for ActiveModel {
    fn set_created_at(&mut self, dt: DateTime<Utc>) {
        self.created_at = Set(dt);
    }

    fn set_updated_at(&mut self, dt: DateTime<Utc>) {
        self.updated_at = Set(dt);
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        Ok(self.stamp(insert))
    }
}
