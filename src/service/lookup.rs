use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::entity::{department, status, ticket_type, user};
use crate::model::global_error::{AppError, ErrorCode};

pub async fn list_statuses<C: ConnectionTrait>(db: &C) -> Result<Vec<status::Model>, AppError> {
    Ok(status::Entity::find()
        .order_by_asc(status::Column::Id)
        .all(db)
        .await?)
}

pub async fn find_status<C: ConnectionTrait>(db: &C, id: i32) -> Result<status::Model, AppError> {
    status::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::StatusNotFound))
}

/// 새 티켓의 초기 상태. 시드 데이터가 없으면 설정 오류로 취급한다.
pub async fn open_status<C: ConnectionTrait>(db: &C) -> Result<status::Model, AppError> {
    status::Entity::find()
        .filter(status::Column::Label.eq(status::OPEN))
        .one(db)
        .await?
        .ok_or_else(|| {
            tracing::error!(label = status::OPEN, "초기 상태 시드 데이터가 없습니다");
            AppError::internal_error(ErrorCode::OpenStatusMissing)
        })
}

pub async fn list_departments<C: ConnectionTrait>(db: &C) -> Result<Vec<department::Model>, AppError> {
    Ok(department::Entity::find()
        .order_by_asc(department::Column::Label)
        .all(db)
        .await?)
}

pub async fn find_department<C: ConnectionTrait>(db: &C, id: i32) -> Result<department::Model, AppError> {
    department::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::DepartmentNotFound))
}

pub async fn list_ticket_types<C: ConnectionTrait>(db: &C) -> Result<Vec<ticket_type::Model>, AppError> {
    Ok(ticket_type::Entity::find()
        .order_by_asc(ticket_type::Column::Id)
        .all(db)
        .await?)
}

pub async fn find_ticket_type<C: ConnectionTrait>(db: &C, id: i32) -> Result<ticket_type::Model, AppError> {
    ticket_type::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::TicketTypeNotFound))
}

pub async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::MemberNotFound))
}

/// 담당자 지정 목록에 쓰는 활성 사용자
pub async fn active_users<C: ConnectionTrait>(db: &C) -> Result<Vec<user::Model>, AppError> {
    Ok(user::Entity::find()
        .filter(user::Column::IsActive.eq(true))
        .order_by_asc(user::Column::Username)
        .all(db)
        .await?)
}
