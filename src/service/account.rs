use bcrypt::{hash, verify, DEFAULT_COST};
use sea_orm::sea_query::Condition;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait};
use tracing::{info, instrument, warn};

use crate::entity::user;
use crate::model::auth::RegisterRequest;
use crate::model::global_error::{AppError, ErrorCode, ValidationFieldError};

pub const DEFAULT_ROLE: &str = "user";

#[instrument(skip(db, request), fields(username = %request.username))]
pub async fn register_user(db: &DatabaseConnection, request: &RegisterRequest) -> Result<user::Model, AppError> {
    validate_register_request(request)?;

    let txn = db.begin().await?;

    let existing_user = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Username.eq(request.username.trim()))
                .add(user::Column::Email.eq(request.email.trim())),
        )
        .one(&txn)
        .await?;

    if existing_user.is_some() {
        return Err(AppError::bad_request(ErrorCode::DuplicateAccount));
    }

    let hashed_password = hash(&request.password, DEFAULT_COST)
        .map_err(|_| AppError::internal_error(ErrorCode::InternalError))?;

    let created = user::ActiveModel {
        username: Set(request.username.trim().to_string()),
        email: Set(Some(request.email.trim().to_string())),
        password: Set(hashed_password),
        role: Set(DEFAULT_ROLE.to_string()),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(user_id = created.id, "회원 가입 완료");
    Ok(created)
}

/// 사용자명 또는 이메일과 비밀번호로 로그인한다.
#[instrument(skip(db, password))]
pub async fn authenticate(db: &DatabaseConnection, login: &str, password: &str) -> Result<user::Model, AppError> {
    validate_login_request(login, password)?;

    let login = login.trim();
    let found = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Username.eq(login))
                .add(user::Column::Email.eq(login)),
        )
        .filter(user::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| AppError::bad_request(ErrorCode::InvalidCredentials))?;

    let is_valid = verify(password, &found.password)
        .map_err(|_| AppError::internal_error(ErrorCode::InternalError))?;

    if !is_valid {
        warn!(user_id = found.id, "비밀번호 불일치");
        return Err(AppError::bad_request(ErrorCode::InvalidCredentials));
    }

    Ok(found)
}

fn validate_login_request(login: &str, password: &str) -> Result<(), AppError> {
    let mut errors = Vec::new();

    if login.trim().is_empty() {
        errors.push(ValidationFieldError::new("username", "This field is required."));
    }

    if password.is_empty() {
        errors.push(ValidationFieldError::new("password", "This field is required."));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::ValidationError(errors))
    }
}

fn validate_register_request(request: &RegisterRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();

    if request.username.trim().is_empty() {
        errors.push(ValidationFieldError::new("username", "This field is required."));
    }

    let email = request.email.trim();
    if email.is_empty() {
        errors.push(ValidationFieldError::new("email", "This field is required."));
    } else if !email.contains('@') {
        errors.push(ValidationFieldError::new("email", "Enter a valid email address."));
    }

    if request.password.len() < 8 {
        errors.push(ValidationFieldError::new(
            "password",
            "This password is too short. It must contain at least 8 characters.",
        ));
    }

    if request.password != request.password2 {
        errors.push(ValidationFieldError::new("password2", "Password fields didn't match."));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::ValidationError(errors))
    }
}
