//! 티켓 라이프사이클 연산.
//!
//! 모든 연산은 하나의 트랜잭션에서 티켓 행을 잠근 뒤(`SELECT ... FOR UPDATE`) 수정한다.
//! 같은 티켓에 대한 동시 요청은 잠금 순서대로 직렬화된다.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use tracing::{error, info, instrument};

use super::attachment::{Attachment, FileStore, StoredFile};
use super::lookup;
use crate::entity::ticket::{self, Priority};
use crate::entity::{department, status, ticket_follower, ticket_post, user};
use crate::model::global_error::{AppError, ErrorCode, ValidationFieldError};
use crate::model::ticket::{parse_flag, PostForm};
use crate::notify::Notifier;
use crate::sentiment;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_MESSAGE_LEN: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct NewTicket {
    pub title: String,
    pub ticket_type: Option<i32>,
    pub department: Option<i32>,
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub message: String,
    pub private: bool,
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone, Default)]
pub struct TicketChanges {
    pub title: Option<String>,
    pub ticket_type: Option<i32>,
    pub department: Option<i32>,
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub message: Option<String>,
    pub private: Option<bool>,
    pub attachment: Option<Attachment>,
}

impl NewPost {
    /// multipart 폼(API add_post, 화면 답글 폼 공통)에서 게시글 입력을 만든다.
    pub async fn from_form(form: PostForm) -> Result<Self, AppError> {
        let attachment = match form.upload {
            Some(upload) => Attachment::from_temp_file(upload).await?,
            None => None,
        };

        Ok(Self {
            message: form.message.map(|m| m.into_inner()).unwrap_or_default(),
            private: parse_flag(form.private.as_ref().map(|p| p.as_str())),
            attachment,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowAction {
    Followed,
    Unfollowed,
}

fn validate_title(title: &str, errors: &mut Vec<ValidationFieldError>) {
    let title = title.trim();
    if title.is_empty() {
        errors.push(ValidationFieldError::new("title", "This field is required."));
    } else if title.chars().count() > MAX_TITLE_LEN {
        errors.push(ValidationFieldError::new(
            "title",
            format!("Ensure this field has no more than {} characters.", MAX_TITLE_LEN),
        ));
    }
}

fn validate_message(message: &str, errors: &mut Vec<ValidationFieldError>) {
    let message = message.trim();
    if message.is_empty() {
        errors.push(ValidationFieldError::new("message", "This field is required."));
    } else if message.chars().count() > MAX_MESSAGE_LEN {
        errors.push(ValidationFieldError::new(
            "message",
            format!("Ensure this field has no more than {} characters.", MAX_MESSAGE_LEN),
        ));
    }
}

fn parse_priority(value: Option<i32>, errors: &mut Vec<ValidationFieldError>) -> Option<Priority> {
    let value = value?;
    let priority = Priority::from_value(value);
    if priority.is_none() {
        errors.push(ValidationFieldError::new(
            "priority",
            format!("Select a valid choice. {} is not one of the available choices.", value),
        ));
    }
    priority
}

fn into_result(errors: Vec<ValidationFieldError>) -> Result<(), AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::ValidationError(errors))
    }
}

async fn lock_ticket(txn: &DatabaseTransaction, ticket_id: i32) -> Result<ticket::Model, AppError> {
    ticket::Entity::find_by_id(ticket_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::TicketNotFound))
}

/// `updated_at` 만 갱신한다 (`before_save` 가 채운다).
async fn touch(txn: &DatabaseTransaction, ticket: ticket::Model) -> Result<ticket::Model, AppError> {
    let active: ticket::ActiveModel = ticket.into();
    Ok(active.update(txn).await?)
}

async fn store_attachment(
    store: &FileStore,
    attachment: Option<&Attachment>,
) -> Result<Option<StoredFile>, AppError> {
    match attachment {
        Some(attachment) => Ok(Some(store.save(attachment).await?)),
        None => Ok(None),
    }
}

/// 트랜잭션이 실패하면 이미 저장한 파일을 지운다.
async fn discard_on_error<T>(
    store: &FileStore,
    stored: Option<&StoredFile>,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    if result.is_err() {
        if let Some(stored) = stored {
            store.remove(&stored.path).await;
        }
    }
    result
}

/// 게시글을 추가하고, 티켓의 첫 게시글이면 감성 분석 결과를 기록한다.
/// 감성은 한 번만 기록한다. 유일한 게시글을 지운 뒤 다시 올려도 덮어쓰지 않는다.
/// 호출자가 티켓 행을 잠근 상태여야 한다.
async fn append_post(
    txn: &DatabaseTransaction,
    ticket: ticket::Model,
    author: i32,
    post: &NewPost,
    stored: Option<&StoredFile>,
) -> Result<(ticket::Model, ticket_post::Model), AppError> {
    let created = ticket_post::ActiveModel {
        ticket_id: Set(ticket.id),
        user_id: Set(Some(author)),
        message: Set(post.message.trim().to_string()),
        private: Set(post.private),
        upload: Set(stored.map(|s| s.path.clone())),
        upload_checksum: Set(stored.map(|s| s.checksum.clone())),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    let post_count = ticket_post::Entity::find()
        .filter(ticket_post::Column::TicketId.eq(ticket.id))
        .count(txn)
        .await?;

    let mut ticket = touch(txn, ticket).await?;
    if post_count == 1 && ticket.sentiment.is_none() {
        ticket = record_sentiment(txn, ticket, &created.message).await;
    }

    Ok((ticket, created))
}

/// 첫 게시글의 감성을 저장한다. 실패해도 티켓/게시글 생성은 계속된다.
async fn record_sentiment(
    txn: &DatabaseTransaction,
    ticket: ticket::Model,
    message: &str,
) -> ticket::Model {
    let sentiment = sentiment::classify(message);

    let saved = async {
        let savepoint = txn.begin().await?;
        let mut active: ticket::ActiveModel = ticket.clone().into();
        active.sentiment = Set(Some(sentiment));
        let updated = active.update(&savepoint).await?;
        savepoint.commit().await?;
        Ok::<_, sea_orm::DbErr>(updated)
    }
    .await;

    match saved {
        Ok(updated) => {
            info!(ticket_id = updated.id, sentiment = sentiment.label(), "감성 분석 결과 저장");
            updated
        }
        Err(err) => {
            error!(ticket_id = ticket.id, error = %err, "감성 분석 결과 저장 실패");
            ticket
        }
    }
}

async fn check_lookups(
    txn: &DatabaseTransaction,
    ticket_type: Option<i32>,
    department: Option<i32>,
) -> Result<(), AppError> {
    if let Some(id) = ticket_type {
        lookup::find_ticket_type(txn, id).await?;
    }
    if let Some(id) = department {
        lookup::find_department(txn, id).await?;
    }
    Ok(())
}

/// 티켓과 첫 게시글을 한 트랜잭션으로 만든다. 상태는 항상 "Open" 으로 시작한다.
///
/// 첫 게시글과 함께 커밋되므로 반환된 티켓에는 감성 분석 결과가 이미 들어 있다.
/// 생성 직후 `sentiment` 가 비어 있는 상태는 밖에서 관찰되지 않는다.
/// 저장에 실패한 경우에만 `None` 으로 남는다.
#[instrument(skip(db, store, post), fields(title = %ticket.title))]
pub async fn create_ticket(
    db: &DatabaseConnection,
    store: &FileStore,
    creator: i32,
    ticket: NewTicket,
    post: NewPost,
) -> Result<(ticket::Model, ticket_post::Model), AppError> {
    let mut errors = Vec::new();
    validate_title(&ticket.title, &mut errors);
    let priority = parse_priority(ticket.priority, &mut errors);
    validate_message(&post.message, &mut errors);
    into_result(errors)?;

    let stored = store_attachment(store, post.attachment.as_ref()).await?;

    let result = async {
        let txn = db.begin().await?;

        let open = lookup::open_status(&txn).await?;
        check_lookups(&txn, ticket.ticket_type, ticket.department).await?;

        let created = ticket::ActiveModel {
            title: Set(ticket.title.trim().to_string()),
            created_by: Set(Some(creator)),
            type_id: Set(ticket.ticket_type),
            department_id: Set(ticket.department),
            status_id: Set(Some(open.id)),
            priority: Set(priority.unwrap_or_default()),
            assigned_to: Set(None),
            sentiment: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let (created, first_post) = append_post(&txn, created, creator, &post, stored.as_ref()).await?;
        txn.commit().await?;
        Ok::<_, AppError>((created, first_post))
    }
    .await;

    let (created, first_post) = discard_on_error(store, stored.as_ref(), result).await?;
    info!(ticket_id = created.id, creator, "티켓 생성 완료");
    Ok((created, first_post))
}

/// 게시글을 추가하고 커밋 후 관련자에게 알림을 보낸다 (작성자 본인 제외).
#[instrument(skip(db, store, notifier, post))]
pub async fn add_post(
    db: &DatabaseConnection,
    store: &FileStore,
    notifier: &Notifier,
    ticket_id: i32,
    author: i32,
    post: NewPost,
) -> Result<ticket_post::Model, AppError> {
    let mut errors = Vec::new();
    validate_message(&post.message, &mut errors);
    into_result(errors)?;

    let stored = store_attachment(store, post.attachment.as_ref()).await?;

    let result = async {
        let txn = db.begin().await?;
        let ticket = lock_ticket(&txn, ticket_id).await?;
        let appended = append_post(&txn, ticket, author, &post, stored.as_ref()).await?;
        txn.commit().await?;
        Ok::<_, AppError>(appended)
    }
    .await;

    let (ticket, created) = discard_on_error(store, stored.as_ref(), result).await?;
    info!(ticket_id, post_id = created.id, "게시글 등록 완료");

    notifier.dispatch(db.clone(), ticket, created.clone(), Some(author));
    Ok(created)
}

/// 현재 담당자와 같아도 그대로 다시 지정한다.
#[instrument(skip(db))]
pub async fn assign_to_self(
    db: &DatabaseConnection,
    ticket_id: i32,
    actor: i32,
) -> Result<ticket::Model, AppError> {
    let txn = db.begin().await?;
    let ticket = lock_ticket(&txn, ticket_id).await?;

    let mut active: ticket::ActiveModel = ticket.into();
    active.assigned_to = Set(Some(actor));
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    info!(ticket_id, assignee = actor, "담당자 지정 (본인)");
    Ok(updated)
}

#[instrument(skip(db))]
pub async fn assign_to_user(
    db: &DatabaseConnection,
    ticket_id: i32,
    target_user: i32,
) -> Result<(ticket::Model, user::Model), AppError> {
    let txn = db.begin().await?;
    let ticket = lock_ticket(&txn, ticket_id).await?;
    let assignee = lookup::find_user(&txn, target_user).await?;

    let mut active: ticket::ActiveModel = ticket.into();
    active.assigned_to = Set(Some(assignee.id));
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    info!(ticket_id, assignee = assignee.id, "담당자 지정");
    Ok((updated, assignee))
}

#[instrument(skip(db))]
pub async fn transfer_department(
    db: &DatabaseConnection,
    ticket_id: i32,
    department_id: i32,
) -> Result<(ticket::Model, department::Model), AppError> {
    let txn = db.begin().await?;
    let ticket = lock_ticket(&txn, ticket_id).await?;
    let department = lookup::find_department(&txn, department_id).await?;

    let mut active: ticket::ActiveModel = ticket.into();
    active.department_id = Set(Some(department.id));
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    info!(ticket_id, department = %department.label, "부서 이관");
    Ok((updated, department))
}

#[instrument(skip(db))]
pub async fn change_status(
    db: &DatabaseConnection,
    ticket_id: i32,
    status_id: i32,
) -> Result<(ticket::Model, status::Model), AppError> {
    let txn = db.begin().await?;
    let ticket = lock_ticket(&txn, ticket_id).await?;
    let status = lookup::find_status(&txn, status_id).await?;

    let mut active: ticket::ActiveModel = ticket.into();
    active.status_id = Set(Some(status.id));
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    info!(ticket_id, status = %status.label, "상태 변경");
    Ok((updated, status))
}

/// 팔로워는 (ticket_id, user_id) 행 단위로 추가/삭제하므로
/// 서로 다른 사용자의 동시 토글이 서로를 덮어쓰지 않는다.
#[instrument(skip(db))]
pub async fn toggle_follow(
    db: &DatabaseConnection,
    ticket_id: i32,
    user_id: i32,
) -> Result<FollowAction, AppError> {
    let txn = db.begin().await?;
    let ticket = lock_ticket(&txn, ticket_id).await?;

    let existing = ticket_follower::Entity::find_by_id((ticket_id, user_id))
        .one(&txn)
        .await?;

    let action = if existing.is_some() {
        ticket_follower::Entity::delete_many()
            .filter(ticket_follower::Column::TicketId.eq(ticket_id))
            .filter(ticket_follower::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        FollowAction::Unfollowed
    } else {
        lookup::find_user(&txn, user_id).await?;
        ticket_follower::Entity::insert(ticket_follower::ActiveModel {
            ticket_id: Set(ticket_id),
            user_id: Set(user_id),
            followed_at: Set(chrono::Utc::now()),
        })
        .on_conflict_do_nothing()
        .exec_without_returning(&txn)
        .await?;
        FollowAction::Followed
    };

    touch(&txn, ticket).await?;
    txn.commit().await?;
    info!(ticket_id, user_id, ?action, "팔로우 토글");
    Ok(action)
}

pub async fn is_following(
    db: &DatabaseConnection,
    ticket_id: i32,
    user_id: i32,
) -> Result<bool, AppError> {
    Ok(ticket_follower::Entity::find_by_id((ticket_id, user_id))
        .one(db)
        .await?
        .is_some())
}

/// 티켓과 게시글, 팔로워를 함께 삭제한다. 첨부 파일은 커밋 후 지운다.
#[instrument(skip(db, store))]
pub async fn delete_ticket(
    db: &DatabaseConnection,
    store: &FileStore,
    ticket_id: i32,
) -> Result<(), AppError> {
    let txn = db.begin().await?;
    lock_ticket(&txn, ticket_id).await?;

    let uploads: Vec<Option<String>> = ticket_post::Entity::find()
        .select_only()
        .column(ticket_post::Column::Upload)
        .filter(ticket_post::Column::TicketId.eq(ticket_id))
        .into_tuple()
        .all(&txn)
        .await?;

    let posts = ticket_post::Entity::delete_many()
        .filter(ticket_post::Column::TicketId.eq(ticket_id))
        .exec(&txn)
        .await?;
    ticket_follower::Entity::delete_many()
        .filter(ticket_follower::Column::TicketId.eq(ticket_id))
        .exec(&txn)
        .await?;
    ticket::Entity::delete_by_id(ticket_id).exec(&txn).await?;

    txn.commit().await?;

    for path in uploads.into_iter().flatten() {
        store.remove(&path).await;
    }
    info!(ticket_id, posts = posts.rows_affected, "티켓 삭제 완료");
    Ok(())
}

#[instrument(skip(db))]
pub async fn update_ticket(
    db: &DatabaseConnection,
    ticket_id: i32,
    changes: TicketChanges,
) -> Result<ticket::Model, AppError> {
    let mut errors = Vec::new();
    if let Some(title) = &changes.title {
        validate_title(title, &mut errors);
    }
    let priority = parse_priority(changes.priority, &mut errors);
    into_result(errors)?;

    let txn = db.begin().await?;
    let ticket = lock_ticket(&txn, ticket_id).await?;
    check_lookups(&txn, changes.ticket_type, changes.department).await?;

    let mut active: ticket::ActiveModel = ticket.into();
    if let Some(title) = changes.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(type_id) = changes.ticket_type {
        active.type_id = Set(Some(type_id));
    }
    if let Some(department_id) = changes.department {
        active.department_id = Set(Some(department_id));
    }
    if let Some(priority) = priority {
        active.priority = Set(priority);
    }
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    info!(ticket_id, "티켓 수정 완료");
    Ok(updated)
}

async fn lock_post(txn: &DatabaseTransaction, post_id: i32) -> Result<(ticket::Model, ticket_post::Model), AppError> {
    let post = ticket_post::Entity::find_by_id(post_id)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::PostNotFound))?;
    let ticket = lock_ticket(txn, post.ticket_id).await?;
    Ok((ticket, post))
}

/// 게시글 수정. 감성 분석은 다시 하지 않는다.
#[instrument(skip(db, store, changes))]
pub async fn update_post(
    db: &DatabaseConnection,
    store: &FileStore,
    post_id: i32,
    changes: PostChanges,
) -> Result<ticket_post::Model, AppError> {
    let mut errors = Vec::new();
    if let Some(message) = &changes.message {
        validate_message(message, &mut errors);
    }
    into_result(errors)?;

    let stored = store_attachment(store, changes.attachment.as_ref()).await?;

    let result = async {
        let txn = db.begin().await?;
        let (ticket, post) = lock_post(&txn, post_id).await?;
        let replaced = post.upload.clone();

        let mut active: ticket_post::ActiveModel = post.into();
        if let Some(message) = &changes.message {
            active.message = Set(message.trim().to_string());
        }
        if let Some(private) = changes.private {
            active.private = Set(private);
        }
        if let Some(stored) = &stored {
            active.upload = Set(Some(stored.path.clone()));
            active.upload_checksum = Set(Some(stored.checksum.clone()));
        }
        let updated = active.update(&txn).await?;
        touch(&txn, ticket).await?;

        txn.commit().await?;
        Ok::<_, AppError>((updated, replaced))
    }
    .await;

    let (updated, replaced) = discard_on_error(store, stored.as_ref(), result).await?;
    if stored.is_some() {
        if let Some(old) = replaced {
            store.remove(&old).await;
        }
    }
    info!(post_id, ticket_id = updated.ticket_id, "게시글 수정 완료");
    Ok(updated)
}

/// 게시글 삭제. 삭제된 게시글이 속했던 티켓 id 를 돌려준다.
#[instrument(skip(db, store))]
pub async fn delete_post(
    db: &DatabaseConnection,
    store: &FileStore,
    post_id: i32,
) -> Result<i32, AppError> {
    let txn = db.begin().await?;
    let (ticket, post) = lock_post(&txn, post_id).await?;
    let ticket_id = ticket.id;

    ticket_post::Entity::delete_by_id(post.id).exec(&txn).await?;
    touch(&txn, ticket).await?;
    txn.commit().await?;

    if let Some(path) = &post.upload {
        store.remove(path).await;
    }
    info!(post_id, ticket_id, "게시글 삭제 완료");
    Ok(ticket_id)
}
