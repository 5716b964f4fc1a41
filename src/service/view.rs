use std::collections::{HashMap, HashSet};

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use super::attachment::FileStore;
use super::lookup;
use crate::entity::{department, status, ticket, ticket_follower, ticket_post, ticket_type, user};
use crate::model::auth::UserSummary;
use crate::model::global_error::{AppError, ErrorCode};
use crate::model::lookup::{DepartmentResponse, StatusResponse, TicketTypeResponse};
use crate::model::ticket::{PostResponse, TicketResponse, TicketSummaryResponse};

/// 티켓 응답에 필요한 참조 데이터를 한 번에 읽어 둔다.
pub struct TicketRefs {
    users: HashMap<i32, user::Model>,
    statuses: HashMap<i32, status::Model>,
    departments: HashMap<i32, department::Model>,
    types: HashMap<i32, ticket_type::Model>,
}

impl TicketRefs {
    pub async fn load<C: ConnectionTrait>(
        db: &C,
        tickets: &[ticket::Model],
        extra_users: impl IntoIterator<Item = i32>,
    ) -> Result<Self, AppError> {
        let user_ids: HashSet<i32> = tickets
            .iter()
            .flat_map(|t| [t.created_by, t.assigned_to])
            .flatten()
            .chain(extra_users)
            .collect();

        let users = if user_ids.is_empty() {
            HashMap::new()
        } else {
            user::Entity::find()
                .filter(user::Column::Id.is_in(user_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect()
        };

        Ok(Self {
            users,
            statuses: by_id(lookup::list_statuses(db).await?, |s| s.id),
            departments: by_id(lookup::list_departments(db).await?, |d| d.id),
            types: by_id(lookup::list_ticket_types(db).await?, |t| t.id),
        })
    }

    pub fn user(&self, id: Option<i32>) -> Option<&user::Model> {
        id.and_then(|id| self.users.get(&id))
    }

    pub fn summary(&self, ticket: &ticket::Model) -> TicketSummaryResponse {
        TicketSummaryResponse {
            id: ticket.id,
            title: ticket.title.clone(),
            created_by: self.user(ticket.created_by).map(UserSummary::from),
            ticket_type: ticket
                .type_id
                .and_then(|id| self.types.get(&id))
                .map(TicketTypeResponse::from),
            department: ticket
                .department_id
                .and_then(|id| self.departments.get(&id))
                .map(DepartmentResponse::from),
            status: ticket
                .status_id
                .and_then(|id| self.statuses.get(&id))
                .map(StatusResponse::from),
            priority: ticket.priority.value(),
            priority_display: ticket.priority.label().to_string(),
            assigned: self.user(ticket.assigned_to).map(UserSummary::from),
            sentiment: ticket.sentiment,
            updated: ticket.updated_at,
            created: ticket.created_at,
        }
    }
}

fn by_id<T>(items: Vec<T>, key: impl Fn(&T) -> i32) -> HashMap<i32, T> {
    items.into_iter().map(|item| (key(&item), item)).collect()
}

pub fn post_response(post: &ticket_post::Model, author: Option<&user::Model>, store: &FileStore) -> PostResponse {
    PostResponse {
        id: post.id,
        message: post.message.clone(),
        user: author.map(UserSummary::from),
        private: post.private,
        upload: post.upload.as_deref().map(|path| store.url(path)),
        created: post.created_at,
        updated: post.updated_at,
    }
}

pub async fn ticket_summaries<C: ConnectionTrait>(
    db: &C,
    tickets: &[ticket::Model],
) -> Result<Vec<TicketSummaryResponse>, AppError> {
    let refs = TicketRefs::load(db, tickets, []).await?;
    Ok(tickets.iter().map(|t| refs.summary(t)).collect())
}

pub async fn find_ticket<C: ConnectionTrait>(db: &C, ticket_id: i32) -> Result<ticket::Model, AppError> {
    ticket::Entity::find_by_id(ticket_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::TicketNotFound))
}

pub async fn find_post<C: ConnectionTrait>(db: &C, post_id: i32) -> Result<ticket_post::Model, AppError> {
    ticket_post::Entity::find_by_id(post_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::PostNotFound))
}

/// 상세 화면: 게시글은 오래된 순서(대화 순서)로 정렬한다.
pub async fn ticket_detail<C: ConnectionTrait>(
    db: &C,
    store: &FileStore,
    ticket_id: i32,
) -> Result<TicketResponse, AppError> {
    let ticket = find_ticket(db, ticket_id).await?;

    let posts = ticket_post::Entity::find()
        .filter(ticket_post::Column::TicketId.eq(ticket_id))
        .order_by_asc(ticket_post::Column::CreatedAt)
        .order_by_asc(ticket_post::Column::Id)
        .all(db)
        .await?;

    let followers = ticket_follower::Entity::find()
        .filter(ticket_follower::Column::TicketId.eq(ticket_id))
        .order_by_asc(ticket_follower::Column::FollowedAt)
        .all(db)
        .await?;

    let extra_users: Vec<i32> = posts
        .iter()
        .filter_map(|p| p.user_id)
        .chain(followers.iter().map(|f| f.user_id))
        .collect();
    let refs = TicketRefs::load(db, std::slice::from_ref(&ticket), extra_users).await?;

    Ok(TicketResponse {
        ticket: refs.summary(&ticket),
        followers: followers
            .iter()
            .filter_map(|f| refs.user(Some(f.user_id)))
            .map(UserSummary::from)
            .collect(),
        posts: posts
            .iter()
            .map(|p| post_response(p, refs.user(p.user_id), store))
            .collect(),
    })
}
