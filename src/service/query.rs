//! 티켓 목록 조회: 필터, 정렬, 페이지 처리.
//!
//! 정렬 키는 허용 목록(`SortField`)으로만 받는다. 클라이언트가 보낸 문자열로
//! 컬럼이나 조인을 만들지 않는다.

use sea_orm::sea_query::{Alias, Expr, Func, LikeExpr, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, JoinType, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Select,
};
use tracing::debug;

use crate::entity::ticket::{self, Priority};
use crate::entity::{department, status, ticket_follower, user};
use crate::model::common::{total_pages, PaginationResponse};
use crate::model::global_error::AppError;
use crate::model::ticket::{parse_id, TicketListQuery};
use crate::sentiment::Sentiment;

pub const PAGE_SIZE: u64 = 10;

const SORT_JOIN: &str = "sort_ref";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilter {
    pub title: Option<String>,
    pub status: Option<i32>,
    pub priority: Option<Priority>,
    pub department: Option<i32>,
    pub ticket_type: Option<i32>,
    pub created_by: Option<i32>,
    pub assigned: Option<i32>,
    pub sentiment: Option<Sentiment>,
}

impl TicketFilter {
    /// 해석할 수 없는 값은 조건에서 빠진다.
    pub fn from_query(query: &TicketListQuery) -> Self {
        Self {
            title: query
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            status: parse_id(query.status.as_deref()),
            priority: query.priority.as_deref().and_then(parse_priority),
            department: parse_id(query.department.as_deref()),
            ticket_type: parse_id(query.ticket_type.as_deref()),
            created_by: parse_id(query.created_by.as_deref()),
            assigned: parse_id(query.assigned.as_deref()),
            sentiment: query.sentiment.as_deref().and_then(Sentiment::parse),
        }
    }

    fn apply(&self, mut select: Select<ticket::Entity>) -> Select<ticket::Entity> {
        if let Some(title) = &self.title {
            let pattern = format!("%{}%", escape_like(&title.to_lowercase()));
            select = select.filter(
                Expr::expr(Func::lower(Expr::col((ticket::Entity, ticket::Column::Title))))
                    .like(LikeExpr::new(pattern).escape('\\')),
            );
        }
        if let Some(id) = self.status {
            select = select.filter(ticket::Column::StatusId.eq(id));
        }
        if let Some(priority) = self.priority {
            select = select.filter(ticket::Column::Priority.eq(priority));
        }
        if let Some(id) = self.department {
            select = select.filter(ticket::Column::DepartmentId.eq(id));
        }
        if let Some(id) = self.ticket_type {
            select = select.filter(ticket::Column::TypeId.eq(id));
        }
        if let Some(id) = self.created_by {
            select = select.filter(ticket::Column::CreatedBy.eq(id));
        }
        if let Some(id) = self.assigned {
            select = select.filter(ticket::Column::AssignedTo.eq(id));
        }
        if let Some(sentiment) = self.sentiment {
            select = select.filter(ticket::Column::Sentiment.eq(sentiment));
        }
        select
    }
}

fn parse_priority(raw: &str) -> Option<Priority> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i32>() {
        return Priority::from_value(value);
    }
    [Priority::High, Priority::Medium, Priority::Low]
        .into_iter()
        .find(|p| p.label().eq_ignore_ascii_case(raw))
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    Priority,
    Department,
    Status,
    Assigned,
    Updated,
}

impl SortField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "id" => Some(SortField::Id),
            "title" => Some(SortField::Title),
            "priority" => Some(SortField::Priority),
            "department" | "department__department" => Some(SortField::Department),
            "status" | "status__status" => Some(SortField::Status),
            "assigned" | "assigned__username" => Some(SortField::Assigned),
            "updated" => Some(SortField::Updated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketSort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for TicketSort {
    fn default() -> Self {
        Self {
            field: SortField::Updated,
            order: SortOrder::Desc,
        }
    }
}

impl TicketSort {
    /// `sort=-title` 처럼 앞의 `-` 는 내림차순. `order` 가 있으면 그쪽이 우선한다.
    /// 모르는 키는 기본 정렬(updated 내림차순)로 돌아간다.
    pub fn parse(sort: Option<&str>, order: Option<&str>) -> Self {
        let Some(raw) = sort.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };

        let (prefixed_desc, key) = match raw.strip_prefix('-') {
            Some(key) => (true, key),
            None => (false, raw),
        };

        let Some(field) = SortField::parse(key) else {
            debug!(sort = raw, "허용되지 않은 정렬 키, 기본 정렬 사용");
            return Self::default();
        };

        let order = match order.map(|o| o.trim().to_ascii_lowercase()).as_deref() {
            Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            _ if prefixed_desc => SortOrder::Desc,
            _ => SortOrder::Asc,
        };

        Self { field, order }
    }

    fn apply(&self, select: Select<ticket::Entity>) -> Select<ticket::Entity> {
        let order: Order = self.order.into();
        let alias = || Alias::new(SORT_JOIN);

        let select = match self.field {
            SortField::Id => return select.order_by(ticket::Column::Id, order),
            SortField::Title => select.order_by(ticket::Column::Title, order),
            SortField::Priority => select.order_by(ticket::Column::Priority, order),
            SortField::Updated => select.order_by(ticket::Column::UpdatedAt, order),
            SortField::Department => select
                .join_as(JoinType::LeftJoin, ticket::Relation::Department.def(), alias())
                .order_by(Expr::col((alias(), department::Column::Label)), order),
            SortField::Status => select
                .join_as(JoinType::LeftJoin, ticket::Relation::Status.def(), alias())
                .order_by(Expr::col((alias(), status::Column::Label)), order),
            SortField::Assigned => select
                .join_as(JoinType::LeftJoin, ticket::Relation::Assignee.def(), alias())
                .order_by(Expr::col((alias(), user::Column::Username)), order),
        };

        select.order_by(ticket::Column::Id, Order::Desc)
    }
}

/// 목록의 기준 집합
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketScope {
    All,
    CreatedBy(i32),
    AssignedTo(i32),
    FollowedBy(i32),
}

impl TicketScope {
    fn select(&self) -> Select<ticket::Entity> {
        let select = ticket::Entity::find();
        match *self {
            TicketScope::All => select,
            TicketScope::CreatedBy(user_id) => select.filter(ticket::Column::CreatedBy.eq(user_id)),
            TicketScope::AssignedTo(user_id) => select.filter(ticket::Column::AssignedTo.eq(user_id)),
            TicketScope::FollowedBy(user_id) => select.filter(
                ticket::Column::Id.in_subquery(
                    Query::select()
                        .column(ticket_follower::Column::TicketId)
                        .from(ticket_follower::Entity)
                        .and_where(ticket_follower::Column::UserId.eq(user_id))
                        .to_owned(),
                ),
            ),
        }
    }
}

/// 숫자가 아니면 1페이지, 범위를 벗어난 숫자(0, 음수 포함)는 마지막 페이지.
pub fn resolve_page(raw: Option<&str>, total_pages: u64) -> u64 {
    let last = total_pages.max(1);
    match raw.map(str::trim).map(str::parse::<i64>) {
        None | Some(Err(_)) => 1,
        Some(Ok(page)) if page >= 1 && (page as u64) <= last => page as u64,
        Some(Ok(_)) => last,
    }
}

pub async fn search_tickets<C: ConnectionTrait>(
    db: &C,
    scope: TicketScope,
    filter: &TicketFilter,
    sort: TicketSort,
    page: Option<&str>,
) -> Result<PaginationResponse<ticket::Model>, AppError> {
    let select = sort.apply(filter.apply(scope.select()));
    let paginator = select.paginate(db, PAGE_SIZE);

    let total = paginator.num_items().await?;
    let page = resolve_page(page, total_pages(total, PAGE_SIZE));
    let content = paginator.fetch_page(page - 1).await?;

    Ok(PaginationResponse::new(content, page, PAGE_SIZE, total))
}

pub async fn count_tickets<C: ConnectionTrait>(db: &C, scope: TicketScope) -> Result<u64, AppError> {
    Ok(scope.select().count(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_clamp_to_last_page() {
        assert_eq!(resolve_page(Some("2"), 3), 2);
        assert_eq!(resolve_page(Some("4"), 3), 3);
        assert_eq!(resolve_page(Some("0"), 3), 3);
        assert_eq!(resolve_page(Some("-1"), 3), 3);
    }

    #[test]
    fn non_numeric_page_is_first_page() {
        assert_eq!(resolve_page(Some("abc"), 3), 1);
        assert_eq!(resolve_page(Some(""), 3), 1);
        assert_eq!(resolve_page(None, 3), 1);
    }

    #[test]
    fn empty_result_still_has_page_one() {
        assert_eq!(resolve_page(Some("5"), 0), 1);
    }

    #[test]
    fn sort_accepts_aliases_and_prefix() {
        assert_eq!(
            TicketSort::parse(Some("assigned__username"), None),
            TicketSort { field: SortField::Assigned, order: SortOrder::Asc }
        );
        assert_eq!(
            TicketSort::parse(Some("-title"), None),
            TicketSort { field: SortField::Title, order: SortOrder::Desc }
        );
        assert_eq!(
            TicketSort::parse(Some("-title"), Some("ASC")),
            TicketSort { field: SortField::Title, order: SortOrder::Asc }
        );
    }

    #[test]
    fn unknown_sort_key_falls_back_to_updated_desc() {
        assert_eq!(TicketSort::parse(Some("created_by__password"), Some("asc")), TicketSort::default());
        assert_eq!(TicketSort::parse(None, Some("asc")), TicketSort::default());
        assert_eq!(TicketSort::default().field, SortField::Updated);
    }

    #[test]
    fn malformed_filter_values_are_ignored() {
        let query = TicketListQuery {
            title: Some("  printer ".to_string()),
            status: Some("open".to_string()),
            priority: Some("medium".to_string()),
            department: Some("3".to_string()),
            sentiment: Some("angry".to_string()),
            ..Default::default()
        };
        let filter = TicketFilter::from_query(&query);
        assert_eq!(filter.title.as_deref(), Some("printer"));
        assert_eq!(filter.status, None);
        assert_eq!(filter.priority, Some(Priority::Medium));
        assert_eq!(filter.department, Some(3));
        assert_eq!(filter.sentiment, None);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_done"), "100\\%\\_done");
    }
}
