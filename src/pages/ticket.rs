use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use super::flash::FlashMessage;
use super::{redirect, redirect_back, redirect_with, render};
use crate::entity::ticket::Priority;
use crate::model::auth::UserSummary;
use crate::model::common::PaginationResponse;
use crate::model::global_error::AppError;
use crate::model::lookup::{DepartmentResponse, StatusResponse, TicketTypeResponse};
use crate::model::ticket::{
    parse_flag, parse_id, PostForm, TicketCreateForm, TicketListQuery, TicketResponse, TicketSummaryResponse,
};
use crate::notify::Notifier;
use crate::service::{lookup, query, ticket, view};
use crate::service::{
    Attachment, FileStore, FollowAction, NewPost, NewTicket, PostChanges, TicketChanges, TicketFilter,
    TicketScope, TicketSort,
};

#[derive(Debug, Deserialize)]
pub struct DepartmentForm {
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TicketEditForm {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub ticket_type: Option<String>,
    pub department: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MyTicketsQuery {
    pub filter: Option<String>,
    #[serde(flatten)]
    pub list: TicketListQuery,
}

#[derive(Serialize)]
struct PriorityChoice {
    value: i32,
    label: &'static str,
}

#[derive(Serialize)]
struct Lookups {
    departments: Vec<DepartmentResponse>,
    statuses: Vec<StatusResponse>,
    ticket_types: Vec<TicketTypeResponse>,
    priorities: Vec<PriorityChoice>,
}

#[derive(Serialize)]
struct IndexPage {
    page: &'static str,
    user: UserSummary,
    tickets: PaginationResponse<TicketSummaryResponse>,
    users: Vec<UserSummary>,
    #[serde(flatten)]
    lookups: Lookups,
}

#[derive(Serialize)]
struct MyTicketCounts {
    created: u64,
    assigned: u64,
    followed: u64,
}

#[derive(Serialize)]
struct MyTicketsPage {
    page: &'static str,
    user: UserSummary,
    filter: &'static str,
    counts: MyTicketCounts,
    tickets: PaginationResponse<TicketSummaryResponse>,
}

#[derive(Serialize)]
struct CreateTicketPage {
    page: &'static str,
    user: UserSummary,
    #[serde(flatten)]
    lookups: Lookups,
}

#[derive(Serialize)]
struct ViewTicketPage {
    page: &'static str,
    user: UserSummary,
    ticket: TicketResponse,
    is_following: bool,
    users: Vec<UserSummary>,
    #[serde(flatten)]
    lookups: Lookups,
}

async fn current_user(db: &DatabaseConnection, user_id: i32) -> Result<UserSummary, AppError> {
    Ok(UserSummary::from(&lookup::find_user(db, user_id).await?))
}

async fn load_lookups(db: &DatabaseConnection) -> Result<Lookups, AppError> {
    Ok(Lookups {
        departments: lookup::list_departments(db).await?.iter().map(DepartmentResponse::from).collect(),
        statuses: lookup::list_statuses(db).await?.iter().map(StatusResponse::from).collect(),
        ticket_types: lookup::list_ticket_types(db).await?.iter().map(TicketTypeResponse::from).collect(),
        priorities: [Priority::High, Priority::Medium, Priority::Low]
            .into_iter()
            .map(|p| PriorityChoice {
                value: p.value(),
                label: p.label(),
            })
            .collect(),
    })
}

async fn active_users(db: &DatabaseConnection) -> Result<Vec<UserSummary>, AppError> {
    Ok(lookup::active_users(db).await?.iter().map(UserSummary::from).collect())
}

async fn ticket_page(
    db: &DatabaseConnection,
    scope: TicketScope,
    list: &TicketListQuery,
) -> Result<PaginationResponse<TicketSummaryResponse>, AppError> {
    let filter = TicketFilter::from_query(list);
    let sort = TicketSort::parse(list.sort.as_deref(), list.order.as_deref());
    let page = query::search_tickets(db, scope, &filter, sort, list.page.as_deref()).await?;
    let content = view::ticket_summaries(db, &page.content).await?;
    Ok(page.with_content(content))
}

fn view_path(ticket_id: i32) -> String {
    format!("/view-ticket/{}", ticket_id)
}

#[get("/")]
pub async fn index(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    params: web::Query<TicketListQuery>,
    user_id: web::ReqData<i32>,
) -> Result<HttpResponse, AppError> {
    let db = db.get_ref();
    let page = IndexPage {
        page: "index",
        user: current_user(db, *user_id).await?,
        tickets: ticket_page(db, TicketScope::All, &params).await?,
        users: active_users(db).await?,
        lookups: load_lookups(db).await?,
    };
    render(&req, &page)
}

#[get("/my-tickets")]
pub async fn my_tickets(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    params: web::Query<MyTicketsQuery>,
    user_id: web::ReqData<i32>,
) -> Result<HttpResponse, AppError> {
    let db = db.get_ref();
    let user_id = *user_id;

    let (filter, scope) = match params.filter.as_deref() {
        Some("assigned") => ("assigned", TicketScope::AssignedTo(user_id)),
        Some("followed") => ("followed", TicketScope::FollowedBy(user_id)),
        _ => ("created", TicketScope::CreatedBy(user_id)),
    };

    let counts = MyTicketCounts {
        created: query::count_tickets(db, TicketScope::CreatedBy(user_id)).await?,
        assigned: query::count_tickets(db, TicketScope::AssignedTo(user_id)).await?,
        followed: query::count_tickets(db, TicketScope::FollowedBy(user_id)).await?,
    };

    let page = MyTicketsPage {
        page: "my_tickets",
        user: current_user(db, user_id).await?,
        filter,
        counts,
        tickets: ticket_page(db, scope, &params.list).await?,
    };
    render(&req, &page)
}

#[get("/create-ticket")]
pub async fn create_ticket_page(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    user_id: web::ReqData<i32>,
) -> Result<HttpResponse, AppError> {
    let db = db.get_ref();
    let page = CreateTicketPage {
        page: "create_ticket",
        user: current_user(db, *user_id).await?,
        lookups: load_lookups(db).await?,
    };
    render(&req, &page)
}

#[post("/create-ticket")]
pub async fn create_ticket_submit(
    db: web::Data<DatabaseConnection>,
    store: web::Data<FileStore>,
    user_id: web::ReqData<i32>,
    form: MultipartForm<TicketCreateForm>,
) -> Result<HttpResponse, AppError> {
    let TicketCreateForm {
        title,
        ticket_type,
        department,
        priority,
        message,
        upload,
    } = form.into_inner();

    let new_ticket = NewTicket {
        title: title.map(Text::into_inner).unwrap_or_default(),
        ticket_type: parse_id(ticket_type.as_ref().map(|t| t.as_str())),
        department: parse_id(department.as_ref().map(|t| t.as_str())),
        priority: parse_id(priority.as_ref().map(|t| t.as_str())),
    };
    let attachment = match upload {
        Some(upload) => Attachment::from_temp_file(upload).await?,
        None => None,
    };
    let first_post = NewPost {
        message: message.map(Text::into_inner).unwrap_or_default(),
        private: false,
        attachment,
    };

    let (created, _) = ticket::create_ticket(db.get_ref(), &store, *user_id, new_ticket, first_post).await?;
    Ok(redirect_with("/", FlashMessage::success(format!("Ticket #{} created successfully", created.id))))
}

#[get("/view-ticket/{id}")]
pub async fn view_ticket(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    store: web::Data<FileStore>,
    path: web::Path<i32>,
    user_id: web::ReqData<i32>,
) -> Result<HttpResponse, AppError> {
    let ticket_id = path.into_inner();
    let db = db.get_ref();

    let page = ViewTicketPage {
        page: "view_ticket",
        user: current_user(db, *user_id).await?,
        ticket: view::ticket_detail(db, &store, ticket_id).await?,
        is_following: ticket::is_following(db, ticket_id, *user_id).await?,
        users: active_users(db).await?,
        lookups: load_lookups(db).await?,
    };
    render(&req, &page)
}

/// 답글 등록. API 의 add_post 와 같은 경로(알림 포함)를 탄다.
#[post("/view-ticket/{id}")]
pub async fn reply(
    db: web::Data<DatabaseConnection>,
    store: web::Data<FileStore>,
    notifier: web::Data<Notifier>,
    path: web::Path<i32>,
    user_id: web::ReqData<i32>,
    form: MultipartForm<PostForm>,
) -> Result<HttpResponse, AppError> {
    let ticket_id = path.into_inner();
    let post = NewPost::from_form(form.into_inner()).await?;

    ticket::add_post(db.get_ref(), &store, &notifier, ticket_id, *user_id, post).await?;
    Ok(redirect(&view_path(ticket_id)))
}

#[post("/assign-ticket/{id}")]
pub async fn assign_ticket(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    user_id: web::ReqData<i32>,
) -> Result<HttpResponse, AppError> {
    let ticket = ticket::assign_to_self(db.get_ref(), path.into_inner(), *user_id).await?;
    Ok(redirect(&view_path(ticket.id)))
}

#[post("/transfer-ticket/{id}")]
pub async fn transfer_ticket(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: Option<web::Form<DepartmentForm>>,
) -> Result<HttpResponse, AppError> {
    let ticket_id = path.into_inner();
    let Some(department_id) = form.and_then(|f| parse_id(f.department.as_deref())) else {
        return Ok(redirect_back(&req, &view_path(ticket_id)));
    };

    let (_, department) = ticket::transfer_department(db.get_ref(), ticket_id, department_id).await?;
    Ok(redirect_with(
        &view_path(ticket_id),
        FlashMessage::success(format!("Ticket transferred to {} successfully.", department.label)),
    ))
}

#[post("/change-status/{id}")]
pub async fn change_status(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: Option<web::Form<StatusForm>>,
) -> Result<HttpResponse, AppError> {
    let ticket_id = path.into_inner();
    let Some(status_id) = form.and_then(|f| parse_id(f.status.as_deref())) else {
        return Ok(redirect_back(&req, &view_path(ticket_id)));
    };

    let (_, status) = ticket::change_status(db.get_ref(), ticket_id, status_id).await?;
    Ok(redirect_with(
        &view_path(ticket_id),
        FlashMessage::success(format!("Ticket status changed to {} successfully.", status.label)),
    ))
}

#[post("/follow-ticket/{id}")]
pub async fn follow_ticket(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    user_id: web::ReqData<i32>,
) -> Result<HttpResponse, AppError> {
    let ticket_id = path.into_inner();
    let message = match ticket::toggle_follow(db.get_ref(), ticket_id, *user_id).await? {
        FollowAction::Followed => "You are now following this ticket.",
        FollowAction::Unfollowed => "You have unfollowed this ticket.",
    };
    Ok(redirect_with(&view_path(ticket_id), FlashMessage::success(message)))
}

#[post("/quick-transfer/{id}")]
pub async fn quick_transfer(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: Option<web::Form<DepartmentForm>>,
) -> Result<HttpResponse, AppError> {
    let ticket_id = path.into_inner();
    let Some(department_id) = form.and_then(|f| parse_id(f.department.as_deref())) else {
        return Ok(redirect_back(&req, "/"));
    };

    let (_, department) = ticket::transfer_department(db.get_ref(), ticket_id, department_id).await?;
    Ok(redirect_with(
        "/",
        FlashMessage::success(format!("Ticket #{} transferred to {}", ticket_id, department.label)),
    ))
}

#[post("/quick-assign/{id}")]
pub async fn quick_assign_self(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    user_id: web::ReqData<i32>,
) -> Result<HttpResponse, AppError> {
    quick_assign(db.get_ref(), path.into_inner(), *user_id).await
}

#[post("/quick-assign/{id}/{user_id}")]
pub async fn quick_assign_user(
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, AppError> {
    let (ticket_id, target) = path.into_inner();
    quick_assign(db.get_ref(), ticket_id, target).await
}

async fn quick_assign(db: &DatabaseConnection, ticket_id: i32, target: i32) -> Result<HttpResponse, AppError> {
    let (_, assignee) = ticket::assign_to_user(db, ticket_id, target).await?;
    Ok(redirect_with(
        "/",
        FlashMessage::success(format!("Ticket #{} assigned to {}", ticket_id, assignee.username)),
    ))
}

#[post("/update-ticket/{id}")]
pub async fn update_ticket(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: Option<web::Form<TicketEditForm>>,
) -> Result<HttpResponse, AppError> {
    let ticket_id = path.into_inner();
    let Some(form) = form else {
        return Ok(redirect_back(&req, &view_path(ticket_id)));
    };
    let form = form.into_inner();

    let changes = TicketChanges {
        title: form.title,
        ticket_type: parse_id(form.ticket_type.as_deref()),
        department: parse_id(form.department.as_deref()),
        priority: parse_id(form.priority.as_deref()),
    };
    ticket::update_ticket(db.get_ref(), ticket_id, changes).await?;
    Ok(redirect_with(&view_path(ticket_id), FlashMessage::success("Ticket updated successfully")))
}

#[post("/delete-ticket/{id}")]
pub async fn delete_ticket(
    db: web::Data<DatabaseConnection>,
    store: web::Data<FileStore>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    ticket::delete_ticket(db.get_ref(), &store, path.into_inner()).await?;
    Ok(redirect_with("/", FlashMessage::success("Ticket deleted successfully")))
}

/// 게시글 수정 폼. 체크박스가 빠지면 비공개 해제로 본다.
#[post("/update-post/{id}")]
pub async fn update_post(
    db: web::Data<DatabaseConnection>,
    store: web::Data<FileStore>,
    path: web::Path<i32>,
    form: MultipartForm<PostForm>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let attachment = match form.upload {
        Some(upload) => Attachment::from_temp_file(upload).await?,
        None => None,
    };
    let changes = PostChanges {
        message: form.message.map(Text::into_inner),
        private: Some(parse_flag(form.private.as_ref().map(|p| p.as_str()))),
        attachment,
    };

    let updated = ticket::update_post(db.get_ref(), &store, path.into_inner(), changes).await?;
    Ok(redirect_with(&view_path(updated.ticket_id), FlashMessage::success("Post updated successfully")))
}

#[post("/delete-post/{id}")]
pub async fn delete_post(
    db: web::Data<DatabaseConnection>,
    store: web::Data<FileStore>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let ticket_id = ticket::delete_post(db.get_ref(), &store, path.into_inner()).await?;
    Ok(redirect_with(&view_path(ticket_id), FlashMessage::success("Post deleted successfully")))
}
