use actix_multipart::form::MultipartForm;
use actix_web::{delete, get, post, put, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::model::common::{PaginationResponse, StatusMessage};
use crate::model::global_error::{AppError, ErrorCode};
use crate::model::ticket::{
    AssignRequest, DepartmentTransferRequest, PostForm, PostResponse, PostUpload, StatusChangeRequest,
    TicketCreateRequest, TicketListQuery, TicketResponse, TicketSummaryResponse, TicketUpdateRequest,
};
use crate::notify::Notifier;
use crate::service::{lookup, query, ticket, view};
use crate::service::{FileStore, FollowAction, NewPost, NewTicket, TicketChanges, TicketFilter, TicketScope, TicketSort};

#[utoipa::path(
    get,
    path = "/api/tickets",
    summary = "티켓 목록 조회 (필터/정렬/페이지)",
    params(TicketListQuery),
    responses(
        (status = 200, description = "티켓 목록", body = PaginationResponse<TicketSummaryResponse>),
    ),
    tag = "tickets",
)]
#[get("/tickets")]
pub async fn list_tickets(
    db: web::Data<DatabaseConnection>,
    params: web::Query<TicketListQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = TicketFilter::from_query(&params);
    let sort = TicketSort::parse(params.sort.as_deref(), params.order.as_deref());

    let page = query::search_tickets(db.get_ref(), TicketScope::All, &filter, sort, params.page.as_deref()).await?;
    let content = view::ticket_summaries(db.get_ref(), &page.content).await?;
    let response = page.with_content(content);

    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    post,
    path = "/api/tickets",
    summary = "티켓 생성 (첫 게시글 포함)",
    request_body = TicketCreateRequest,
    responses(
        (status = 201, description = "티켓 생성 성공", body = TicketResponse),
        (status = 400, description = "입력값 오류"),
        (status = 404, description = "유형 또는 부서를 찾을 수 없음"),
    ),
    tag = "tickets",
)]
#[post("/tickets")]
pub async fn create_ticket(
    body: web::Json<TicketCreateRequest>,
    db: web::Data<DatabaseConnection>,
    store: web::Data<FileStore>,
    user_id: web::ReqData<i32>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let new_ticket = NewTicket {
        title: body.title,
        ticket_type: body.ticket_type,
        department: body.department,
        priority: body.priority,
    };
    let first_post = NewPost {
        message: body.message.unwrap_or_default(),
        private: body.private,
        attachment: None,
    };

    let (created, _) = ticket::create_ticket(db.get_ref(), &store, *user_id, new_ticket, first_post).await?;
    let response = view::ticket_detail(db.get_ref(), &store, created.id).await?;

    Ok(HttpResponse::Created().json(response))
}

#[utoipa::path(
    get,
    path = "/api/tickets/{id}",
    summary = "티켓 상세 조회",
    params(("id", description = "티켓 ID", example = 1)),
    responses(
        (status = 200, description = "티켓 상세", body = TicketResponse),
        (status = 404, description = "티켓 없음"),
    ),
    tag = "tickets",
)]
#[get("/tickets/{id}")]
pub async fn get_ticket(
    db: web::Data<DatabaseConnection>,
    store: web::Data<FileStore>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let response = view::ticket_detail(db.get_ref(), &store, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    put,
    path = "/api/tickets/{id}",
    summary = "티켓 수정",
    params(("id", description = "티켓 ID", example = 1)),
    request_body = TicketUpdateRequest,
    responses(
        (status = 200, description = "수정 성공", body = TicketResponse),
        (status = 400, description = "입력값 오류"),
        (status = 404, description = "티켓/유형/부서 없음"),
    ),
    tag = "tickets",
)]
#[put("/tickets/{id}")]
pub async fn update_ticket(
    db: web::Data<DatabaseConnection>,
    store: web::Data<FileStore>,
    path: web::Path<i32>,
    body: web::Json<TicketUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let ticket_id = path.into_inner();
    let body = body.into_inner();
    let changes = TicketChanges {
        title: body.title,
        ticket_type: body.ticket_type,
        department: body.department,
        priority: body.priority,
    };

    ticket::update_ticket(db.get_ref(), ticket_id, changes).await?;
    let response = view::ticket_detail(db.get_ref(), &store, ticket_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    delete,
    path = "/api/tickets/{id}",
    summary = "티켓 삭제 (게시글 포함)",
    params(("id", description = "티켓 ID", example = 1)),
    responses(
        (status = 204, description = "삭제 성공"),
        (status = 404, description = "티켓 없음"),
    ),
    tag = "tickets",
)]
#[delete("/tickets/{id}")]
pub async fn delete_ticket(
    db: web::Data<DatabaseConnection>,
    store: web::Data<FileStore>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    ticket::delete_ticket(db.get_ref(), &store, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/assign_to_me",
    summary = "본인에게 배정",
    params(("id", description = "티켓 ID", example = 1)),
    responses(
        (status = 200, description = "배정 성공", body = StatusMessage),
        (status = 404, description = "티켓 없음"),
    ),
    tag = "tickets",
)]
#[post("/tickets/{id}/assign_to_me")]
pub async fn assign_to_me(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    user_id: web::ReqData<i32>,
) -> Result<HttpResponse, AppError> {
    ticket::assign_to_self(db.get_ref(), path.into_inner(), *user_id).await?;
    Ok(HttpResponse::Ok().json(StatusMessage::new("Ticket assigned successfully")))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/assign",
    summary = "지정한 사용자에게 배정",
    params(("id", description = "티켓 ID", example = 1)),
    request_body = AssignRequest,
    responses(
        (status = 200, description = "배정 성공", body = StatusMessage),
        (status = 400, description = "user 누락"),
        (status = 404, description = "티켓 또는 사용자 없음"),
    ),
    tag = "tickets",
)]
#[post("/tickets/{id}/assign")]
pub async fn assign_to_user(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    body: Option<web::Json<AssignRequest>>,
) -> Result<HttpResponse, AppError> {
    let ticket_id = path.into_inner();
    let Some(target) = body.and_then(|b| b.user) else {
        view::find_ticket(db.get_ref(), ticket_id).await?;
        return Err(AppError::bad_request(ErrorCode::MissingUserId));
    };

    let (_, assignee) = ticket::assign_to_user(db.get_ref(), ticket_id, target).await?;
    Ok(HttpResponse::Ok().json(StatusMessage::new(format!("Ticket assigned to {}", assignee.username))))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/change_status",
    summary = "상태 변경",
    params(("id", description = "티켓 ID", example = 1)),
    request_body = StatusChangeRequest,
    responses(
        (status = 200, description = "변경 성공", body = StatusMessage),
        (status = 400, description = "Status ID is required"),
        (status = 404, description = "티켓 또는 상태 없음"),
    ),
    tag = "tickets",
)]
#[post("/tickets/{id}/change_status")]
pub async fn change_status(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    body: Option<web::Json<StatusChangeRequest>>,
) -> Result<HttpResponse, AppError> {
    let ticket_id = path.into_inner();
    let Some(status_id) = body.and_then(|b| b.status) else {
        view::find_ticket(db.get_ref(), ticket_id).await?;
        return Err(AppError::bad_request(ErrorCode::MissingStatusId));
    };

    let (_, status) = ticket::change_status(db.get_ref(), ticket_id, status_id).await?;
    Ok(HttpResponse::Ok().json(StatusMessage::new(format!("Ticket status changed to {}", status.label))))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/transfer_department",
    summary = "부서 이관",
    params(("id", description = "티켓 ID", example = 1)),
    request_body = DepartmentTransferRequest,
    responses(
        (status = 200, description = "이관 성공", body = StatusMessage),
        (status = 400, description = "Department ID is required"),
        (status = 404, description = "티켓 또는 부서 없음"),
    ),
    tag = "tickets",
)]
#[post("/tickets/{id}/transfer_department")]
pub async fn transfer_department(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    body: Option<web::Json<DepartmentTransferRequest>>,
) -> Result<HttpResponse, AppError> {
    let ticket_id = path.into_inner();
    let Some(department_id) = body.and_then(|b| b.department) else {
        view::find_ticket(db.get_ref(), ticket_id).await?;
        return Err(AppError::bad_request(ErrorCode::MissingDepartmentId));
    };

    let (_, department) = ticket::transfer_department(db.get_ref(), ticket_id, department_id).await?;
    Ok(HttpResponse::Ok().json(StatusMessage::new(format!("Ticket transferred to {}", department.label))))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/toggle_follow",
    summary = "팔로우/언팔로우 토글",
    params(("id", description = "티켓 ID", example = 1)),
    responses(
        (status = 200, description = "토글 결과", body = StatusMessage),
        (status = 404, description = "티켓 없음"),
    ),
    tag = "tickets",
)]
#[post("/tickets/{id}/toggle_follow")]
pub async fn toggle_follow(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    user_id: web::ReqData<i32>,
) -> Result<HttpResponse, AppError> {
    let message = match ticket::toggle_follow(db.get_ref(), path.into_inner(), *user_id).await? {
        FollowAction::Followed => "Successfully followed the ticket",
        FollowAction::Unfollowed => "Successfully unfollowed the ticket",
    };
    Ok(HttpResponse::Ok().json(StatusMessage::new(message)))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/add_post",
    summary = "게시글 추가 (첨부 파일 선택)",
    params(("id", description = "티켓 ID", example = 1)),
    request_body(content = PostUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "게시글 등록 성공", body = PostResponse),
        (status = 400, description = "입력값 또는 첨부 파일 오류"),
        (status = 404, description = "티켓 없음"),
    ),
    tag = "tickets",
)]
#[post("/tickets/{id}/add_post")]
pub async fn add_post(
    db: web::Data<DatabaseConnection>,
    store: web::Data<FileStore>,
    notifier: web::Data<Notifier>,
    path: web::Path<i32>,
    user_id: web::ReqData<i32>,
    form: MultipartForm<PostForm>,
) -> Result<HttpResponse, AppError> {
    let post = NewPost::from_form(form.into_inner()).await?;
    let created = ticket::add_post(db.get_ref(), &store, &notifier, path.into_inner(), *user_id, post).await?;

    let author = lookup::find_user(db.get_ref(), *user_id).await?;
    Ok(HttpResponse::Created().json(view::post_response(&created, Some(&author), &store)))
}
