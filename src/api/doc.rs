use utoipa::OpenApi;

use crate::api;
use crate::model::auth::{AuthResponse, LoginRequest, RegisterRequest, UserResponse, UserSummary};
use crate::model::common::StatusMessage;
use crate::model::global_error::{ErrorResponse, ValidationFieldError};
use crate::model::lookup::{DepartmentResponse, StatusResponse, TicketTypeResponse};
use crate::model::ticket::{
    AssignRequest, DepartmentTransferRequest, PostResponse, PostUpload, StatusChangeRequest, TicketCreateRequest,
    TicketResponse, TicketSummaryResponse, TicketUpdateRequest,
};
use crate::sentiment::Sentiment;

#[derive(OpenApi)]
#[openapi(
    info(title = "Helpdesk API", description = "티켓 라이프사이클 JSON API"),
    paths(
        api::health_check::health_check,
        api::auth::register,
        api::auth::login,
        api::auth::refresh_token,
        api::auth::get_me,
        api::ticket::list_tickets,
        api::ticket::create_ticket,
        api::ticket::get_ticket,
        api::ticket::update_ticket,
        api::ticket::delete_ticket,
        api::ticket::assign_to_me,
        api::ticket::assign_to_user,
        api::ticket::change_status,
        api::ticket::transfer_department,
        api::ticket::toggle_follow,
        api::ticket::add_post,
        api::lookup::list_statuses,
        api::lookup::get_status,
        api::lookup::list_departments,
        api::lookup::get_department,
        api::lookup::list_ticket_types,
        api::lookup::get_ticket_type,
    ),
    components(schemas(
        AuthResponse,
        LoginRequest,
        RegisterRequest,
        UserResponse,
        UserSummary,
        StatusMessage,
        ErrorResponse,
        ValidationFieldError,
        StatusResponse,
        DepartmentResponse,
        TicketTypeResponse,
        TicketCreateRequest,
        TicketUpdateRequest,
        StatusChangeRequest,
        DepartmentTransferRequest,
        AssignRequest,
        TicketSummaryResponse,
        TicketResponse,
        PostResponse,
        PostUpload,
        Sentiment,
    )),
    tags(
        (name = "auth", description = "회원 가입/로그인"),
        (name = "tickets", description = "티켓 라이프사이클"),
        (name = "reference data", description = "상태/부서/유형"),
        (name = "health check", description = "헬스 체크"),
    )
)]
pub struct ApiDoc;
