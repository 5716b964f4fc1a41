use actix_web::{get, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::model::global_error::AppError;
use crate::model::lookup::{DepartmentResponse, StatusResponse, TicketTypeResponse};
use crate::service::lookup;

#[utoipa::path(
    get,
    path = "/api/statuses",
    summary = "상태 목록",
    responses((status = 200, description = "상태 목록", body = Vec<StatusResponse>)),
    tag = "reference data",
)]
#[get("/statuses")]
pub async fn list_statuses(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let statuses = lookup::list_statuses(db.get_ref()).await?;
    Ok(HttpResponse::Ok().json(statuses.iter().map(StatusResponse::from).collect::<Vec<_>>()))
}

#[utoipa::path(
    get,
    path = "/api/statuses/{id}",
    summary = "상태 조회",
    params(("id", description = "상태 ID", example = 1)),
    responses(
        (status = 200, description = "상태", body = StatusResponse),
        (status = 404, description = "상태 없음"),
    ),
    tag = "reference data",
)]
#[get("/statuses/{id}")]
pub async fn get_status(db: web::Data<DatabaseConnection>, path: web::Path<i32>) -> Result<HttpResponse, AppError> {
    let status = lookup::find_status(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(StatusResponse::from(&status)))
}

#[utoipa::path(
    get,
    path = "/api/departments",
    summary = "부서 목록",
    responses((status = 200, description = "부서 목록", body = Vec<DepartmentResponse>)),
    tag = "reference data",
)]
#[get("/departments")]
pub async fn list_departments(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let departments = lookup::list_departments(db.get_ref()).await?;
    Ok(HttpResponse::Ok().json(departments.iter().map(DepartmentResponse::from).collect::<Vec<_>>()))
}

#[utoipa::path(
    get,
    path = "/api/departments/{id}",
    summary = "부서 조회",
    params(("id", description = "부서 ID", example = 1)),
    responses(
        (status = 200, description = "부서", body = DepartmentResponse),
        (status = 404, description = "부서 없음"),
    ),
    tag = "reference data",
)]
#[get("/departments/{id}")]
pub async fn get_department(db: web::Data<DatabaseConnection>, path: web::Path<i32>) -> Result<HttpResponse, AppError> {
    let department = lookup::find_department(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(DepartmentResponse::from(&department)))
}

#[utoipa::path(
    get,
    path = "/api/types",
    summary = "티켓 유형 목록",
    responses((status = 200, description = "유형 목록", body = Vec<TicketTypeResponse>)),
    tag = "reference data",
)]
#[get("/types")]
pub async fn list_ticket_types(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let types = lookup::list_ticket_types(db.get_ref()).await?;
    Ok(HttpResponse::Ok().json(types.iter().map(TicketTypeResponse::from).collect::<Vec<_>>()))
}

#[utoipa::path(
    get,
    path = "/api/types/{id}",
    summary = "티켓 유형 조회",
    params(("id", description = "유형 ID", example = 1)),
    responses(
        (status = 200, description = "유형", body = TicketTypeResponse),
        (status = 404, description = "유형 없음"),
    ),
    tag = "reference data",
)]
#[get("/types/{id}")]
pub async fn get_ticket_type(db: web::Data<DatabaseConnection>, path: web::Path<i32>) -> Result<HttpResponse, AppError> {
    let ticket_type = lookup::find_ticket_type(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(TicketTypeResponse::from(&ticket_type)))
}
