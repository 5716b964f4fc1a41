use actix_web::{get, web, HttpResponse, Responder};
use sea_orm::DatabaseConnection;

#[utoipa::path(
    get,
    path = "/health-check",
    responses(
        (status = 200, description = "서버와 데이터베이스가 정상 동작 중", body = String),
        (status = 503, description = "데이터베이스 연결 불가", body = String),
    ),
    tag = "health check",
)]
#[get("/health-check")]
pub async fn health_check(db: web::Data<DatabaseConnection>) -> impl Responder {
    match db.ping().await {
        Ok(()) => HttpResponse::Ok().body("OK"),
        Err(err) => {
            tracing::error!(error = %err, "헬스 체크: 데이터베이스 응답 없음");
            HttpResponse::ServiceUnavailable().body("DB UNAVAILABLE")
        }
    }
}
