use actix_multipart::form::MultipartFormConfig;
use actix_web::web;
use sea_orm::DatabaseConnection;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{self, ApiDoc};
use crate::auth::{AuthMiddleware, JwtKeys};
use crate::model::global_error::{AppError, ErrorCode};
use crate::notify::Notifier;
use crate::pages;
use crate::service::FileStore;

/// 첨부 파일 한도(5MB)보다 넉넉하게 잡아 크기 초과는 검증 단계에서 메시지로 돌려준다.
const MULTIPART_LIMIT: usize = 8 * 1024 * 1024;

/// 요청 핸들러가 공유하는 앱 데이터
#[derive(Clone)]
pub struct AppState {
    pub db: web::Data<DatabaseConnection>,
    pub keys: web::Data<JwtKeys>,
    pub store: web::Data<FileStore>,
    pub notifier: web::Data<Notifier>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, keys: JwtKeys, store: FileStore, notifier: Notifier) -> Self {
        Self {
            db: web::Data::new(db),
            keys: web::Data::new(keys),
            store: web::Data::new(store),
            notifier: web::Data::new(notifier),
        }
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.db.clone())
            .app_data(self.keys.clone())
            .app_data(self.store.clone())
            .app_data(self.notifier.clone())
            .app_data(json_config())
            .app_data(form_config())
            .app_data(multipart_config());
        routes(cfg);
    }
}

fn bad_payload(err: impl std::fmt::Display) -> actix_web::Error {
    AppError::with_detail(ErrorCode::ValidationError, err.to_string()).into()
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| bad_payload(err))
}

fn form_config() -> web::FormConfig {
    web::FormConfig::default().error_handler(|err, _req| bad_payload(err))
}

fn multipart_config() -> MultipartFormConfig {
    MultipartFormConfig::default()
        .total_limit(MULTIPART_LIMIT)
        .memory_limit(MULTIPART_LIMIT)
        .error_handler(|err, _req| bad_payload(err))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(api::health_check::health_check)
        .service(api::auth::register)
        .service(api::auth::login)
        .service(api::auth::refresh_token)
        .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .service(
            web::scope("/api")
                .wrap(AuthMiddleware::api())
                .service(api::auth::get_me)
                .service(api::ticket::list_tickets)
                .service(api::ticket::create_ticket)
                .service(api::ticket::get_ticket)
                .service(api::ticket::update_ticket)
                .service(api::ticket::delete_ticket)
                .service(api::ticket::assign_to_me)
                .service(api::ticket::assign_to_user)
                .service(api::ticket::change_status)
                .service(api::ticket::transfer_department)
                .service(api::ticket::toggle_follow)
                .service(api::ticket::add_post)
                .service(api::lookup::list_statuses)
                .service(api::lookup::get_status)
                .service(api::lookup::list_departments)
                .service(api::lookup::get_department)
                .service(api::lookup::list_ticket_types)
                .service(api::lookup::get_ticket_type),
        )
        .service(pages::account::login_page)
        .service(pages::account::login_submit)
        .service(pages::account::logout)
        .service(pages::account::register_page)
        .service(pages::account::register_submit)
        .service(
            web::scope("")
                .wrap(AuthMiddleware::pages())
                .service(pages::ticket::index)
                .service(pages::ticket::my_tickets)
                .service(pages::ticket::create_ticket_page)
                .service(pages::ticket::create_ticket_submit)
                .service(pages::ticket::view_ticket)
                .service(pages::ticket::reply)
                .service(pages::ticket::assign_ticket)
                .service(pages::ticket::transfer_ticket)
                .service(pages::ticket::change_status)
                .service(pages::ticket::follow_ticket)
                .service(pages::ticket::quick_transfer)
                .service(pages::ticket::quick_assign_self)
                .service(pages::ticket::quick_assign_user)
                .service(pages::ticket::update_ticket)
                .service(pages::ticket::delete_ticket)
                .service(pages::ticket::update_post)
                .service(pages::ticket::delete_post),
        );
}
