use actix_web::{get, post, web, HttpRequest, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use super::flash::FlashMessage;
use super::{redirect, redirect_with, render, safe_next};
use crate::api::auth::issue_tokens;
use crate::auth::jwt::{
    build_access_token_cookie, build_refresh_token_cookie, expired_cookie, JwtKeys, ACCESS_TOKEN_COOKIE,
    REFRESH_TOKEN_COOKIE,
};
use crate::entity::user;
use crate::model::auth::RegisterRequest;
use crate::model::global_error::{AppError, ValidationFieldError};
use crate::service::account;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password2: Option<String>,
}

#[derive(Serialize)]
struct LoginPage<'a> {
    page: &'static str,
    next: String,
    username: &'a str,
    error: Option<String>,
}

#[derive(Serialize)]
struct RegisterPage<'a> {
    page: &'static str,
    username: &'a str,
    email: &'a str,
    errors: Vec<ValidationFieldError>,
}

fn signed_in(keys: &JwtKeys, user: &user::Model, location: &str, flash: Option<FlashMessage>) -> Result<HttpResponse, AppError> {
    let (access_token, refresh_token_str) = issue_tokens(keys, user)?;

    let mut response = HttpResponse::SeeOther();
    response
        .insert_header((actix_web::http::header::LOCATION, location.to_string()))
        .cookie(build_access_token_cookie(&access_token))
        .cookie(build_refresh_token_cookie(&refresh_token_str));
    if let Some(flash) = flash {
        response.cookie(flash.to_cookie());
    }
    Ok(response.finish())
}

#[get("/login")]
pub async fn login_page(req: HttpRequest, query: web::Query<NextQuery>) -> Result<HttpResponse, AppError> {
    render(
        &req,
        &LoginPage {
            page: "login",
            next: safe_next(query.next.as_deref()),
            username: "",
            error: None,
        },
    )
}

#[post("/login")]
pub async fn login_submit(
    req: HttpRequest,
    form: Option<web::Form<LoginForm>>,
    db: web::Data<DatabaseConnection>,
    keys: web::Data<JwtKeys>,
) -> Result<HttpResponse, AppError> {
    let Some(form) = form else {
        return Ok(redirect("/login"));
    };
    let username = form.username.as_deref().unwrap_or_default();
    let next = safe_next(form.next.as_deref());

    match account::authenticate(db.get_ref(), username, form.password.as_deref().unwrap_or_default()).await {
        Ok(user) => signed_in(&keys, &user, &next, None),
        Err(err) => {
            let page = LoginPage {
                page: "login",
                next,
                username,
                error: Some(login_error_message(&err)),
            };
            render(&req, &page)
        }
    }
}

fn login_error_message(err: &AppError) -> String {
    match err {
        AppError::ValidationError(errors) => errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join(" "),
        AppError::ApiError(code, _) => code.message().to_string(),
    }
}

#[post("/logout")]
pub async fn logout() -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((actix_web::http::header::LOCATION, "/login"))
        .cookie(expired_cookie(ACCESS_TOKEN_COOKIE))
        .cookie(expired_cookie(REFRESH_TOKEN_COOKIE))
        .finish()
}

#[get("/register")]
pub async fn register_page(req: HttpRequest) -> Result<HttpResponse, AppError> {
    render(
        &req,
        &RegisterPage {
            page: "register",
            username: "",
            email: "",
            errors: Vec::new(),
        },
    )
}

#[post("/register")]
pub async fn register_submit(
    req: HttpRequest,
    form: Option<web::Form<RegisterForm>>,
    db: web::Data<DatabaseConnection>,
    keys: web::Data<JwtKeys>,
) -> Result<HttpResponse, AppError> {
    let Some(form) = form else {
        return Ok(redirect("/register"));
    };
    let form = form.into_inner();
    let request = RegisterRequest {
        username: form.username.unwrap_or_default(),
        email: form.email.unwrap_or_default(),
        password: form.password.unwrap_or_default(),
        password2: form.password2.unwrap_or_default(),
    };

    match account::register_user(db.get_ref(), &request).await {
        Ok(user) => signed_in(
            &keys,
            &user,
            "/",
            Some(FlashMessage::success("Registration successful! You are now logged in.")),
        ),
        Err(AppError::ValidationError(errors)) => {
            let page = RegisterPage {
                page: "register",
                username: &request.username,
                email: &request.email,
                errors,
            };
            let mut response = render(&req, &page)?;
            *response.status_mut() = actix_web::http::StatusCode::BAD_REQUEST;
            Ok(response)
        }
        Err(err) if err.code() == crate::model::global_error::ErrorCode::DuplicateAccount => {
            Ok(redirect_with("/register", FlashMessage::error(err.code().message())))
        }
        Err(err) => Err(err),
    }
}
