use actix_web::{get, post, web, HttpRequest, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::auth::jwt::{build_access_token_cookie, build_refresh_token_cookie, JwtKeys, REFRESH_ROLE, REFRESH_TOKEN_COOKIE};
use crate::auth::TokenVerifyResult;
use crate::entity::user;
use crate::model::auth::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::model::common::StatusMessage;
use crate::model::global_error::{AppError, ErrorCode};
use crate::service::{account, lookup};

/// 토큰 쿠키와 함께 응답을 만든다. 화면 로그인도 같은 쿠키를 쓴다.
pub(crate) fn issue_tokens(keys: &JwtKeys, user: &user::Model) -> Result<(String, String), AppError> {
    let access_token = keys.generate_token(user.id, &user.role)?;
    let refresh_token_str = keys.generate_refresh_token(user.id)?;
    Ok((access_token, refresh_token_str))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    summary = "회원 가입",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "가입 성공", body = AuthResponse),
        (status = 400, description = "입력값 오류 또는 중복 계정"),
    ),
    tag = "auth",
)]
#[post("/auth/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
    keys: web::Data<JwtKeys>,
) -> Result<HttpResponse, AppError> {
    let user = account::register_user(db.get_ref(), &body).await?;
    let (access_token, refresh_token_str) = issue_tokens(&keys, &user)?;

    Ok(HttpResponse::Created()
        .cookie(build_access_token_cookie(&access_token))
        .cookie(build_refresh_token_cookie(&refresh_token_str))
        .json(AuthResponse {
            access_token,
            user: UserResponse::from(user),
        }))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    summary = "로그인 (사용자명 또는 이메일)",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "로그인 성공", body = AuthResponse),
        (status = 400, description = "사용자명 또는 비밀번호 불일치"),
    ),
    tag = "auth",
)]
#[post("/auth/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
    keys: web::Data<JwtKeys>,
) -> Result<HttpResponse, AppError> {
    let user = account::authenticate(db.get_ref(), &body.username, &body.password).await?;
    let (access_token, refresh_token_str) = issue_tokens(&keys, &user)?;

    Ok(HttpResponse::Ok()
        .cookie(build_access_token_cookie(&access_token))
        .cookie(build_refresh_token_cookie(&refresh_token_str))
        .json(AuthResponse {
            access_token,
            user: UserResponse::from(user),
        }))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    summary = "접근 토큰 재발급",
    responses(
        (status = 200, description = "재발급 성공", body = StatusMessage),
        (status = 400, description = "리프레시 토큰이 아니거나 만료됨"),
        (status = 401, description = "리프레시 토큰 없음"),
    ),
    tag = "auth",
)]
#[post("/auth/refresh")]
pub async fn refresh_token(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    keys: web::Data<JwtKeys>,
) -> Result<HttpResponse, AppError> {
    let refresh_token_cookie = req
        .cookie(REFRESH_TOKEN_COOKIE)
        .ok_or_else(|| AppError::unauthorized(ErrorCode::AuthenticationFailed))?;

    match keys.verify_token(refresh_token_cookie.value()) {
        TokenVerifyResult::Valid(claims) => {
            if claims.role != REFRESH_ROLE {
                return Err(AppError::bad_request(ErrorCode::NotRefreshToken));
            }

            let user_id = claims
                .sub
                .parse::<i32>()
                .map_err(|_| AppError::bad_request(ErrorCode::InvalidRefreshToken))?;

            let user = lookup::find_user(db.get_ref(), user_id).await?;
            let new_access_token = keys.generate_token(user.id, &user.role)?;

            Ok(HttpResponse::Ok()
                .cookie(build_access_token_cookie(&new_access_token))
                .json(StatusMessage::new("Token refreshed")))
        }
        TokenVerifyResult::Expired | TokenVerifyResult::Invalid => {
            Err(AppError::bad_request(ErrorCode::InvalidRefreshToken))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    summary = "현재 사용자 조회",
    responses(
        (status = 200, description = "현재 사용자", body = UserResponse),
        (status = 401, description = "인증 필요"),
    ),
    tag = "auth",
)]
#[get("/auth/me")]
pub async fn get_me(
    db: web::Data<DatabaseConnection>,
    user_id: web::ReqData<i32>,
) -> Result<HttpResponse, AppError> {
    let user = lookup::find_user(db.get_ref(), *user_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
