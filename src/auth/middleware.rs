use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{web, Error, HttpMessage, HttpResponse};
use std::future::{ready, Future, Ready};
use std::pin::Pin;
use std::rc::Rc;

use super::jwt::{JwtKeys, ACCESS_TOKEN_COOKIE};
use crate::model::global_error::{AppError, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnFailure {
    /// 401 JSON 응답
    Reject,
    /// 로그인 화면으로 303
    RedirectToLogin,
}

/// `Authorization: Bearer` 헤더 또는 accessToken 쿠키를 검증하고
/// 사용자 id(`i32`)를 request extensions 에 넣는다.
pub struct AuthMiddleware {
    on_failure: OnFailure,
}

impl AuthMiddleware {
    pub fn api() -> Self {
        Self { on_failure: OnFailure::Reject }
    }

    pub fn pages() -> Self {
        Self { on_failure: OnFailure::RedirectToLogin }
    }
}

// 미들웨어 팩토리
impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            on_failure: self.on_failure,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    on_failure: OnFailure,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    from_header.or_else(|| req.cookie(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_string()))
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let user_id = match (req.app_data::<web::Data<JwtKeys>>(), bearer_token(&req)) {
            (Some(keys), Some(token)) => keys.access_user_id(&token),
            (None, _) => {
                tracing::error!("JwtKeys 가 앱 데이터에 등록되지 않았습니다");
                None
            }
            _ => None,
        };

        if let Some(user_id) = user_id {
            req.extensions_mut().insert(user_id);
            let service = Rc::clone(&self.service);
            return Box::pin(async move { service.call(req).await.map(ServiceResponse::map_into_left_body) });
        }

        let on_failure = self.on_failure;
        Box::pin(async move {
            match on_failure {
                OnFailure::Reject => {
                    let code = if bearer_token(&req).is_some() {
                        ErrorCode::InvalidAuthToken
                    } else {
                        ErrorCode::AuthenticationFailed
                    };
                    Ok(req.error_response(AppError::unauthorized(code)).map_into_right_body())
                }
                OnFailure::RedirectToLogin => {
                    let location = format!("/login?next={}", req.path());
                    let response = HttpResponse::SeeOther()
                        .insert_header((header::LOCATION, location))
                        .finish();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}
