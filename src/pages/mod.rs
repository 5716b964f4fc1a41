//! 화면(폼 제출) 핸들러.
//!
//! 템플릿 렌더링은 외부 계층이 맡는다. 화면 핸들러는 템플릿에 넘길 컨텍스트를 JSON 으로
//! 돌려주고, 폼 처리 후에는 플래시 메시지와 함께 303 으로 이동한다.

pub mod account;
pub mod flash;
pub mod ticket;

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse};
use serde::Serialize;
use serde_json::Value;

use crate::auth::jwt::expired_cookie;
use crate::model::global_error::{AppError, ErrorCode};
use flash::{read_flash, FlashMessage, FLASH_COOKIE};

/// 화면 컨텍스트를 만든다. 대기 중인 플래시 메시지를 `messages` 로 넣고 쿠키는 지운다.
pub fn render<T: Serialize>(req: &HttpRequest, context: &T) -> Result<HttpResponse, AppError> {
    let (messages, had_flash) = read_flash(req);

    let mut body = serde_json::to_value(context).map_err(|err| {
        tracing::error!(error = %err, "화면 컨텍스트 직렬화 실패");
        AppError::internal_error(ErrorCode::InternalError)
    })?;
    if let Value::Object(map) = &mut body {
        map.insert("messages".to_string(), serde_json::json!(messages));
    }

    let mut response = HttpResponse::Ok();
    if had_flash {
        response.cookie(expired_cookie(FLASH_COOKIE));
    }
    Ok(response.json(body))
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.to_string()))
        .finish()
}

pub fn redirect_with(location: &str, flash: FlashMessage) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.to_string()))
        .cookie(flash.to_cookie())
        .finish()
}

/// 이전 화면(Referer)으로 돌아간다. 다른 호스트의 Referer 는 무시한다.
pub fn redirect_back(req: &HttpRequest, fallback: &str) -> HttpResponse {
    let host = req.connection_info().host().to_string();
    let target = req
        .headers()
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|referer| local_path(referer, &host))
        .unwrap_or_else(|| fallback.to_string());
    redirect(&target)
}

fn local_path(referer: &str, host: &str) -> Option<String> {
    if referer.starts_with('/') && !referer.starts_with("//") {
        return Some(referer.to_string());
    }
    let rest = referer
        .strip_prefix("http://")
        .or_else(|| referer.strip_prefix("https://"))?;
    let path = rest.strip_prefix(host)?;
    path.starts_with('/').then(|| path.to_string())
}

/// 로그인 후 이동할 경로. 외부 주소는 허용하지 않는다.
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/".to_string(),
    }
}
