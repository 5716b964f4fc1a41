use actix_web::cookie::{Cookie, SameSite};
use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Error,
}

/// 다음 화면 한 번에만 보이는 메시지. 쿠키에는 hex 로 인코딩한 JSON 으로 담는다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub message: String,
}

impl FlashMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    pub fn to_cookie(&self) -> Cookie<'static> {
        let encoded = serde_json::to_vec(self).map(hex::encode).unwrap_or_default();
        Cookie::build(FLASH_COOKIE, encoded)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::minutes(5))
            .finish()
    }

    pub fn decode(value: &str) -> Option<Self> {
        let bytes = hex::decode(value).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// 요청에 담긴 플래시 메시지. 쿠키가 있었는지 여부도 함께 돌려준다.
pub fn read_flash(req: &HttpRequest) -> (Vec<FlashMessage>, bool) {
    match req.cookie(FLASH_COOKIE) {
        Some(cookie) => (FlashMessage::decode(cookie.value()).into_iter().collect(), true),
        None => (Vec::new(), false),
    }
}
