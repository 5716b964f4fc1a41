use actix_web::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::model::auth::Claims;
use crate::model::global_error::{AppError, ErrorCode};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";
pub const REFRESH_ROLE: &str = "refresh";

/// HS256 서명 키. 앱 데이터로 공유한다.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

pub enum TokenVerifyResult {
    Valid(Claims),
    Expired,
    Invalid,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    fn issue(&self, user_id: i32, role: &str, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|err| {
            tracing::error!(error = %err, "토큰 생성 실패");
            AppError::internal_error(ErrorCode::TokenGenerationFailed)
        })
    }

    pub fn generate_token(&self, user_id: i32, role: &str) -> Result<String, AppError> {
        self.issue(user_id, role, Duration::hours(1))
    }

    pub fn generate_refresh_token(&self, user_id: i32) -> Result<String, AppError> {
        self.issue(user_id, REFRESH_ROLE, Duration::days(30))
    }

    pub fn verify_token(&self, token: &str) -> TokenVerifyResult {
        match decode::<Claims>(token, &self.decoding, &Validation::default()) {
            Ok(data) => TokenVerifyResult::Valid(data.claims),
            Err(err) => match *err.kind() {
                ErrorKind::ExpiredSignature => TokenVerifyResult::Expired,
                _ => TokenVerifyResult::Invalid,
            },
        }
    }

    /// 접근 토큰이면 사용자 id 를 돌려준다. 리프레시 토큰은 거부한다.
    pub fn access_user_id(&self, token: &str) -> Option<i32> {
        match self.verify_token(token) {
            TokenVerifyResult::Valid(claims) if claims.role != REFRESH_ROLE => claims.sub.parse().ok(),
            _ => None,
        }
    }
}

pub fn build_access_token_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(ACCESS_TOKEN_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(3))
        .finish()
}

pub fn build_refresh_token_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(REFRESH_TOKEN_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(60))
        .finish()
}

/// 로그아웃용 만료 쿠키
pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "").path("/").finish();
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_round_trips_user_id() {
        let keys = JwtKeys::new("test-secret");
        let token = keys.generate_token(7, "user").unwrap();
        assert_eq!(keys.access_user_id(&token), Some(7));
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let keys = JwtKeys::new("test-secret");
        let token = keys.generate_refresh_token(7).unwrap();
        assert_eq!(keys.access_user_id(&token), None);
        assert!(matches!(keys.verify_token(&token), TokenVerifyResult::Valid(c) if c.role == REFRESH_ROLE));
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let token = JwtKeys::new("one").generate_token(1, "user").unwrap();
        assert!(matches!(JwtKeys::new("two").verify_token(&token), TokenVerifyResult::Invalid));
    }
}
