use actix_multipart::form::tempfile::TempFile;
use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::model::auth::UserSummary;
use crate::model::lookup::{DepartmentResponse, StatusResponse, TicketTypeResponse};
use crate::sentiment::Sentiment;

#[derive(Debug, Deserialize, ToSchema)]
pub struct TicketCreateRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub ticket_type: Option<i32>,
    pub department: Option<i32>,
    /// 1 = High, 2 = Medium, 3 = Low
    pub priority: Option<i32>,
    /// 첫 번째 게시글 본문
    pub message: Option<String>,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TicketUpdateRequest {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub ticket_type: Option<i32>,
    pub department: Option<i32>,
    pub priority: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusChangeRequest {
    pub status: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DepartmentTransferRequest {
    pub department: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRequest {
    pub user: Option<i32>,
}

/// 목록 조회 쿼리. 잘못된 값은 거부하지 않고 무시한다.
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TicketListQuery {
    /// 제목 부분 일치 (대소문자 무시)
    pub title: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub department: Option<String>,
    #[serde(rename = "type")]
    #[param(rename = "type")]
    pub ticket_type: Option<String>,
    pub created_by: Option<String>,
    pub assigned: Option<String>,
    pub sentiment: Option<String>,
    /// id, title, priority, department, status, assigned, updated
    pub sort: Option<String>,
    /// asc | desc
    pub order: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostResponse {
    pub id: i32,
    pub message: String,
    pub user: Option<UserSummary>,
    pub private: bool,
    pub upload: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TicketSummaryResponse {
    pub id: i32,
    pub title: String,
    pub created_by: Option<UserSummary>,
    #[serde(rename = "type")]
    pub ticket_type: Option<TicketTypeResponse>,
    pub department: Option<DepartmentResponse>,
    pub status: Option<StatusResponse>,
    pub priority: i32,
    pub priority_display: String,
    pub assigned: Option<UserSummary>,
    pub sentiment: Option<Sentiment>,
    pub updated: DateTime<Utc>,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TicketResponse {
    #[serde(flatten)]
    pub ticket: TicketSummaryResponse,
    pub followers: Vec<UserSummary>,
    pub posts: Vec<PostResponse>,
}

/// 게시글 multipart 폼. API 의 add_post 와 화면의 답글 폼이 같이 쓴다.
#[derive(Debug, MultipartForm)]
pub struct PostForm {
    pub message: Option<Text<String>>,
    pub private: Option<Text<String>>,
    pub upload: Option<TempFile>,
}

/// 티켓 생성 화면의 multipart 폼 (티켓 필드 + 첫 게시글).
#[derive(Debug, MultipartForm)]
pub struct TicketCreateForm {
    pub title: Option<Text<String>>,
    #[multipart(rename = "type")]
    pub ticket_type: Option<Text<String>>,
    pub department: Option<Text<String>>,
    pub priority: Option<Text<String>>,
    pub message: Option<Text<String>>,
    pub upload: Option<TempFile>,
}

/// OpenAPI 문서용 add_post 요청 스키마
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct PostUpload {
    pub message: String,
    pub private: Option<bool>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub upload: Option<Vec<u8>>,
}

/// 체크박스/불리언 필드 해석 ("on", "true", "1")
pub fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("on" | "true" | "1" | "yes")
    )
}

/// 폼의 숫자 id 필드. 비어 있거나 숫자가 아니면 None.
pub fn parse_id(raw: Option<&str>) -> Option<i32> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkbox_values() {
        assert!(parse_flag(Some("on")));
        assert!(parse_flag(Some("TRUE")));
        assert!(!parse_flag(Some("off")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn id_fields_ignore_blank_and_garbage() {
        assert_eq!(parse_id(Some(" 7 ")), Some(7));
        assert_eq!(parse_id(Some("")), None);
        assert_eq!(parse_id(Some("abc")), None);
    }
}
