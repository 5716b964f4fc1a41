use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResponse<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
    pub is_first: bool,
    pub is_last: bool,
}

impl<T> PaginationResponse<T> {
    pub fn new(content: Vec<T>, page: u64, size: u64, total_elements: u64) -> Self {
        let total_pages = total_pages(total_elements, size);
        let is_first = page == 1;
        let is_last = page >= total_pages;

        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
            is_first,
            is_last,
        }
    }

    /// 페이지 정보는 그대로 두고 내용만 바꾼다.
    pub fn with_content<U>(self, content: Vec<U>) -> PaginationResponse<U> {
        PaginationResponse {
            content,
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            is_first: self.is_first,
            is_last: self.is_last,
        }
    }
}

/// 비어 있는 결과도 한 페이지로 센다.
pub fn total_pages(total_elements: u64, size: u64) -> u64 {
    if size == 0 {
        return 1;
    }
    total_elements.div_ceil(size).max(1)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusMessage {
    pub status: String,
}

impl StatusMessage {
    pub fn new(status: impl Into<String>) -> Self {
        Self { status: status.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_has_one_page() {
        let page: PaginationResponse<i32> = PaginationResponse::new(vec![], 1, 10, 0);
        assert_eq!(page.total_pages, 1);
        assert!(page.is_first && page.is_last);
    }

    #[test]
    fn partial_last_page_rounds_up() {
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(30, 10), 3);
        assert_eq!(total_pages(31, 10), 4);
    }
}
