use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Envelope returned by every successful JSON endpoint.
#[derive(Serialize, Debug, Clone)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn new(status: u16, message: impl Into<String>, data: Option<T>) -> Self {
        Self { status, success: true, message: message.into(), data }
    }
}

/// Envelope returned for every failed request.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PaginationInfo {
    pub total_records: u64,
    pub total_pages: u64,
    pub page_size: u64,
    pub current_page: u64,
    pub next_page: Option<u64>,
    pub prev_page: Option<u64>,
}

impl PaginationInfo {
    /// Build pagination metadata from a total count and the requested page (1-based).
    pub fn new(total_records: u64, page: u64, page_size: u64) -> Self {
        let total_pages = if page_size == 0 { 0 } else { total_records.div_ceil(page_size) };
        Self {
            total_records,
            total_pages,
            page_size,
            current_page: page,
            next_page: (page < total_pages).then_some(page + 1),
            prev_page: (page > 1).then(|| page - 1),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct Paginated<T> {
    pub pagination_info: PaginationInfo,
    pub records: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(records: Vec<T>, total_records: u64, page: u64, page_size: u64) -> Self {
        Self { pagination_info: PaginationInfo::new(total_records, page, page_size), records }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Paginated<U> {
        Paginated { pagination_info: self.pagination_info, records: self.records.into_iter().map(f).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page_has_both_neighbours() {
        let info = PaginationInfo::new(45, 2, 10);
        assert_eq!(info.total_pages, 5);
        assert_eq!(info.next_page, Some(3));
        assert_eq!(info.prev_page, Some(1));
    }

    #[test]
    fn last_page_has_no_next() {
        let info = PaginationInfo::new(20, 2, 10);
        assert_eq!(info.total_pages, 2);
        assert_eq!(info.next_page, None);
        assert_eq!(info.prev_page, Some(1));
    }

    #[test]
    fn empty_result_set() {
        let info = PaginationInfo::new(0, 1, 10);
        assert_eq!(info.total_pages, 0);
        assert_eq!(info.next_page, None);
        assert_eq!(info.prev_page, None);
    }

    #[test]
    fn success_envelope_omits_missing_data() {
        let body = serde_json::to_value(ApiResponse::<()>::new(200, "ok", None)).unwrap();
        assert_eq!(body, serde_json::json!({"status": 200, "success": true, "message": "ok"}));
    }

    #[test]
    fn error_body_uses_type_key() {
        let body = ErrorBody { success: false, message: "nope".into(), kind: "NOT_FOUND".into(), details: None };
        let v = serde_json::to_value(body).unwrap();
        assert_eq!(v["type"], "NOT_FOUND");
        assert!(v.get("details").is_none());
    }
}
