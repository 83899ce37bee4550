use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Generic paginated response wrapper for API endpoints.
#[derive(Serialize, Debug, Clone)]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

/// `page` (default 1) and `per_page` (default 25, capped at 100) query params.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub per_page: i64,
}

impl PageParams {
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let page = query
            .get("page")
            .and_then(|p| p.parse::<i64>().ok())
            .unwrap_or(1)
            .max(1);
        let per_page = query
            .get("per_page")
            .and_then(|p| p.parse::<i64>().ok())
            .unwrap_or(25)
            .clamp(1, 100);
        Self { page, per_page }
    }

    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = ((self.page - 1) * self.per_page) as usize;
        items.into_iter().skip(offset).take(self.per_page as usize).collect()
    }
}

/// Body of `POST /{alerts|cases}/{id}/step`.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStepRequest {
    pub step_id: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub skip_validation: bool,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Debug)]
pub struct SessionResponse {
    pub username: String,
    pub permissions: Vec<String>,
}
