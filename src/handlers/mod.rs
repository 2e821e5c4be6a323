//! HTTP handlers, grouped by resource.

use serde::{Deserialize, Serialize};

pub mod categories;
pub mod checkout;
pub mod orders;
pub mod products;
pub mod returns;
pub mod settings;
pub mod sms;
pub mod support;
pub mod uploads;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(20).min(100)
    }

    pub fn offset(&self) -> i64 {
        ((self.page() - 1) * self.per_page()) as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page() as i64
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}
