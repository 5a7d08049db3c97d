/// Page/sort query parameters shared by listing endpoints
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};

const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl PaginationParams {
    /// 1-based page number, at least 1
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    pub fn skip(&self) -> u64 {
        self.page()
            .saturating_sub(1)
            .saturating_mul(self.per_page()) as u64
    }

    pub fn is_ascending(&self) -> bool {
        matches!(self.sort_order.as_deref(), Some("asc"))
    }

    /// Resolve the requested sort key through `field_map`
    /// (public name -> stored field); unknown keys fall back to `default_field`.
    pub fn sort_field<'a>(&self, default_field: &'a str, field_map: &[(&str, &'a str)]) -> &'a str {
        self.sort_by
            .as_deref()
            .and_then(|requested| {
                field_map
                    .iter()
                    .find(|(public, _)| *public == requested)
                    .map(|(_, stored)| *stored)
            })
            .unwrap_or(default_field)
    }

    pub fn build_sort_doc(&self, default_field: &str, field_map: &[(&str, &str)]) -> Document {
        let field = self.sort_field(default_field, field_map);
        let direction = if self.is_ascending() { 1 } else { -1 };
        doc! { field: direction }
    }

    pub fn total_pages(&self, total: u64) -> i64 {
        let per_page = self.per_page() as u64;
        total.div_ceil(per_page) as i64
    }
}

/// Response wrapper for paginated results
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        Self {
            data,
            total,
            page: params.page(),
            per_page: params.per_page(),
            total_pages: params.total_pages(total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[(&str, &str)] = &[("title", "title"), ("price", "price_cents")];

    fn params(page: Option<i64>, per_page: Option<i64>) -> PaginationParams {
        PaginationParams {
            page,
            per_page,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_and_clamping() {
        let p = params(None, None);
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(p.skip(), 0);

        assert_eq!(params(Some(-3), Some(0)).page(), 1);
        assert_eq!(params(Some(-3), Some(0)).per_page(), 1);
        assert_eq!(params(None, Some(1000)).per_page(), MAX_PER_PAGE);
        assert_eq!(params(Some(3), Some(10)).skip(), 20);
    }

    #[test]
    fn test_sort_resolution() {
        let mut p = PaginationParams::default();
        assert_eq!(p.build_sort_doc("created_at", FIELDS), doc! { "created_at": -1 });

        p.sort_by = Some("price".to_string());
        p.sort_order = Some("asc".to_string());
        assert_eq!(p.build_sort_doc("created_at", FIELDS), doc! { "price_cents": 1 });

        p.sort_by = Some("$where".to_string());
        assert_eq!(p.sort_field("created_at", FIELDS), "created_at");
    }

    #[test]
    fn test_total_pages() {
        let p = params(None, Some(10));
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(10), 1);
        assert_eq!(p.total_pages(11), 2);
    }
}
