//! Utilidades de paginación
//!
//! Normaliza los parámetros page/limit que llegan por query string
//! y construye la respuesta paginada estándar de la API.

use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Parámetros de paginación ya normalizados: page >= 1, limit en [1, 100]
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PaginationParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

/// Metadatos de paginación que acompañan a cada listado
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// Respuesta paginada estándar
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
        Self {
            data,
            pagination: PaginationMeta {
                page,
                limit,
                total,
                total_pages,
                has_next_page: page < total_pages,
                has_prev_page: page > 1,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PaginationParams { page: None, limit: None };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 20);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_limit_clamped_to_range() {
        let params = PaginationParams { page: Some(2), limit: Some(500) };
        assert_eq!(params.limit(), 100);
        assert_eq!(params.offset(), 100);

        let params = PaginationParams { page: Some(1), limit: Some(0) };
        assert_eq!(params.limit(), 1);
    }

    #[test]
    fn test_page_never_below_one() {
        let params = PaginationParams { page: Some(-3), limit: Some(10) };
        assert_eq!(params.page(), 1);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_paginated_response_metadata() {
        let response = PaginatedResponse::new(vec![1, 2, 3], 45, 2, 20);
        assert_eq!(response.pagination.total_pages, 3);
        assert!(response.pagination.has_next_page);
        assert!(response.pagination.has_prev_page);

        let response: PaginatedResponse<i32> = PaginatedResponse::new(vec![], 0, 1, 20);
        assert_eq!(response.pagination.total_pages, 0);
        assert!(!response.pagination.has_next_page);
        assert!(!response.pagination.has_prev_page);
    }
}
