pub mod pagination;

pub use pagination::{PaginatedResponse, PaginationParams};
