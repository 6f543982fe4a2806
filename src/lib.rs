pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::infra::{catalog::CatalogClient, db::Db};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub catalog: Option<CatalogClient>,
    pub upload_max_bytes: i64,
    pub paseto_access_key: [u8; 32],
    pub paseto_refresh_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub refresh_ttl_days: u64,
}
