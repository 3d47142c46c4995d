use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tera::Tera;

use crate::cache::PageCache;
use crate::config::Config;

pub type DbPool = Pool<SqliteConnectionManager>;

pub struct AppState {
    pub home_cache: PageCache,
    pub posts_per_page: u32,
}

impl AppState {
    pub fn new(posts_per_page: u32, home_cache_ttl: Duration) -> Self {
        Self {
            home_cache: PageCache::new(home_cache_ttl),
            posts_per_page,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.posts_per_page, Duration::from_secs(config.home_cache_seconds))
    }
}

/// Opens a pool over the SQLite file, with foreign keys switched on for every
/// connection it hands out.
pub fn create_pool(db_path: &Path) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(db_path)
        .with_init(|conn| setup::db_setup::enable_foreign_keys(conn));
    Pool::builder().build(manager)
}

pub fn load_templates(templates_dir: &str) -> tera::Result<Tera> {
    Tera::new(&format!("{}/**/*.html", templates_dir.trim_end_matches('/')))
}

pub mod cache;
pub mod config;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod setup;
