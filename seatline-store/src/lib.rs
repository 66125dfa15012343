pub mod app_config;
pub mod database;
pub mod memory_repo;
pub mod show_repo;

pub use database::DbClient;
pub use memory_repo::InMemoryShowRepository;
pub use show_repo::PgShowRepository;
