//! Metadata store for video records
//!
//! `VideoRepository` is the seam the upload pipeline and the HTTP handlers depend on.
//! `PgVideoRepository` backs it with PostgreSQL; `InMemoryVideoRepository` is used when
//! no database is configured and in tests.

pub mod memory;
pub mod postgres;
pub mod repository;

pub use memory::InMemoryVideoRepository;
pub use postgres::PgVideoRepository;
pub use repository::{get_or_not_found, VideoRepository};
