//! Repository traits for cache operations.

pub mod entries;
pub mod request_log;

pub use entries::EntryRepo;
pub use request_log::RequestLogRepo;
