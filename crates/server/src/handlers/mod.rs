//! HTTP request handlers.

pub mod redirect;
pub mod status;

pub use redirect::*;
pub use status::*;
