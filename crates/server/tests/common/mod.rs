//! Common test utilities and fixtures.

pub mod mocks;
pub mod server;

#[allow(unused_imports)]
pub use mocks::*;
#[allow(unused_imports)]
pub use server::*;

use std::net::TcpListener;

/// Well-formed MD5 fingerprints for descriptors.
#[allow(dead_code)]
pub const FP_A: &str = "9e107d9d372bb6826bd81d3542a419d6";
#[allow(dead_code)]
pub const FP_B: &str = "e4d909c290d0fb1ca068ffaddf22cbd0";

/// httpmock needs a loopback listener; some sandboxes forbid binding one.
#[allow(dead_code)]
pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}
