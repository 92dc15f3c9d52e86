pub mod mocks;

#[allow(unused_imports)]
pub use mocks::ScriptedUpstream;

use std::net::TcpListener;

/// httpmock needs a loopback listener; some sandboxes forbid binding one.
#[allow(dead_code)]
pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}
