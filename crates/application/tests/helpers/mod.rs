#![allow(dead_code)]

mod mock_cache;
mod mock_upstream;

pub use mock_cache::MockResponseCache;
pub use mock_upstream::{query_message, MockBehavior, MockUpstream};
