pub mod account_stream;

pub use account_stream::{AccountFilterSpec, AccountStream, StreamMetrics, build_subscribe_request};
