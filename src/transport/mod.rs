//! Remote generation backends.

mod http;

pub use http::HttpGenerationBackend;
