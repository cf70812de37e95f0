//! Use case implementations.

mod context;
mod execute_request;
mod fetch_decode;

pub use context::LoaderContext;
pub use execute_request::RequestExecutor;
pub use fetch_decode::{FetchJob, FetchOutput, fetch_decode_transform};

#[cfg(test)]
mod execute_request_test;
