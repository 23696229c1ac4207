//! Request extractors for generated entity routes.

mod request;
pub use request::ApiRequest;
