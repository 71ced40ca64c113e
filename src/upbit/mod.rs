//! Upbit exchange integration

pub mod auth;
pub mod messages;
pub mod rest;

pub use rest::UpbitRestClient;
