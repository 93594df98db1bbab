//! Implements a client library for the Sendibod HTTP API.
//!
//! Requests travel through a composable pipeline of stages (error
//! translation, response history, redirect following, default headers, host
//! resolution, authentication) wrapped around an injected,
//! transport-agnostic HTTP sender (see [`http::HttpClient`]). Responses come
//! back decoded as JSON; error statuses surface as typed [`ApiError`]s.

#![forbid(unsafe_code)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod api;
mod base_url;
mod client;
mod error;
pub mod http;
pub mod pipeline;
pub mod platform;
pub mod prelude;
mod response;

#[cfg(test)]
pub(crate) mod test_util;

pub use base_url::{BaseUrl, IntoBaseUrl};
pub use client::{Api, Client, DEFAULT_BASE_URL, USER_AGENT};
pub use error::{ApiError, BoxedError, Error};
pub use response::Response;

/// Documentation
pub mod _documentation {
    #[doc = include_str!("../README.md")]
    mod readme {}
    #[doc = include_str!("../CHANGELOG.md")]
    pub mod changelog {}
}

pub use bytes::Bytes;
