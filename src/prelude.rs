//! Imports for syntax extensions.

pub use crate::IntoBaseUrl as _;
pub use crate::api::ApiResource as _;
pub use crate::error::Error as _;
