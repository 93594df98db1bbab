//! A validated base URL.
//!
//! [`BaseUrl`] is a newtype over [`Uri`] that guarantees the URL is absolute:
//! it always carries a scheme and an authority, so relative request paths can
//! be resolved against it. It can be constructed from common string and URL
//! types via [`IntoBaseUrl`].

use std::convert::Infallible;
use std::fmt;

use http::Uri;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ApiError;

/// A validated base URL.
///
/// This is a newtype over [`Uri`] which can be constructed from common
/// string and URL types via [`IntoBaseUrl`]. Once constructed, it can be
/// freely cloned and passed around without re-validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(Uri);

impl BaseUrl {
    /// Parses a base URL from a static string.
    ///
    /// # Panics
    ///
    /// Panics if the string is not an absolute URL. Mirrors
    /// [`Uri::from_static`]; only use this with known-good input.
    #[must_use]
    pub fn from_static(src: &'static str) -> Self {
        src.into_base_url().expect("static base URL must be absolute")
    }

    /// Returns the inner [`Uri`].
    #[must_use]
    pub fn as_uri(&self) -> &Uri {
        &self.0
    }

    /// Consumes the [`BaseUrl`] and returns the inner [`Uri`].
    #[must_use]
    pub fn into_uri(self) -> Uri {
        self.0
    }

    fn validated(uri: Uri) -> Result<Self, ApiError> {
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(ApiError::InvalidArgument {
                message: format!("Base URL \"{uri}\" must carry a scheme and a host."),
            });
        }

        Ok(Self(uri))
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for BaseUrl {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for BaseUrl {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.into_base_url().map_err(serde::de::Error::custom)
    }
}

/// Conversion trait for types that can be turned into a [`BaseUrl`].
pub trait IntoBaseUrl {
    /// The error type returned if the conversion fails.
    type Error;

    /// Attempts to convert this value into a [`BaseUrl`].
    fn into_base_url(self) -> Result<BaseUrl, Self::Error>;
}

impl IntoBaseUrl for BaseUrl {
    type Error = Infallible;

    fn into_base_url(self) -> Result<BaseUrl, Self::Error> {
        Ok(self)
    }
}

impl IntoBaseUrl for Uri {
    type Error = ApiError;

    fn into_base_url(self) -> Result<BaseUrl, Self::Error> {
        BaseUrl::validated(self)
    }
}

impl IntoBaseUrl for Url {
    type Error = ApiError;

    fn into_base_url(self) -> Result<BaseUrl, Self::Error> {
        self.as_str().into_base_url()
    }
}

impl IntoBaseUrl for &str {
    type Error = ApiError;

    fn into_base_url(self) -> Result<BaseUrl, Self::Error> {
        let uri = self.parse::<Uri>().map_err(|e| ApiError::InvalidArgument {
            message: format!("Invalid base URL \"{self}\": {e}"),
        })?;

        BaseUrl::validated(uri)
    }
}

impl IntoBaseUrl for String {
    type Error = ApiError;

    fn into_base_url(self) -> Result<BaseUrl, Self::Error> {
        self.as_str().into_base_url()
    }
}
