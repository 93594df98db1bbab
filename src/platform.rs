//! Platform-specific marker traits for cross-platform compatibility.
//!
//! Some traits abstract over `Send`/`Sync` requirements that differ between
//! native platforms and WASM. The [`BoxFuture`] alias follows the same rule:
//! boxed pipeline futures are `Send` everywhere except WASM.

use std::pin::Pin;

/// Marker trait for types that may be `Send`, depending on platform.
#[cfg(not(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none"))))]
pub trait MaybeSend: Send {}
#[cfg(not(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none"))))]
impl<T: Send> MaybeSend for T {}

/// Marker trait for types that may be `Send`, depending on platform.
#[cfg(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none")))]
pub trait MaybeSend {}
#[cfg(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none")))]
impl<T> MaybeSend for T {}

/// Marker trait for types that may be `Send + Sync`, depending on platform.
#[cfg(not(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none"))))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none"))))]
impl<T: Send + Sync> MaybeSendSync for T {}

/// Marker trait for types that may be `Send + Sync`, depending on platform.
#[cfg(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none")))]
pub trait MaybeSendSync {}
#[cfg(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none")))]
impl<T> MaybeSendSync for T {}

/// Marker trait for types that may be `Sync`, depending on platform.
#[cfg(not(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none"))))]
pub trait MaybeSync: Sync {}
#[cfg(not(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none"))))]
impl<T: Sync> MaybeSync for T {}

/// Marker trait for types that may be `Sync`, depending on platform.
#[cfg(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none")))]
pub trait MaybeSync {}
#[cfg(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none")))]
impl<T> MaybeSync for T {}

/// A boxed future that is `Send` on native platforms.
#[cfg(not(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none"))))]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A boxed future that is `Send` on native platforms.
#[cfg(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none")))]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;
