//! # freeipa-core
//!
//! Core types shared by FreeIPA directory clients.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy separating fatal connection failures from recoverable query failures
//! - [`credentials`] - Bind credentials with the secret kept out of debug output

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod credentials;
pub mod error;

pub use credentials::{BindCredentials, DEFAULT_BIND_DN};
pub use error::{Error, Result};
