//! Wire protocol for Tollgate.
//!
//! This crate defines the "language" the client and the credential server
//! speak:
//!
//! - **Types** ([`LoginRequest`], [`ApiResponse`], [`Identity`], ...): the
//!   request and response bodies of the HTTP contract.
//! - **Codes** ([`ResponseCodes`], [`FailureCode`]): the server's status codes
//!   and the normalized failure taxonomy the UI sees.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how values become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Transport (HTTP) → Protocol (ApiResponse) → Session (auth state)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ApiResponse, FailureCode, Identity, LoginRequest, RegisterRequest,
    ResponseCodes,
};
