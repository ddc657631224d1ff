//! # Tollgate
//!
//! Client-side authentication session lifecycle.
//!
//! Tollgate keeps a desktop or CLI client's view of "who is logged in" in
//! step with a cookie-based credential server: login and registration,
//! periodic re-verification while logged in, a non-secret profile snapshot
//! that survives restarts, and a logout that only tears down local state
//! once the server confirms.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tollgate::prelude::*;
//!
//! # async fn run() -> Result<(), TollgateError> {
//! let auth = AuthContextBuilder::new()
//!     .config(AuthConfig::with_base_url("http://127.0.0.1:3000/api"))
//!     .build_http()?;
//!
//! // Greet the user from last time, then ask the server.
//! auth.restore().await;
//!
//! match auth.login(LoginRequest::new("alice", "s3cret")).await {
//!     Ok(ok) => println!("hello {}", ok.identity.username),
//!     Err(failure) => println!("{}: {}", failure.code, failure.message),
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod context;
mod error;
mod outcome;
pub mod telemetry;

pub use config::AuthConfig;
pub use context::{AuthContext, AuthContextBuilder};
pub use error::TollgateError;
pub use outcome::{AuthFailure, AuthSuccess};

pub use tollgate_poll as poll;
pub use tollgate_protocol as protocol;
pub use tollgate_session as session;
pub use tollgate_transport as transport;

/// Everything a typical client needs in scope.
pub mod prelude {
    pub use crate::{
        AuthConfig, AuthContext, AuthContextBuilder, AuthFailure, AuthSuccess, TollgateError,
    };
    pub use tollgate_poll::{PollConfig, SchedulerState};
    pub use tollgate_protocol::{
        FailureCode, Identity, LoginRequest, RegisterRequest, ResponseCodes,
    };
    pub use tollgate_session::{AuthState, FileStorage, MemoryStorage, Session, Storage};
    pub use tollgate_transport::CredentialTransport;
    #[cfg(feature = "http")]
    pub use tollgate_transport::{HttpConfig, HttpTransport};
}
