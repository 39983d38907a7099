//! # declarest-http
//!
//! The HTTP transport collaborator for declarest.
//!
//! The dispatch layer in `declarest` shapes every call into a
//! [`RequestDescriptor`] and hands it to an [`HttpTransport`]. This crate
//! provides the wire types and the production transport:
//!
//! ```ignore
//! use declarest_http::{HttpTransport, ReqwestTransport, RequestDescriptor};
//!
//! let transport = ReqwestTransport::with_default_timeout()?
//!     .with_base_url("https://api.example.com")?;
//!
//! let response = transport.send(RequestDescriptor::get("/users/42")).await?;
//! println!("{}", response.body);
//! ```
//!
//! With the `test-utils` feature, [`transport::mock::MockTransport`] records
//! descriptors and returns canned responses instead of touching the network.

pub mod error;
pub mod transport;
pub mod types;

// Re-export main types
pub use error::TransportError;
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::{
    value_to_param, ContentType, Headers, HttpResponse, Method, RequestDescriptor, ResponseType,
    TransportOptions,
};
