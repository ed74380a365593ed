//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, peer address)
//!     → request.rs (request ID, parsed request context)
//!     → query.rs / cookie.rs (query and cookie decoding)
//!     → [dispatcher runs middleware and handler]
//!     → response.rs (status, headers, cookies, marker)
//!     → Send to client
//! ```

pub mod cookie;
pub mod query;
pub mod request;
pub mod response;
pub mod server;

pub use cookie::{CookieCodec, CookieError, CookieOptions, CookieValue, Priority, SameSite};
pub use query::{QueryParser, QueryParserKind};
pub use request::{RequestContext, RequestId, X_REQUEST_ID};
pub use response::{ResponseBuilder, ResponseError};
pub use server::HttpServer;
