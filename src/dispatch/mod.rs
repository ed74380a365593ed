//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! HttpServer (axum fallback)
//!     → dispatcher.rs (load table once, match, validate)
//!     → middleware.rs (ordered chain, continuation flag)
//!     → handler.rs (route handler)
//!     → Response
//! ```

pub mod dispatcher;
pub mod handler;
pub mod middleware;

pub use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherOptions, DispatcherState};
pub use handler::{handler, BoxError, Handler, HandlerFuture};
pub use middleware::{middleware, Middleware, MiddlewareFuture, Next};
