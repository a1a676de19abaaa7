//! HTTP middleware and the handler-wrapping composer.
//!
//! Every middleware is a function from [`HttpService`] to [`HttpService`].
//! [`apply`] wraps a handler in a list of middlewares; the last one in the
//! list is the outermost and sees the request first.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use axum::routing::get;
//! use axum::Router;
//! use backend_common::middleware::{self, apply};
//! use backend_common::MetricsEmitter;
//!
//! # fn build() -> Result<Router, backend_common::CommonError> {
//! let emitter = Arc::new(MetricsEmitter::new());
//! let hello = apply(
//!     get(|| async { "hello" }),
//!     [
//!         middleware::instrument_route(emitter),
//!         middleware::logging([]),
//!         middleware::access_control_allow_origin("*")?,
//!     ],
//! );
//! let app = Router::new().route_service("/hello", hello);
//! # Ok(app)
//! # }
//! ```

pub mod context;
pub mod observer;
mod headers;
mod instrument;
mod logging;

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use http::{Request, Response};
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service};

pub use context::{
    insert_user, is_admin_from_extensions, org_id_from_extensions, user_id_from_extensions,
    ContextError, RequestUser,
};
pub use headers::{access_control_allow_origin, add_headers};
pub use instrument::{instrument_route, InstrumentLayer, InstrumentService};
pub use logging::{
    logging, remote_addr, sorted_query, strip_port, LogFieldsFn, RequestLoggingLayer,
    RequestLoggingService,
};
pub use observer::{observe_response, ObservedBody, ResponseSummary};

/// Boxed request handler that every middleware consumes and produces.
pub type HttpService = BoxCloneSyncService<Request<Body>, Response<Body>, Infallible>;

/// A decorator over [`HttpService`].
#[derive(Clone)]
pub struct Middleware(Arc<dyn Fn(HttpService) -> HttpService + Send + Sync>);

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Middleware(..)")
    }
}

impl Middleware {
    /// Create a middleware from a wrapping function.
    pub fn new<F>(wrap: F) -> Self
    where
        F: Fn(HttpService) -> HttpService + Send + Sync + 'static,
    {
        Self(Arc::new(wrap))
    }

    /// Adapt a tower layer.
    pub fn from_layer<L>(layer: L) -> Self
    where
        L: Layer<HttpService> + Send + Sync + 'static,
        L::Service: Service<Request<Body>, Response = Response<Body>, Error = Infallible>
            + Clone
            + Send
            + Sync
            + 'static,
        <L::Service as Service<Request<Body>>>::Future: Send + 'static,
    {
        Self::new(move |inner| BoxCloneSyncService::new(layer.layer(inner)))
    }

    /// Wrap a service.
    #[must_use]
    pub fn wrap(&self, service: HttpService) -> HttpService {
        (self.0)(service)
    }
}

/// Wrap `handler` in `middlewares`, in order.
///
/// The first middleware wraps the handler directly and each following one
/// wraps the result, so the last middleware is the outermost.
pub fn apply<S, I>(handler: S, middlewares: I) -> HttpService
where
    S: Service<Request<Body>, Response = Response<Body>, Error = Infallible>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    I: IntoIterator<Item = Middleware>,
{
    middlewares
        .into_iter()
        .fold(BoxCloneSyncService::new(handler), |service, middleware| {
            middleware.wrap(service)
        })
}
