//! Route instrumentation feeding a [`MetricsEmitter`].

use std::fmt::Display;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Request, Response};
use tower::{Layer, Service};

use super::{observe_response, Middleware};
use crate::metrics::{MetricsEmitter, RequestObservation};

/// Layer that records a [`RequestObservation`] for every request.
#[derive(Debug, Clone)]
pub struct InstrumentLayer {
    emitter: Arc<MetricsEmitter>,
}

impl InstrumentLayer {
    /// Creates a new instrumentation layer
    #[must_use]
    pub const fn new(emitter: Arc<MetricsEmitter>) -> Self {
        Self { emitter }
    }
}

impl<S> Layer<S> for InstrumentLayer {
    type Service = InstrumentService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InstrumentService {
            inner,
            emitter: self.emitter.clone(),
        }
    }
}

/// Instrumentation service wrapper
#[derive(Debug, Clone)]
pub struct InstrumentService<S> {
    inner: S,
    emitter: Arc<MetricsEmitter>,
}

fn route_label<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map_or_else(|| req.uri().path(), MatchedPath::as_str)
        .to_string()
}

impl<S, ResBody> Service<Request<Body>> for InstrumentService<S>
where
    S: Service<Request<Body>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Error: Display + Send + 'static,
    S::Future: Send + 'static,
    ResBody: http_body::Body<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<axum::BoxError>,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let emitter = self.emitter.clone();
        let method = req.method().to_string();
        let path = route_label(&req);
        let start = Instant::now();

        Box::pin(async move {
            match inner.call(req).await {
                Ok(response) => Ok(observe_response(response, move |summary| {
                    emitter.record(&RequestObservation {
                        method,
                        path,
                        status: summary.status.as_u16(),
                        elapsed: start.elapsed(),
                        body_bytes: summary.body_bytes,
                    });
                })),
                Err(e) => {
                    emitter.record(&RequestObservation {
                        method,
                        path,
                        status: 500,
                        elapsed: start.elapsed(),
                        body_bytes: 0,
                    });
                    Err(e)
                }
            }
        })
    }
}

/// Metrics middleware recording every request to `emitter`.
#[must_use]
pub fn instrument_route(emitter: Arc<MetricsEmitter>) -> Middleware {
    Middleware::from_layer(InstrumentLayer::new(emitter))
}
