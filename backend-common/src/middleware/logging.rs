//! Structured request logging.
//!
//! One `request completed` event is emitted per request, once the response
//! body has been fully written (or abandoned).

use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::ConnectInfo;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Extensions, Request, Response};
use serde_json::{Map, Value};
use tower::{Layer, Service};
use tracing::{info, warn};

use super::context::{org_id_from_extensions, user_id_from_extensions};
use super::{observe_response, Middleware};

/// Closure producing extra log fields from the incoming request.
pub type LogFieldsFn = Arc<dyn Fn(&Request<Body>) -> Vec<(String, Value)> + Send + Sync>;

/// Cut an address at its last `:`, unless that is the first character.
///
/// ```
/// use backend_common::middleware::strip_port;
///
/// assert_eq!(strip_port("10.0.0.1:8080"), "10.0.0.1");
/// assert_eq!(strip_port("10.0.0.1"), "10.0.0.1");
/// assert_eq!(strip_port(":8080"), ":8080");
/// ```
#[must_use]
pub fn strip_port(addr: &str) -> &str {
    match addr.rfind(':') {
        Some(index) if index > 0 => &addr[..index],
        _ => addr,
    }
}

/// Client address from proxy headers, falling back to the peer address.
///
/// Sources in order: `X-Real-IP`, the first `X-Forwarded-For` entry, then
/// [`ConnectInfo`]. Returns an empty string when none is available.
#[must_use]
pub fn remote_addr<B>(req: &Request<B>) -> String {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(real_ip) = header("x-real-ip") {
        return strip_port(real_ip).to_string();
    }
    if let Some(first) = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return strip_port(first).to_string();
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(peer)| strip_port(&peer.to_string()).to_string())
        .unwrap_or_default()
}

/// Re-encode a query string with its keys sorted.
///
/// Values keep their original order within a key.
///
/// ```
/// use backend_common::middleware::sorted_query;
///
/// assert_eq!(sorted_query("b=2&a=1&a=0"), "a=1&a=0&b=2");
/// ```
#[must_use]
pub fn sorted_query(query: &str) -> String {
    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Request details captured before the handler runs.
struct RequestLog {
    path: String,
    method: String,
    query: String,
    remote_addr: String,
    user_agent: String,
    user_id: Option<String>,
    site_id: Option<String>,
    extra: Option<String>,
}

impl RequestLog {
    fn capture(req: &Request<Body>, fields: &[LogFieldsFn]) -> Self {
        let extra: Map<String, Value> = fields.iter().flat_map(|f| f(req)).collect();

        Self {
            path: req.uri().path().to_string(),
            method: req.method().to_string(),
            query: req.uri().query().map(sorted_query).unwrap_or_default(),
            remote_addr: remote_addr(req),
            user_agent: req
                .headers()
                .get(http::header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string(),
            user_id: user_id_from_extensions(req.extensions()).ok().map(str::to_string),
            site_id: org_id_from_extensions(req.extensions()).ok().map(str::to_string),
            extra: (!extra.is_empty()).then(|| Value::Object(extra).to_string()),
        }
    }

    /// Fill in the user from the response when the request did not carry one.
    fn with_response_user(mut self, extensions: &Extensions) -> Self {
        if self.user_id.is_none() {
            self.user_id = user_id_from_extensions(extensions).ok().map(str::to_string);
        }
        if self.site_id.is_none() {
            self.site_id = org_id_from_extensions(extensions).ok().map(str::to_string);
        }
        self
    }

    fn emit(&self, status: u16, body_bytes: u64, elapsed: Duration) {
        info!(
            path = %self.path,
            method = %self.method,
            status,
            query = %self.query,
            remote_addr = %self.remote_addr,
            user_agent = %self.user_agent,
            body_bytes,
            duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            user_id = self.user_id.as_deref(),
            site_id = self.site_id.as_deref(),
            extra = self.extra.as_deref(),
            "request completed"
        );
    }
}

/// Layer that logs every request.
#[derive(Clone, Default)]
pub struct RequestLoggingLayer {
    fields: Arc<Vec<LogFieldsFn>>,
}

impl std::fmt::Debug for RequestLoggingLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLoggingLayer")
            .field("fields", &self.fields.len())
            .finish()
    }
}

impl RequestLoggingLayer {
    /// Creates a new logging layer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add closures whose fields are logged under `extra`.
    ///
    /// Closures run against the request before it reaches the handler.
    #[must_use]
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = LogFieldsFn>) -> Self {
        let mut all = self.fields.to_vec();
        all.extend(fields);
        self.fields = Arc::new(all);
        self
    }
}

impl<S> Layer<S> for RequestLoggingLayer {
    type Service = RequestLoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLoggingService {
            inner,
            fields: self.fields.clone(),
        }
    }
}

/// Logging service wrapper
#[derive(Clone)]
pub struct RequestLoggingService<S> {
    inner: S,
    fields: Arc<Vec<LogFieldsFn>>,
}

impl<S, ResBody> Service<Request<Body>> for RequestLoggingService<S>
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
        // The clone may not be ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let log = RequestLog::capture(&req, &self.fields);
        let start = Instant::now();

        Box::pin(async move {
            match inner.call(req).await {
                Ok(response) => {
                    let log = log.with_response_user(response.extensions());
                    Ok(observe_response(response, move |summary| {
                        log.emit(summary.status.as_u16(), summary.body_bytes, start.elapsed());
                    }))
                }
                Err(e) => {
                    log.emit(500, 0, start.elapsed());
                    warn!(error = %e, path = %log.path, "Request handler failed");
                    Err(e)
                }
            }
        })
    }
}

/// Request logging middleware with optional extra-field closures.
pub fn logging(fields: impl IntoIterator<Item = LogFieldsFn>) -> Middleware {
    Middleware::from_layer(RequestLoggingLayer::new().with_fields(fields))
}
