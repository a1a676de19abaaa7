//! Response body wrapper that reports status and size on completion.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{Buf, Bytes};
use http::{Response, StatusCode};
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;

/// Status and size of a completed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseSummary {
    /// Response status code
    pub status: StatusCode,
    /// Data bytes yielded by the body
    pub body_bytes: u64,
}

/// Callback invoked once a response body is finished.
pub type CompletionFn = Box<dyn FnOnce(ResponseSummary) + Send + 'static>;

pin_project! {
    /// Body that counts the bytes it yields.
    ///
    /// The completion callback runs exactly once: at end of stream, on the
    /// first body error, or when the body is dropped unfinished.
    pub struct ObservedBody<B> {
        #[pin]
        inner: B,
        status: StatusCode,
        body_bytes: u64,
        on_complete: Option<CompletionFn>,
    }

    impl<B> PinnedDrop for ObservedBody<B> {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            finish(this.on_complete, *this.status, *this.body_bytes);
        }
    }
}

fn finish(on_complete: &mut Option<CompletionFn>, status: StatusCode, body_bytes: u64) {
    if let Some(callback) = on_complete.take() {
        callback(ResponseSummary { status, body_bytes });
    }
}

impl<B> ObservedBody<B> {
    /// Wrap `inner`, reporting `status` on completion.
    pub fn new(inner: B, status: StatusCode, on_complete: CompletionFn) -> Self {
        Self {
            inner,
            status,
            body_bytes: 0,
            on_complete: Some(on_complete),
        }
    }

    /// Bytes yielded so far.
    #[must_use]
    pub const fn body_bytes(&self) -> u64 {
        self.body_bytes
    }
}

impl<B: Body> Body for ObservedBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();
        let frame = ready!(this.inner.as_mut().poll_frame(cx));

        match &frame {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    *this.body_bytes += data.remaining() as u64;
                }
                if this.inner.is_end_stream() {
                    finish(this.on_complete, *this.status, *this.body_bytes);
                }
            }
            Some(Err(_)) | None => finish(this.on_complete, *this.status, *this.body_bytes),
        }

        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Wrap a response so `on_complete` runs when its body is finished.
///
/// The status is captured here, before the body is handed to the server.
pub fn observe_response<B, F>(response: Response<B>, on_complete: F) -> Response<axum::body::Body>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<axum::BoxError>,
    F: FnOnce(ResponseSummary) + Send + 'static,
{
    let (parts, body) = response.into_parts();
    let body = ObservedBody::new(body, parts.status, Box::new(on_complete));
    Response::from_parts(parts, axum::body::Body::new(body))
}
