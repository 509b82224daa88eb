//! Response body type.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;

/// Response body for object API responses.
///
/// Every response is buffered JSON or empty (`204 No Content`). A buffered
/// body yields its bytes as a single frame and then becomes `Empty`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum ObjectsResponseBody {
    /// A fully buffered response body.
    Buffered(Bytes),
    /// An empty body.
    #[default]
    Empty,
}

impl ObjectsResponseBody {
    /// Create a response body from raw bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        if data.is_empty() {
            Self::Empty
        } else {
            Self::Buffered(data)
        }
    }

    /// Create an empty response body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Remaining body length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Buffered(data) => data.len(),
            Self::Empty => 0,
        }
    }

    /// Whether no bytes remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl http_body::Body for ObjectsResponseBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match std::mem::take(self.get_mut()) {
            Self::Buffered(data) => Poll::Ready(Some(Ok(http_body::Frame::data(data)))),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.is_empty()
    }

    fn size_hint(&self) -> http_body::SizeHint {
        http_body::SizeHint::with_exact(self.len() as u64)
    }
}
