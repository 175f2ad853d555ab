//! Connector wrapper bounding connection establishment.
//!
//! `HttpConnector::set_connect_timeout` only covers the TCP handshake. This
//! wrapper puts a single deadline over TCP connect plus the TLS handshake
//! performed by the HTTPS layer.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::http::Uri;
use tower_service::Service;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Applies a deadline to every connection the inner connector opens.
#[derive(Debug, Clone)]
pub struct DeadlineConnector<C> {
    inner: C,
    deadline: Duration,
}

impl<C> DeadlineConnector<C> {
    pub fn new(inner: C, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

impl<C> Service<Uri> for DeadlineConnector<C>
where
    C: Service<Uri> + Send + 'static,
    C::Response: Send + 'static,
    C::Error: Into<BoxError>,
    C::Future: Send + 'static,
{
    type Response = C::Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let deadline = self.deadline;
        let connecting = self.inner.call(uri);

        Box::pin(async move {
            match tokio::time::timeout(deadline, connecting).await {
                Ok(result) => result.map_err(Into::into),
                Err(_) => Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connection not established within {:?}", deadline),
                )) as BoxError),
            }
        })
    }
}
