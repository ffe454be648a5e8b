use crate::error::HttpError;
use http::header::USER_AGENT;
use http::{HeaderValue, Request};
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower layer that adds a User-Agent header when the request has none
///
/// Generic over the request body, so it can sit above the interceptor layer
/// and interceptors see the header that will actually be sent.
#[derive(Clone, Debug)]
pub struct UserAgentLayer {
    user_agent: HeaderValue,
}

impl UserAgentLayer {
    /// Create a new `UserAgentLayer` with the specified user agent string
    ///
    /// # Errors
    /// Returns `HttpError::InvalidHeaderValue` if the user agent string is not valid
    pub fn try_new(user_agent: impl AsRef<str>) -> Result<Self, HttpError> {
        let user_agent = HeaderValue::from_str(user_agent.as_ref())?;
        Ok(Self { user_agent })
    }

    #[must_use]
    pub fn user_agent(&self) -> &HeaderValue {
        &self.user_agent
    }
}

impl<S> Layer<S> for UserAgentLayer {
    type Service = UserAgentService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        UserAgentService {
            inner,
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Service that adds User-Agent header to requests
#[derive(Clone, Debug)]
pub struct UserAgentService<S> {
    inner: S,
    user_agent: HeaderValue,
}

impl<S, ReqBody> Service<Request<ReqBody>> for UserAgentService<S>
where
    S: Service<Request<ReqBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        // a User-Agent from the `headers` option wins
        req.headers_mut()
            .entry(USER_AGENT)
            .or_insert_with(|| self.user_agent.clone());
        self.inner.call(req)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Method, Response};
    use tower::ServiceExt;

    /// Echoes the User-Agent it received as the response body.
    #[derive(Clone)]
    struct EchoUaService;

    impl Service<Request<Bytes>> for EchoUaService {
        type Response = Response<Option<HeaderValue>>;
        type Error = std::convert::Infallible;
        type Future = std::future::Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<Bytes>) -> Self::Future {
            let ua = req.headers().get(USER_AGENT).cloned();
            std::future::ready(Ok(Response::new(ua)))
        }
    }

    fn request(ua: Option<&'static str>) -> Request<Bytes> {
        let mut builder = Request::builder()
            .method(Method::GET)
            .uri("http://example.com");
        if let Some(ua) = ua {
            builder = builder.header(USER_AGENT, ua);
        }
        builder.body(Bytes::new()).unwrap()
    }

    #[tokio::test]
    async fn test_user_agent_added() {
        let service = UserAgentLayer::try_new("test-agent/1.0")
            .unwrap()
            .layer(EchoUaService);

        let resp = service.oneshot(request(None)).await.unwrap();
        assert_eq!(
            resp.into_body(),
            Some(HeaderValue::from_static("test-agent/1.0"))
        );
    }

    #[tokio::test]
    async fn test_user_agent_not_overwritten() {
        let service = UserAgentLayer::try_new("test-agent/1.0")
            .unwrap()
            .layer(EchoUaService);

        let resp = service
            .oneshot(request(Some("custom-agent/2.0")))
            .await
            .unwrap();
        assert_eq!(
            resp.into_body(),
            Some(HeaderValue::from_static("custom-agent/2.0"))
        );
    }

    #[test]
    fn test_user_agent_layer_invalid_value() {
        // Control characters are invalid in header values
        let result = UserAgentLayer::try_new("invalid\x00agent");
        assert!(matches!(result, Err(HttpError::InvalidHeaderValue(_))));
    }
}
