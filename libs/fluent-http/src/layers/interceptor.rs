use crate::interceptor::InterceptorChain;
use crate::options::Options;
use bytes::Bytes;
use http::Request;
use http_body_util::Full;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower layer that runs the before-send interceptors
///
/// Takes a materialized `Request<Bytes>` so interceptors can read and rewrite
/// the body, then hands a `Request<Full<Bytes>>` to the inner service. Sits
/// above redirect following and digest negotiation, so the chain runs once
/// per send regardless of how many hops the exchange takes.
#[derive(Clone, Debug)]
pub struct InterceptorLayer {
    chain: InterceptorChain,
    options: Arc<Options>,
}

impl InterceptorLayer {
    #[must_use]
    pub fn new(chain: InterceptorChain, options: Arc<Options>) -> Self {
        Self { chain, options }
    }
}

impl<S> Layer<S> for InterceptorLayer {
    type Service = InterceptorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InterceptorService {
            inner,
            chain: self.chain.clone(),
            options: Arc::clone(&self.options),
        }
    }
}

#[derive(Clone, Debug)]
pub struct InterceptorService<S> {
    inner: S,
    chain: InterceptorChain,
    options: Arc<Options>,
}

impl<S> Service<Request<Bytes>> for InterceptorService<S>
where
    S: Service<Request<Full<Bytes>>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Bytes>) -> Self::Future {
        if !self.chain.is_empty() {
            self.chain.run(&mut req, &self.options);
            tracing::trace!(count = self.chain.len(), "ran before-send interceptors");
        }
        self.inner.call(req.map(Full::new))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::layers::UserAgentLayer;
    use http::Response;
    use http_body_util::BodyExt;
    use parking_lot::Mutex;
    use tower::{ServiceBuilder, ServiceExt};

    #[tokio::test]
    async fn test_interceptors_run_before_inner_and_see_user_agent() {
        let seen_ua = Arc::new(Mutex::new(None));
        let seen_ua_c = Arc::clone(&seen_ua);

        let mut chain = InterceptorChain::new();
        chain.push_fn(move |req, _| {
            *seen_ua_c.lock() = req.header("user-agent").map(str::to_owned);
            req.set_body("rewritten");
        });

        let service = ServiceBuilder::new()
            .layer(UserAgentLayer::try_new("ua-test/1").unwrap())
            .layer(InterceptorLayer::new(chain, Arc::new(Options::new())))
            .service(tower::service_fn(|req: Request<Full<Bytes>>| async move {
                let body = req.into_body().collect().await?.to_bytes();
                Ok::<_, std::convert::Infallible>(Response::new(body))
            }));

        let req = Request::builder()
            .uri("http://example.test/")
            .body(Bytes::from_static(b"original"))
            .unwrap();
        let resp = service.oneshot(req).await.unwrap();

        assert_eq!(resp.body().as_ref(), b"rewritten");
        assert_eq!(seen_ua.lock().as_deref(), Some("ua-test/1"));
    }
}
