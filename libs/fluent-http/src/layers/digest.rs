use super::redirect::RedirectPolicy;
use crate::transport::digest::{DigestChallenge, random_cnonce};
use bytes::Bytes;
use http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use http::{HeaderValue, Request, Response, StatusCode};
use http_body_util::Full;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};
use tower_http::follow_redirect::RequestUri;

/// Username and password used to answer Digest challenges.
#[derive(Clone)]
pub struct DigestCredentials {
    username: String,
    password: String,
}

impl DigestCredentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for DigestCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Tower layer that answers `401 WWW-Authenticate: Digest` challenges
///
/// With no credentials the layer is a pass-through. Otherwise a 401 carrying a
/// Digest challenge is answered once: the request is replayed with an
/// `Authorization: Digest` header. Any other response, including a second 401,
/// is returned unchanged.
///
/// When redirects led to the challenge, the replay goes to the URI that issued
/// it (read from the response's [`RequestUri`]), but only while it shares the
/// original origin; a cross-origin challenge is returned unanswered.
#[derive(Clone, Debug, Default)]
pub struct DigestAuthLayer {
    credentials: Option<Arc<DigestCredentials>>,
}

impl DigestAuthLayer {
    #[must_use]
    pub fn new(credentials: Option<DigestCredentials>) -> Self {
        Self {
            credentials: credentials.map(Arc::new),
        }
    }
}

impl<S> Layer<S> for DigestAuthLayer {
    type Service = DigestAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DigestAuthService {
            inner,
            credentials: self.credentials.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DigestAuthService<S> {
    inner: S,
    credentials: Option<Arc<DigestCredentials>>,
}

/// Copy of the request kept for the authenticated replay.
fn replay_of(req: &Request<Full<Bytes>>) -> Request<Full<Bytes>> {
    let mut replay = Request::new(req.body().clone());
    *replay.method_mut() = req.method().clone();
    *replay.uri_mut() = req.uri().clone();
    *replay.version_mut() = req.version();
    *replay.headers_mut() = req.headers().clone();
    replay
}

fn find_challenge<B>(response: &Response<B>) -> Option<DigestChallenge> {
    response
        .headers()
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(DigestChallenge::parse)
}

impl<S, ResBody> Service<Request<Full<Bytes>>> for DigestAuthService<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let Some(credentials) = self.credentials.clone() else {
            return Box::pin(inner.call(req));
        };

        let mut replay = replay_of(&req);

        Box::pin(async move {
            let response = inner.call(req).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }
            let Some(challenge) = find_challenge(&response) else {
                return Ok(response);
            };

            let challenged = response
                .extensions()
                .get::<RequestUri>()
                .map(|uri| uri.0.clone());
            if let Some(challenged) = challenged {
                if !RedirectPolicy::is_same_origin(replay.uri(), &challenged) {
                    tracing::debug!("digest challenge from another origin left unanswered");
                    return Ok(response);
                }
                *replay.uri_mut() = challenged;
            }

            let target = replay
                .uri()
                .path_and_query()
                .map_or("/", http::uri::PathAndQuery::as_str)
                .to_owned();
            let authorization = challenge.authorization(
                &credentials.username,
                &credentials.password,
                replay.method().as_str(),
                &target,
                &random_cnonce(),
                1,
            );
            let Ok(value) = HeaderValue::from_str(&authorization) else {
                tracing::warn!("digest credentials produced an invalid Authorization header");
                return Ok(response);
            };
            drop(response);

            tracing::debug!(
                realm = %challenge.realm,
                algorithm = ?challenge.algorithm,
                "answering digest challenge"
            );
            replay.headers_mut().insert(AUTHORIZATION, value);
            inner.ready().await?.call(replay).await
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Replies 401 with a challenge until it sees an Authorization header.
    #[derive(Clone, Default)]
    struct ChallengingService {
        seen: Arc<Mutex<Vec<Option<String>>>>,
    }

    impl Service<Request<Full<Bytes>>> for ChallengingService {
        type Response = Response<()>;
        type Error = std::convert::Infallible;
        type Future = std::future::Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
            let auth = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let authorized = auth.is_some();
            self.seen.lock().push(auth);

            let response = if authorized {
                Response::new(())
            } else {
                Response::builder()
                    .status(StatusCode::UNAUTHORIZED)
                    .header(
                        WWW_AUTHENTICATE,
                        r#"Digest realm="test", nonce="abc", qop="auth""#,
                    )
                    .body(())
                    .unwrap()
            };
            std::future::ready(Ok(response))
        }
    }

    /// Behaves like a redirect follower that ended up at `landed_at` before
    /// being challenged.
    #[derive(Clone)]
    struct RedirectedChallenge {
        landed_at: &'static str,
        seen: Arc<Mutex<Vec<(String, Option<String>)>>>,
    }

    impl Service<Request<Full<Bytes>>> for RedirectedChallenge {
        type Response = Response<()>;
        type Error = std::convert::Infallible;
        type Future = std::future::Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
            let auth = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let authorized = auth.is_some();
            self.seen.lock().push((req.uri().to_string(), auth));

            let mut response = if authorized {
                Response::new(())
            } else {
                Response::builder()
                    .status(StatusCode::UNAUTHORIZED)
                    .header(WWW_AUTHENTICATE, r#"Digest realm="test", nonce="abc""#)
                    .body(())
                    .unwrap()
            };
            response
                .extensions_mut()
                .insert(RequestUri(self.landed_at.parse().unwrap()));
            std::future::ready(Ok(response))
        }
    }

    fn request() -> Request<Full<Bytes>> {
        Request::builder()
            .uri("http://example.test/secret?x=1")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_answers_challenge_once() {
        let inner = ChallengingService::default();
        let seen = Arc::clone(&inner.seen);
        let service = DigestAuthLayer::new(Some(DigestCredentials::new("user", "pass"))).layer(inner);

        let resp = service.oneshot(request()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].is_none());
        let header = seen[1].as_deref().unwrap();
        assert!(header.starts_with("Digest username=\"user\""), "{header}");
        assert!(header.contains("uri=\"/secret?x=1\""), "{header}");
    }

    #[tokio::test]
    async fn test_replays_to_uri_that_issued_challenge() {
        let inner = RedirectedChallenge {
            landed_at: "http://example.test/moved/secret",
            seen: Arc::default(),
        };
        let seen = Arc::clone(&inner.seen);
        let service = DigestAuthLayer::new(Some(DigestCredentials::new("user", "pass"))).layer(inner);

        let resp = service.oneshot(request()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].0, "http://example.test/moved/secret");
        let header = seen[1].1.as_deref().unwrap();
        assert!(header.contains("uri=\"/moved/secret\""), "{header}");
    }

    #[tokio::test]
    async fn test_cross_origin_challenge_left_unanswered() {
        let inner = RedirectedChallenge {
            landed_at: "http://other.test/secret",
            seen: Arc::default(),
        };
        let seen = Arc::clone(&inner.seen);
        let service = DigestAuthLayer::new(Some(DigestCredentials::new("user", "pass"))).layer(inner);

        let resp = service.oneshot(request()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_pass_through_without_credentials() {
        let inner = ChallengingService::default();
        let seen = Arc::clone(&inner.seen);
        let service = DigestAuthLayer::new(None).layer(inner);

        let resp = service.oneshot(request()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let rendered = format!("{:?}", DigestCredentials::new("u", "hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
