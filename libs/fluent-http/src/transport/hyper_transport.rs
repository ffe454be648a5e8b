use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::Response;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tokio::runtime::Runtime;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::decompression::DecompressionLayer;
use tower_http::follow_redirect::{FollowRedirectLayer, RequestUri};

use super::{RawResponse, TransferStats, Transport, TransportRequest, prepare};
use crate::config::{HttpClientConfig, TlsRootConfig};
use crate::error::{ConnectionError, HttpError};
use crate::layers::{
    DigestAuthLayer, DigestCredentials, InterceptorLayer, RedirectPolicy, TraceLayer,
    UserAgentLayer, sanitized_url,
};
use crate::options::Auth;
use crate::response::{ResponseBody, read_body_limited};
use crate::tls;

type HyperClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// [`Transport`] backed by hyper, rustls and tower-http.
///
/// Owns a small tokio runtime and two pooled hyper clients: one that verifies
/// server certificates and one used for requests with `verify = false`. Sends
/// block the calling thread; calling [`Transport::execute`] from inside an
/// async runtime fails with [`HttpError::BlockingInAsyncContext`].
///
/// ## Layer stack (outer to inner), rebuilt per send
///
/// ```text
/// UserAgent → Interceptors → Trace → DigestAuth → Decompression →
///     FollowRedirect → hyper client
/// ```
///
/// The interceptors run once on the fully configured request. Digest replays
/// and redirect hops happen below them.
pub struct HyperTransport {
    config: HttpClientConfig,
    user_agent: UserAgentLayer,
    verified: HyperClient,
    insecure: HyperClient,
    runtime: Option<Runtime>,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Build the runtime, TLS connectors and connection pools.
    ///
    /// # Errors
    /// `HttpError::Runtime` if the runtime cannot start, `HttpError::Tls` if
    /// the TLS roots cannot be loaded, `HttpError::InvalidHeaderValue` for an
    /// unusable User-Agent.
    pub fn new(config: HttpClientConfig) -> Result<Self, HttpError> {
        let user_agent = UserAgentLayer::try_new(&config.user_agent)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("fluent-http")
            .enable_all()
            .build()
            .map_err(HttpError::Runtime)?;

        let (verified, insecure) = {
            let _guard = runtime.enter();
            let verified = build_client(&config, build_https_connector(&config, true)?);
            let insecure = build_client(&config, build_https_connector(&config, false)?);
            (verified, insecure)
        };

        tracing::debug!(
            tls_roots = ?config.tls_roots,
            max_redirects = config.redirect.max_redirects,
            "hyper transport ready"
        );

        Ok(Self {
            config,
            user_agent,
            verified,
            insecure,
            runtime: Some(runtime),
        })
    }

    #[must_use]
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

impl Drop for HyperTransport {
    fn drop(&mut self) {
        // A runtime must not be dropped from async context; don't wait for
        // pooled connections either.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl Transport for HyperTransport {
    fn execute(&self, request: TransportRequest) -> Result<RawResponse, HttpError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(HttpError::BlockingInAsyncContext);
        }
        let Some(runtime) = self.runtime.as_ref() else {
            return Err(HttpError::Runtime(std::io::Error::other(
                "transport runtime has shut down",
            )));
        };

        let TransportRequest {
            method,
            url,
            options,
            before_send,
            on_stats,
        } = request;

        let prepared = prepare(&method, &url, &options)?;
        let timeout = options.timeout()?.or(self.config.request_timeout);
        let digest = match options.auth()? {
            Some(Auth::Digest { username, password }) => {
                Some(DigestCredentials::new(username, password))
            }
            _ => None,
        };

        let client = if options.verify() {
            self.verified.clone()
        } else {
            tracing::warn!(
                url = %sanitized_url(prepared.uri()),
                "TLS certificate verification disabled for this request"
            );
            self.insecure.clone()
        };

        let redirect_policy =
            RedirectPolicy::for_request(&self.config.redirect, options.allow_redirects());
        let requested_uri = prepared.uri().to_string();
        let max_body_size = self.config.max_body_size;

        let service = ServiceBuilder::new()
            .layer(self.user_agent.clone())
            .layer(InterceptorLayer::new(before_send, Arc::new(options)))
            .layer(TraceLayer::new())
            .layer(DigestAuthLayer::new(digest))
            .layer(DecompressionLayer::new())
            .layer(FollowRedirectLayer::with_policy(redirect_policy))
            .service(client);

        let started = Instant::now();
        let outcome = runtime.block_on(async move {
            let exchange = async {
                let response = service.oneshot(prepared).await.map_err(map_client_error)?;
                let effective_uri = response
                    .extensions()
                    .get::<RequestUri>()
                    .map(|uri| uri.0.to_string());
                let response =
                    read_body_limited(map_decompression_response(response), max_body_size).await?;
                Ok::<_, HttpError>((response, effective_uri))
            };

            match timeout {
                Some(limit) => match tokio::time::timeout(limit, exchange).await {
                    Ok(result) => result,
                    Err(_) => Err(ConnectionError::Timeout(limit).into()),
                },
                None => exchange.await,
            }
        });
        let total_time = started.elapsed();

        let (result, effective_uri) = match outcome {
            Ok((response, effective_uri)) => {
                let effective_uri = effective_uri.unwrap_or(requested_uri);
                (Ok(response), effective_uri)
            }
            Err(e) => (Err(e), requested_uri),
        };

        match &result {
            Ok(response) => tracing::debug!(
                status = response.status().as_u16(),
                elapsed_ms = total_time.as_millis(),
                "exchange complete"
            ),
            Err(e) => tracing::debug!(
                error = %e,
                elapsed_ms = total_time.as_millis(),
                "exchange failed"
            ),
        }

        if let Some(on_stats) = on_stats {
            on_stats(TransferStats {
                effective_uri,
                total_time,
            });
        }

        result
    }
}

/// hyper client errors never carry a response; classify by whether the
/// connection was established.
fn map_client_error(err: hyper_util::client::legacy::Error) -> HttpError {
    if err.is_connect() {
        ConnectionError::connect(err).into()
    } else {
        ConnectionError::transport(err).into()
    }
}

/// Map the decompression response to our boxed response body type.
fn map_decompression_response<B>(response: Response<B>) -> Response<ResponseBody>
where
    B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = response.into_parts();
    let boxed_body: ResponseBody = body.map_err(Into::into).boxed();
    Response::from_parts(parts, boxed_body)
}

fn build_client(config: &HttpClientConfig, https: HttpsConnector<HttpConnector>) -> HyperClient {
    let mut builder = Client::builder(TokioExecutor::new());

    // pool_timer is required for pool_idle_timeout to take effect
    builder
        .pool_timer(TokioTimer::new())
        .pool_max_idle_per_host(config.pool_max_idle_per_host);
    if let Some(idle_timeout) = config.pool_idle_timeout {
        builder.pool_idle_timeout(idle_timeout);
    }

    builder.build(https)
}

/// HTTPS connector that also accepts plain `http://` URLs.
///
/// HTTP/2 is negotiated through ALPN via `enable_all_versions()`. With
/// `verify == false` the configured roots are ignored and any server
/// certificate is accepted.
///
/// # Errors
///
/// Returns `HttpError::Tls` if `TlsRootConfig::Native` is requested but no
/// valid root certificates are available from the OS certificate store.
fn build_https_connector(
    config: &HttpClientConfig,
    verify: bool,
) -> Result<HttpsConnector<HttpConnector>, HttpError> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(config.connect_timeout);

    let builder = match (verify, config.tls_roots) {
        (true, TlsRootConfig::WebPki) => hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(tls::get_crypto_provider())
            // rustls::Error is Error + Send + Sync; keep it as the source
            .map_err(|e| HttpError::Tls(Box::new(e)))?,
        (true, TlsRootConfig::Native) => {
            let client_config =
                tls::native_roots_client_config().map_err(|e| HttpError::Tls(e.into()))?;
            hyper_rustls::HttpsConnectorBuilder::new().with_tls_config(client_config)
        }
        (false, _) => {
            let client_config =
                tls::insecure_client_config().map_err(|e| HttpError::Tls(e.into()))?;
            hyper_rustls::HttpsConnectorBuilder::new().with_tls_config(client_config)
        }
    };

    Ok(builder
        .https_or_http()
        .enable_all_versions()
        .wrap_connector(http))
}
