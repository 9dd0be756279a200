//! Discord REST transport.
//!
//! [`Requester`] is the seam between typed API calls and HTTP. The
//! production implementation, [`HttpRequester`], authenticates every call,
//! tracks per-route rate-limit buckets from `X-RateLimit-*` headers and
//! retries 429 responses up to a configured limit.

mod error;
mod routes;

pub use error::{RestError, RestResult};
pub use routes::Route;

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use tessera_config::DiscordSection;
use tokio::time::Instant;
use tracing::{debug, warn};

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET_AFTER: &str = "x-ratelimit-reset-after";
const DEFAULT_USER_AGENT: &str = concat!(
    "DiscordBot (https://github.com/tessera-chat/tessera, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Performs one Discord REST call and returns the decoded JSON body.
///
/// An empty response body (e.g. `204 No Content`) yields [`Value::Null`].
#[async_trait]
pub trait Requester: Send + Sync {
    /// Send `body` (if any) to `route`.
    async fn request(&self, route: Route, body: Option<Value>) -> RestResult<Value>;
}

/// Last known state of one rate-limit bucket.
#[derive(Debug, Clone, Copy)]
struct BucketState {
    remaining: u32,
    reset_at: Instant,
}

/// 429 response body.
#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
    #[serde(default)]
    global: bool,
}

/// Error response body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

/// [`Requester`] backed by `reqwest`.
pub struct HttpRequester {
    client: reqwest::Client,
    endpoint: String,
    buckets: DashMap<String, BucketState>,
    max_retries: u32,
}

impl HttpRequester {
    /// Requester for `endpoint` with default timeouts and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::Config`] if the token is not a valid header value.
    pub fn new(endpoint: impl Into<String>, token: &str) -> RestResult<Self> {
        let section = DiscordSection {
            endpoint: endpoint.into(),
            ..DiscordSection::default()
        };
        Self::from_config(&section, token)
    }

    /// Requester configured from the `[discord]` section.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::Config`] for an invalid token, extra header or
    /// proxy URL.
    pub fn from_config(section: &DiscordSection, token: &str) -> RestResult<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bot {token}"))
            .map_err(|_| RestError::Config("token is not a valid header value".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        for (name, value) in &section.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| RestError::Config(format!("header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| RestError::Config(format!("header {name}: {e}")))?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(section.timeout_secs));
        if let Some(proxy) = section.proxy_agent.as_deref() {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| RestError::Config(format!("proxy_agent: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| RestError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: section.endpoint.trim_end_matches('/').to_owned(),
            buckets: DashMap::new(),
            max_retries: section.max_rate_limit_retries,
        })
    }

    /// Sleep until `bucket` has capacity, if it is known to be exhausted.
    async fn wait_for_bucket(&self, bucket: &str) {
        // Copy out so the map guard is not held across the sleep.
        let state = self.buckets.get(bucket).map(|s| *s);
        if let Some(state) = state
            && state.remaining == 0
            && state.reset_at > Instant::now()
        {
            debug!(bucket, "Rate limit bucket exhausted, waiting for reset");
            tokio::time::sleep_until(state.reset_at).await;
        }
    }

    fn update_bucket(&self, bucket: &str, headers: &HeaderMap) {
        let remaining = header_str(headers, RATE_LIMIT_REMAINING).and_then(|v| v.parse().ok());
        let reset_after = header_str(headers, RATE_LIMIT_RESET_AFTER)
            .and_then(|v| v.parse::<f64>().ok())
            .and_then(secs_to_duration);
        let now = Instant::now();
        if let (Some(remaining), Some(reset_at)) =
            (remaining, reset_after.and_then(|d| now.checked_add(d)))
        {
            self.buckets
                .insert(bucket.to_owned(), BucketState { remaining, reset_at });
        }
    }
}

impl std::fmt::Debug for HttpRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequester")
            .field("endpoint", &self.endpoint)
            .field("buckets", &self.buckets.len())
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Requester for HttpRequester {
    async fn request(&self, route: Route, body: Option<Value>) -> RestResult<Value> {
        let bucket = route.bucket();
        let url = format!("{}{}", self.endpoint, route.path());
        let name = route.name();
        let mut retries: u32 = 0;

        loop {
            self.wait_for_bucket(&bucket).await;

            let mut request = self.client.request(route.method(), &url);
            if let Some(body) = &body {
                request = request.json(body);
            }
            let response = request.send().await?;
            let status = response.status();
            self.update_bucket(&bucket, response.headers());

            if status.as_u16() == 429 {
                let header_delay = header_str(response.headers(), RETRY_AFTER.as_str())
                    .and_then(|v| v.parse::<f64>().ok());
                let text = response.text().await.unwrap_or_default();
                let parsed = serde_json::from_str::<RateLimitBody>(&text).ok();
                let global = parsed.as_ref().is_some_and(|b| b.global);
                let delay = parsed
                    .map(|b| b.retry_after)
                    .or(header_delay)
                    .and_then(secs_to_duration)
                    .unwrap_or(Duration::from_secs(1));
                let retry_after_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);

                if retries >= self.max_retries {
                    warn!(route = name, retry_after_ms, "Rate limit retries exhausted");
                    return Err(RestError::RateLimited {
                        route: name,
                        retry_after_ms,
                    });
                }
                retries = retries.saturating_add(1);
                warn!(
                    route = name,
                    retry_after_ms, global, attempt = retries, "Rate limited, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            let text = response.text().await?;
            if !status.is_success() {
                let parsed = serde_json::from_str::<ErrorBody>(&text).ok();
                let code = parsed.as_ref().and_then(|b| b.code);
                let message = parsed.and_then(|b| b.message).unwrap_or(text);
                debug!(route = name, status = status.as_u16(), ?code, "REST call failed");
                return Err(RestError::Status {
                    route: name,
                    status: status.as_u16(),
                    code,
                    message,
                });
            }

            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_str(&text)?);
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn secs_to_duration(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn requester(server: &MockServer, retries: u32) -> HttpRequester {
        let section = DiscordSection {
            endpoint: server.uri(),
            max_rate_limit_retries: retries,
            ..DiscordSection::default()
        };
        HttpRequester::from_config(&section, "test-token").unwrap()
    }

    #[tokio::test]
    async fn sends_auth_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/42/messages"))
            .and(header("authorization", "Bot test-token"))
            .and(body_json(json!({"content": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "m1"})))
            .expect(1)
            .mount(&server)
            .await;

        let rest = requester(&server, 0).await;
        let value = rest
            .request(
                Route::CreateMessage {
                    channel_id: "42".into(),
                },
                Some(json!({"content": "hello"})),
            )
            .await
            .unwrap();
        assert_eq!(value["id"], "m1");
    }

    #[tokio::test]
    async fn query_parameters_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/42/messages"))
            .and(query_param("limit", "100"))
            .and(query_param("before", "9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let rest = requester(&server, 0).await;
        let value = rest
            .request(
                Route::GetChannelMessages {
                    channel_id: "42".into(),
                    before: Some("9".into()),
                    limit: 100,
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(value, json!([]));
    }

    #[tokio::test]
    async fn no_content_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/channels/1/messages/2"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let rest = requester(&server, 0).await;
        let value = rest
            .request(
                Route::DeleteMessage {
                    channel_id: "1".into(),
                    message_id: "2".into(),
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn error_status_carries_discord_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/404"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"code": 10013, "message": "Unknown User"})),
            )
            .mount(&server)
            .await;

        let rest = requester(&server, 0).await;
        let err = rest
            .request(
                Route::GetUser {
                    user_id: "404".into(),
                },
                None,
            )
            .await
            .unwrap_err();
        match err {
            RestError::Status {
                status,
                code,
                message,
                route,
            } => {
                assert_eq!(status, 404);
                assert_eq!(code, Some(10013));
                assert_eq!(message, "Unknown User");
                assert_eq!(route, "get_user");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn retries_after_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guilds/g"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(json!({"retry_after": 0.01, "global": false})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/guilds/g"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "g"})))
            .mount(&server)
            .await;

        let rest = requester(&server, 2).await;
        let value = rest
            .request(
                Route::GetGuild {
                    guild_id: "g".into(),
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(value["id"], "g");
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rate_limit_gives_up_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guilds/g"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(json!({"retry_after": 0.01})),
            )
            .mount(&server)
            .await;

        let rest = requester(&server, 1).await;
        let err = rest
            .request(
                Route::GetGuild {
                    guild_id: "g".into(),
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RestError::RateLimited { route: "get_guild", .. }));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn bucket_headers_are_tracked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-RateLimit-Remaining", "4")
                    .insert_header("X-RateLimit-Reset-After", "1.5")
                    .set_body_json(json!({"id": "1"})),
            )
            .mount(&server)
            .await;

        let rest = requester(&server, 0).await;
        let route = Route::GetUser {
            user_id: "1".into(),
        };
        let bucket = route.bucket();
        rest.request(route, None).await.unwrap();

        let state = *rest.buckets.get(&bucket).unwrap();
        assert_eq!(state.remaining, 4);
        assert!(state.reset_at > Instant::now());
    }

    #[test]
    fn invalid_header_is_config_error() {
        let mut section = DiscordSection::default();
        section.headers.insert("bad header".into(), "x".into());
        let err = HttpRequester::from_config(&section, "t").unwrap_err();
        assert!(matches!(err, RestError::Config(_)));

        assert!(matches!(
            HttpRequester::new("https://x", "bad\ntoken"),
            Err(RestError::Config(_))
        ));
    }

    #[test]
    fn debug_omits_token() {
        let rest = HttpRequester::new("https://discord.com/api/v10", "secret-token").unwrap();
        assert!(!format!("{rest:?}").contains("secret-token"));
    }
}
