//! Authenticated request gateway.
//!
//! Single choke point for every outbound call: attaches the bearer
//! token, unwraps the `{code, message, data}` envelope, and centralizes
//! the response-level failure handling (session expiry, forbidden
//! access). Domain operations are defined next to their models in
//! [`catalog`](crate::catalog), [`wallet`](crate::wallet) and
//! [`auth`](crate::auth); all of them route through here.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::cache::QueryCache;
use crate::config::ApiConfig;
use crate::error::Error;
use crate::session::{NoopEvents, SessionEvents, SessionStore};

/// Which interception rules apply to an operation.
///
/// On the auth surface (login/signup) a 401 means bad credentials, not
/// an expired session; tearing the session down there would bounce the
/// caller straight back to the login form in a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    /// Login and signup.
    Auth,
    /// Everything else.
    Service,
}

/// Gateway to the Couponmoa backend.
///
/// Owns one connection pool, the session store it reads tokens from,
/// and the query cache. Clone-free by design: share it by reference (or
/// wrap it in an `Arc` at the application edge).
pub struct ApiClient {
    config: ApiConfig,
    http: reqwest::Client,
    session: SessionStore,
    events: Arc<dyn SessionEvents>,
    pub(crate) cache: QueryCache,
}

impl ApiClient {
    #[must_use]
    pub fn new(config: ApiConfig, session: SessionStore) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            session,
            events: Arc::new(NoopEvents),
            cache: QueryCache::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Install the top-level listener for session expiry and
    /// access-denied signals.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn SessionEvents>) -> Self {
        self.events = events;
        self
    }

    /// The session store this gateway reads credentials from.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    // ── Request plumbing ───────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        scope: Scope,
    ) -> Result<T, Error> {
        let request = self.http.get(self.config.endpoint(path));
        let body = self.dispatch(request, scope).await?;
        decode_data(&body)
    }

    pub(crate) async fn get_with<T, Q>(&self, path: &str, query: &Q, scope: Scope) -> Result<T, Error>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let request = self.http.get(self.config.endpoint(path)).query(query);
        let body = self.dispatch(request, scope).await?;
        decode_data(&body)
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B, scope: Scope) -> Result<T, Error>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(self.config.endpoint(path)).json(body);
        let body = self.dispatch(request, scope).await?;
        decode_data(&body)
    }

    /// POST whose success carries no payload worth decoding.
    pub(crate) async fn post_unit<B>(&self, path: &str, body: &B, scope: Scope) -> Result<(), Error>
    where
        B: serde::Serialize + ?Sized,
    {
        let request = self.http.post(self.config.endpoint(path)).json(body);
        self.dispatch(request, scope).await.map(|_| ())
    }

    /// Attach credentials, send, and split the response into a success
    /// body or an intercepted error.
    async fn dispatch(
        &self,
        request: reqwest::RequestBuilder,
        scope: Scope,
    ) -> Result<String, Error> {
        let mut request = request.timeout(self.config.timeout());
        request = request.header(reqwest::header::USER_AGENT, self.config.user_agent());
        if let Some(token) = self.session.access_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }
        Err(self.intercept(status, &body, scope))
    }

    /// Apply the cross-cutting failure rules to a non-2xx response.
    ///
    /// Runs once per response, so the expiry teardown fires at most
    /// once per 401 and never retries anything.
    pub(crate) fn intercept(&self, status: StatusCode, body: &str, scope: Scope) -> Error {
        let fault = classify(status, body);
        match &fault {
            Error::SessionExpired => {
                if scope == Scope::Auth {
                    // Bad credentials on the auth surface; there is no
                    // session to tear down.
                    return Error::InvalidCredentials;
                }
                tracing::warn!("session rejected by the backend, signing out");
                self.session.logout();
                self.events.session_expired();
            }
            Error::Forbidden { message } => {
                tracing::warn!(message = %message, "action not permitted for this account");
                self.events.access_denied(message);
            }
            _ => {}
        }
        fault
    }
}

// ── Envelope handling ──────────────────────────────────────────────

/// Response envelope wrapping every backend payload.
///
/// Only `data` is consumed on success; the sibling `code` and `message`
/// fields matter on error paths alone and are ignored here.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Error-path view of the envelope; both fields optional since error
/// bodies are not guaranteed to be well-formed.
#[derive(Debug, Default, Deserialize)]
struct ErrorReport {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorReport {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn message_or(self, fallback: &str) -> String {
        self.message.unwrap_or_else(|| fallback.to_string())
    }
}

fn decode_data<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    let envelope: Envelope<T> = serde_json::from_str(body)?;
    Ok(envelope.data)
}

/// Map a non-2xx status to the error taxonomy. Pure; the session and
/// event side effects live in [`ApiClient::intercept`].
fn classify(status: StatusCode, body: &str) -> Error {
    let report = ErrorReport::parse(body);
    match status {
        StatusCode::UNAUTHORIZED => Error::SessionExpired,
        StatusCode::FORBIDDEN => Error::Forbidden {
            message: report.message_or("request not permitted"),
        },
        StatusCode::NOT_FOUND => Error::NotFound,
        StatusCode::CONFLICT => Error::Conflict {
            message: report.message_or("conflicting request"),
        },
        _ => {
            let code = report.code.clone();
            Error::Api {
                status: status.as_u16(),
                code,
                message: report.message_or(status.canonical_reason().unwrap_or("request failed")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryStorage, Session};
    use crate::types::{User, UserId};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        expired: AtomicUsize,
        denied: Mutex<Vec<String>>,
    }

    impl SessionEvents for Recorder {
        fn session_expired(&self) {
            self.expired.fetch_add(1, Ordering::SeqCst);
        }

        fn access_denied(&self, message: &str) {
            self.denied.lock().push(message.to_string());
        }
    }

    fn signed_in_client() -> (ApiClient, Arc<Recorder>) {
        let session = SessionStore::new(MemoryStorage::new());
        session
            .login(
                "token",
                "refresh",
                User {
                    id: UserId(1),
                    email: "a@b.com".into(),
                    name: "Ami".into(),
                },
            )
            .unwrap();
        let recorder = Arc::new(Recorder::default());
        let client = ApiClient::new(
            ApiConfig::new("https://api.example.com".parse().unwrap()),
            session,
        )
        .with_events(recorder.clone());
        (client, recorder)
    }

    #[test]
    fn decode_unwraps_data_only() {
        let body = r#"{"code":"OK","message":"success","data":{"value":5}}"#;

        #[derive(Deserialize)]
        struct Payload {
            value: u32,
        }

        let payload: Payload = decode_data(body).unwrap();
        assert_eq!(payload.value, 5);
    }

    #[test]
    fn decode_without_code_or_message_still_works() {
        let n: u32 = decode_data(r#"{"data":3}"#).unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn decode_rejects_missing_data() {
        let err = decode_data::<u32>(r#"{"code":"OK"}"#).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn classify_conflict_carries_backend_message() {
        let err = classify(
            StatusCode::CONFLICT,
            r#"{"code":"SOLD_OUT","message":"coupon is sold out","data":null}"#,
        );
        match err {
            Error::Conflict { message } => assert_eq!(message, "coupon is sold out"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn classify_other_statuses() {
        assert!(matches!(classify(StatusCode::NOT_FOUND, ""), Error::NotFound));
        let err = classify(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        match err {
            Error::Api { status, code, .. } => {
                assert_eq!(status, 500);
                assert!(code.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn service_401_tears_down_exactly_once_per_response() {
        let (client, recorder) = signed_in_client();

        let err = client.intercept(StatusCode::UNAUTHORIZED, "", Scope::Service);
        assert!(matches!(err, Error::SessionExpired));
        assert!(!client.session().is_authenticated());
        assert_eq!(recorder.expired.load(Ordering::SeqCst), 1);

        // A second expired response is its own teardown: one more
        // event, still exactly one per response.
        let _ = client.intercept(StatusCode::UNAUTHORIZED, "", Scope::Service);
        assert_eq!(recorder.expired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn auth_401_is_invalid_credentials_and_keeps_session() {
        let (client, recorder) = signed_in_client();

        let err = client.intercept(StatusCode::UNAUTHORIZED, "", Scope::Auth);
        assert!(matches!(err, Error::InvalidCredentials));
        assert!(client.session().is_authenticated());
        assert_eq!(recorder.expired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn forbidden_notifies_without_clearing_session() {
        let (client, recorder) = signed_in_client();

        let err = client.intercept(
            StatusCode::FORBIDDEN,
            r#"{"message":"admins only"}"#,
            Scope::Service,
        );
        assert!(matches!(err, Error::Forbidden { .. }));
        assert!(client.session().is_authenticated());
        assert_eq!(recorder.expired.load(Ordering::SeqCst), 0);
        assert_eq!(*recorder.denied.lock(), vec!["admins only".to_string()]);
    }

    #[test]
    fn other_errors_propagate_without_side_effects() {
        let (client, recorder) = signed_in_client();

        let err = client.intercept(StatusCode::CONFLICT, "", Scope::Service);
        assert!(matches!(err, Error::Conflict { .. }));
        assert!(client.session().is_authenticated());
        assert_eq!(recorder.expired.load(Ordering::SeqCst), 0);
        assert!(recorder.denied.lock().is_empty());
    }

    #[test]
    fn anonymous_session_snapshot_for_unauthenticated_dispatch() {
        let session = SessionStore::new(MemoryStorage::new());
        let client = ApiClient::new(
            ApiConfig::new("https://api.example.com".parse().unwrap()),
            session,
        );
        assert_eq!(client.session().current(), Session::anonymous());
        assert!(client.session().access_token().is_none());
    }
}
