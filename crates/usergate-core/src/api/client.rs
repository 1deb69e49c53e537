//! Authenticated HTTP client for the users API.
//!
//! `ApiClient::request` is the only place the bearer token is attached to
//! outgoing requests. It reads the token from the shared [`CredentialStore`]
//! on every call and never keeps a copy of its own.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::CredentialStore;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, User, UserList, UserUpdate};

use super::{ApiError, NetworkError};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("usergate/", env!("CARGO_PKG_VERSION"));

const LOGIN_FAILED_MESSAGE: &str = "Invalid email or password";

const REGISTER_FAILED_MESSAGE: &str = "Could not create account";

/// API client for the users backend.
/// Clone is cheap - the connection pool and the store are both shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    store: Arc<CredentialStore>,
}

impl ApiClient {
    /// Create a client with the default request timeout
    pub fn new(base_url: &str, store: Arc<CredentialStore>) -> Result<Self, ApiError> {
        Self::with_timeout(
            base_url,
            store,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(
        base_url: &str,
        store: Arc<CredentialStore>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = Self::parse_base_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(NetworkError::from)?;

        Ok(Self {
            client,
            base_url,
            store,
        })
    }

    fn parse_base_url(base_url: &str) -> Result<Url, ApiError> {
        let url = Url::parse(base_url.trim())
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(format!(
                "{}: expected an http(s) URL",
                base_url
            )));
        }
        Ok(url)
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL below the base URL. Each segment is
    /// percent-encoded, so ids can never escape their path position.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments.iter().filter(|s| !s.is_empty()) {
                path.push(segment);
            }
        }
        url
    }

    fn path_segments(path: &str) -> Vec<&str> {
        path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Resolve a caller-supplied path such as `/dashboard?scope=admin`.
    /// The query string is kept as given; only the path is split.
    fn path_url(&self, path: &str) -> Url {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path, None),
        };
        let mut url = self.endpoint(&Self::path_segments(path));
        url.set_query(query.filter(|q| !q.is_empty()));
        url
    }

    // ===== Transport =====

    /// Send a request, attaching the stored bearer token when there is one.
    ///
    /// Status codes are not interpreted here: any response that arrives is
    /// `Ok`. Only transport failures produce an error.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, NetworkError> {
        self.send(method, self.path_url(path), body).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Response, NetworkError> {
        let mut builder = self.client.request(method.clone(), url.clone());

        let token = self.store.get();
        if let Some(ref token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        debug!(%method, %url, authenticated = token.is_some(), "Sending request");
        let response = builder.send().await.map_err(|e| {
            let error = NetworkError::from(e);
            warn!(%method, %url, kind = %error.kind, "Request failed before a response arrived");
            error
        })?;
        debug!(%method, %url, status = response.status().as_u16(), "Response received");
        Ok(response)
    }

    /// Hit a probe endpoint and report only its status.
    pub async fn probe(&self, path: &str) -> Result<StatusCode, NetworkError> {
        let response = self.request::<()>(Method::GET, path, None).await?;
        Ok(response.status())
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ApiError> {
        let text = response.text().await.map_err(NetworkError::from)?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!(
                "Failed to parse {}: {} ({})",
                what,
                e,
                ApiError::truncate_body(&text)
            ))
        })
    }

    // ===== Authentication =====

    /// Log in and store the issued token.
    pub async fn login(&self, request: &LoginRequest) -> Result<String, ApiError> {
        self.authenticate("login", request, LOGIN_FAILED_MESSAGE).await
    }

    /// Create an account and store the issued token.
    pub async fn register(&self, request: &RegisterRequest) -> Result<String, ApiError> {
        self.authenticate("register", request, REGISTER_FAILED_MESSAGE)
            .await
    }

    /// Forget the session. No request is made.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.store.clear()?;
        Ok(())
    }

    /// Credential exchange succeeds only on a 2xx that carries a token.
    /// Failures report the server's message when it sends one.
    async fn authenticate<B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
        default_message: &str,
    ) -> Result<String, ApiError> {
        let response = self
            .send(Method::POST, self.endpoint(&[endpoint]), Some(body))
            .await?;
        let status = response.status();
        let text = response.text().await.map_err(NetworkError::from)?;
        let parsed: AuthResponse = serde_json::from_str(&text).unwrap_or_default();

        match parsed.token {
            Some(token) if status.is_success() && !token.is_empty() => {
                self.store.set(token.clone())?;
                debug!(endpoint, "Credential exchange succeeded");
                Ok(token)
            }
            _ if status.is_server_error() => Err(ApiError::ServerError(
                parsed
                    .message
                    .unwrap_or_else(|| ApiError::truncate_body(&text)),
            )),
            _ => {
                debug!(endpoint, status = status.as_u16(), "Credential exchange rejected");
                Err(ApiError::Rejected {
                    status: status.as_u16(),
                    message: parsed
                        .message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| default_message.to_string()),
                })
            }
        }
    }

    // ===== Users =====

    /// Fetch all users
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let response = self
            .send::<()>(Method::GET, self.endpoint(&["users"]), None)
            .await?;
        let response = Self::check_response(response).await?;
        let list: UserList = Self::read_json(response, "user list").await?;
        Ok(list.into_users())
    }

    /// Fetch a single user by id
    pub async fn get_user(&self, id: &str) -> Result<User, ApiError> {
        let response = self
            .send::<()>(Method::GET, self.endpoint(&["users", id]), None)
            .await?;
        let response = Self::check_response(response).await?;
        Self::read_json(response, "user").await
    }

    /// Update a user. The response body is not relied upon.
    pub async fn update_user(&self, id: &str, patch: &UserUpdate) -> Result<(), ApiError> {
        let response = self
            .send(Method::PUT, self.endpoint(&["users", id]), Some(patch))
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    /// Delete a user
    pub async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        let response = self
            .send::<()>(Method::DELETE, self.endpoint(&["users", id]), None)
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::{AuthError, NetworkErrorKind};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), Arc::new(CredentialStore::in_memory()))
            .expect("client")
    }

    #[test]
    fn test_rejects_unusable_base_urls() {
        let store = Arc::new(CredentialStore::in_memory());
        assert!(matches!(
            ApiClient::new("not a url", store.clone()),
            Err(ApiError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            ApiClient::new("ftp://example.com", store.clone()),
            Err(ApiError::InvalidBaseUrl(_))
        ));
        assert!(ApiClient::new("http://localhost:3001/api", store).is_ok());
    }

    #[test]
    fn test_endpoint_keeps_base_path_and_encodes_ids() {
        let store = Arc::new(CredentialStore::in_memory());
        let client = ApiClient::new("http://localhost:3001/api/", store).expect("client");
        assert_eq!(
            client.endpoint(&["users", "42"]).as_str(),
            "http://localhost:3001/api/users/42"
        );
        assert_eq!(
            client.endpoint(&["users", "a/b"]).as_str(),
            "http://localhost:3001/api/users/a%2Fb"
        );
        assert_eq!(
            client
                .endpoint(&ApiClient::path_segments("/dashboard"))
                .as_str(),
            "http://localhost:3001/api/dashboard"
        );
    }

    #[test]
    fn test_path_url_keeps_query_string() {
        let store = Arc::new(CredentialStore::in_memory());
        let client = ApiClient::new("http://localhost:3001/api", store).expect("client");
        assert_eq!(
            client.path_url("/dashboard?scope=admin").as_str(),
            "http://localhost:3001/api/dashboard?scope=admin"
        );
        assert_eq!(
            client.path_url("/dashboard?").as_str(),
            "http://localhost:3001/api/dashboard"
        );
        assert_eq!(
            client.path_url("admin/ping").as_str(),
            "http://localhost:3001/api/admin/ping"
        );
    }

    #[tokio::test]
    async fn test_probe_sends_query_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dashboard"))
            .and(query_param("scope", "admin"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let status = client
            .probe("/dashboard?scope=admin")
            .await
            .expect("probe");
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_request_attaches_stored_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(header("Authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.store().set("abc123").expect("set token");

        let response = client
            .request::<()>(Method::GET, "/users", None)
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_request_without_token_omits_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response = client
            .request::<()>(Method::GET, "/users", None)
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_request_does_not_interpret_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dashboard"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let status = client.probe("/dashboard").await.expect("probe");
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let client = ApiClient::new(
            &format!("http://{}", addr),
            Arc::new(CredentialStore::in_memory()),
        )
        .expect("client");

        let err = client.probe("/dashboard").await.expect_err("should fail");
        assert_eq!(err.kind, NetworkErrorKind::Connect);
    }

    #[tokio::test]
    async fn test_login_stores_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({"email": "ana@example.com", "password": "s3cret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc123"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let token = client
            .login(&LoginRequest {
                email: "ana@example.com".into(),
                password: "s3cret".into(),
            })
            .await
            .expect("login");

        assert_eq!(token, "abc123");
        assert_eq!(client.store().get().as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_login_failure_reports_server_message_and_keeps_store() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Wrong password"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .login(&LoginRequest {
                email: "ana@example.com".into(),
                password: "nope".into(),
            })
            .await
            .expect_err("login should fail");

        match err {
            ApiError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Wrong password");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(client.store().get(), None);
    }

    #[tokio::test]
    async fn test_register_without_token_uses_default_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .register(&RegisterRequest {
                name: "Ana".into(),
                email: "ana@example.com".into(),
                password: "s3cret".into(),
            })
            .await
            .expect_err("no token means failure");

        assert_eq!(err.to_string(), REGISTER_FAILED_MESSAGE);
        assert_eq!(client.store().get(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_without_network() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        client.store().set("abc123").expect("set");

        client.logout().expect("logout");

        assert_eq!(client.store().get(), None);
        let received = server.received_requests().await.unwrap_or_default();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_list_users_unwraps_users_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": [
                    {"_id": "1", "name": "Ana", "email": "ana@example.com"},
                    {"_id": "2", "name": "Bruno", "email": "bruno@example.com"}
                ]
            })))
            .mount(&server)
            .await;

        let users = client_for(&server).list_users().await.expect("users");
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].name, "Bruno");
    }

    #[tokio::test]
    async fn test_list_users_maps_auth_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})))
            .mount(&server)
            .await;

        let err = client_for(&server).list_users().await.expect_err("401");
        assert_eq!(err.auth_error(), Some(AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_update_and_delete_user() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/users/7"))
            .and(body_json(json!({"name": "Renamed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "updated"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/users/7"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .update_user("7", &UserUpdate::name("Renamed"))
            .await
            .expect("update");
        client.delete_user("7").await.expect("delete");
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "User not found"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_user("missing")
            .await
            .expect_err("404");
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "User not found"));
    }

    #[tokio::test]
    async fn test_token_read_fresh_for_every_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"users": []})))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.store().set("first").expect("set");
        client.list_users().await.expect("first call");
        client.store().set("second").expect("set");
        client.list_users().await.expect("second call");

        let seen: Vec<String> = server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|r| r.headers.get("Authorization"))
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();
        assert_eq!(seen, vec!["Bearer first", "Bearer second"]);
    }
}
