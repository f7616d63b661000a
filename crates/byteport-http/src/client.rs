//! HTTP client for the Byteport REST API
//!
//! Handles store submissions, the cookie login flow, and the read-side
//! query endpoints. Raw protocol failures are translated into the typed
//! error taxonomy at this boundary and never leak upward.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDateTime;
use reqwest::header::COOKIE;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use byteport_core::encode::{encode_blob, Compression};
use byteport_core::error::{ByteportError, ByteportResult};
use byteport_core::timestamp::Timestamp;
use byteport_core::value::DataPoint;
use byteport_core::{RESERVED_KEY_FIELD, RESERVED_TIMESTAMP_FIELD};

use crate::config::{HttpConfig, PayloadPlacement, DEFAULT_USER_AGENT};
use crate::session::{Session, SessionState};

// API v1 paths
const LOGIN_PATH: &str = "/api/v1/login/";
const STORE_PATH: &str = "/api/v1/timeseries/";
const LIST_NAMESPACES_PATH: &str = "/api/v1/namespace/";
const QUERY_DEVICES_PATH: &str = "/api/v1/search_devices/";

/// Timestamp format for the time-series range endpoint
const ISO8601_MICROS: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// HTTP client for Byteport
///
/// One instance owns one session; mutating calls take `&mut self`, so an
/// instance cannot be shared across concurrent submits without external
/// synchronization.
pub struct ByteportHttpClient {
    config: HttpConfig,
    http: reqwest::Client,
    session: Session,
}

impl ByteportHttpClient {
    /// Create a new client without touching the network
    pub fn new(config: HttpConfig) -> ByteportResult<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            // Redirects are not followed so that cookies are captured on
            // every hop; a redirect status counts as success.
            .redirect(reqwest::redirect::Policy::none());

        builder = match &config.proxy {
            Some(proxy) => {
                info!("routing requests through SOCKS proxy at {}:{}", proxy.addr, proxy.port);
                let proxy = reqwest::Proxy::all(proxy.url())
                    .map_err(|e| ByteportError::Config(format!("invalid proxy: {e}")))?;
                builder.proxy(proxy)
            }
            None => builder.user_agent(DEFAULT_USER_AGENT),
        };

        let http = builder
            .build()
            .map_err(|e| ByteportError::Config(format!("failed to create HTTP client: {e}")))?;

        if !config.store_enabled() {
            info!("store calls are disabled, no namespace or API key was supplied");
        }

        Ok(Self {
            config,
            http,
            session: Session::default(),
        })
    }

    /// Create a client and, when configured, verify the store credentials
    /// with an initial empty store call
    pub async fn connect(config: HttpConfig) -> ByteportResult<Self> {
        let initial_heartbeat = config.initial_heartbeat && config.store_enabled();
        let mut client = Self::new(config)?;

        if initial_heartbeat {
            client.heartbeat().await?;
        }

        Ok(client)
    }

    /// The configuration this client was constructed with
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// The session owned by this client
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    /// Execute a request: replay the session cookies, capture new ones,
    /// and map the response status into the error taxonomy
    async fn execute(&mut self, request: reqwest::RequestBuilder) -> ByteportResult<reqwest::Response> {
        let request = match self.session.cookie_header() {
            Some(cookies) => request.header(COOKIE, cookies),
            None => request,
        };

        let response = request.send().await.map_err(map_transport_error)?;
        self.session.absorb(response.headers());

        let status = response.status();
        if status.is_success() || status.is_redirection() {
            return Ok(response);
        }

        match status {
            StatusCode::FORBIDDEN => {
                debug!("request denied with 403");
                Err(ByteportError::Forbidden)
            }
            StatusCode::NOT_FOUND => {
                debug!("request failed with 404");
                Err(ByteportError::DeviceNotFound {
                    namespace: self.config.namespace.clone().unwrap_or_default(),
                })
            }
            status => Err(ByteportError::Transport(format!(
                "unexpected HTTP status {status}"
            ))),
        }
    }

    async fn get_json(
        &mut self,
        path: &str,
        query: &[(&str, String)],
    ) -> ByteportResult<serde_json::Value> {
        let url = self.url(path);
        debug!("GET {url}");
        let request = self.http.get(&url).query(query);
        let response = self.execute(request).await?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ByteportError::Transport(format!("failed to decode response: {e}")))
    }

    // ------------------------------------------------------------------
    // Login
    // ------------------------------------------------------------------

    /// Log in with username and password
    ///
    /// The flow is a GET to obtain the CSRF cookie followed by a POST with
    /// the credentials and the CSRF token. Success is decided solely by the
    /// presence of a `sessionid` cookie afterward; the server's redirect
    /// and cookie behavior is the authoritative signal, not the POST
    /// status.
    pub async fn login(&mut self, username: &str, password: &str) -> ByteportResult<()> {
        let url = self.url(LOGIN_PATH);

        let request = self.http.get(&url);
        self.execute(request).await?;
        self.session.set_state(SessionState::AwaitingCsrfToken);

        let csrf_token = self
            .session
            .cookie("csrftoken")
            .ok_or_else(|| ByteportError::Session("failed to extract csrftoken cookie".to_string()))?
            .to_string();

        let mut form = BTreeMap::new();
        form.insert("username", username.to_string());
        form.insert("password", password.to_string());
        form.insert("csrfmiddlewaretoken", csrf_token);

        let request = self.http.post(&url).form(&form);
        match self.execute(request).await {
            Ok(_) => {}
            // Credential rejection, not a generic authorization failure
            Err(ByteportError::Forbidden) => {
                return Err(ByteportError::LoginFailed(username.to_string()))
            }
            Err(e) => return Err(e),
        }

        if self.session.cookie("sessionid").is_some() {
            self.session.set_state(SessionState::Authenticated);
            info!("logged in user {username}");
            Ok(())
        } else {
            Err(ByteportError::LoginFailed(username.to_string()))
        }
    }

    // ------------------------------------------------------------------
    // Store
    // ------------------------------------------------------------------

    fn store_credentials(&self) -> ByteportResult<(String, String)> {
        match (&self.config.namespace, &self.config.api_key) {
            (Some(namespace), Some(api_key)) => Ok((namespace.clone(), api_key.clone())),
            _ => Err(ByteportError::Config(
                "store calls require a namespace and an API key".to_string(),
            )),
        }
    }

    fn resolve_device_uid(&self, device_uid: Option<&str>) -> ByteportResult<String> {
        device_uid
            .map(str::to_string)
            .or_else(|| self.config.default_device_uid.clone())
            .ok_or_else(|| {
                ByteportError::Config("no device uid supplied or configured".to_string())
            })
    }

    /// Validate and encode a data point, then merge the reserved fields
    fn build_store_payload(&self, point: &DataPoint) -> ByteportResult<BTreeMap<String, String>> {
        let (_, api_key) = self.store_credentials()?;

        let mut payload = point.encode()?;
        payload.insert(RESERVED_KEY_FIELD.to_string(), api_key);
        if let Some(timestamp) = point.timestamp() {
            payload.insert(RESERVED_TIMESTAMP_FIELD.to_string(), timestamp.normalize()?);
        }
        Ok(payload)
    }

    /// Store a data point
    ///
    /// The device uid falls back to the configured default when not
    /// supplied. Payload placement (POST body or GET query string) follows
    /// the configured strategy.
    pub async fn store(
        &mut self,
        point: &DataPoint,
        device_uid: Option<&str>,
    ) -> ByteportResult<()> {
        let (namespace, _) = self.store_credentials()?;
        let uid = self.resolve_device_uid(device_uid)?;
        let payload = self.build_store_payload(point)?;

        let url = format!("{}{namespace}/{uid}/", self.url(STORE_PATH));
        debug!("storing {} fields to {url}", payload.len());

        let request = match self.config.placement {
            PayloadPlacement::FormBody => self.http.post(&url).form(&payload),
            PayloadPlacement::QueryString => self.http.get(&url).query(&payload),
        };
        self.execute(request).await?;
        Ok(())
    }

    /// Signal liveness with an empty store call
    pub async fn heartbeat(&mut self) -> ByteportResult<()> {
        self.store(&DataPoint::new(), None).await
    }

    /// Store a log message under a severity field
    pub async fn log(
        &mut self,
        level: &str,
        message: &str,
        device_uid: Option<&str>,
    ) -> ByteportResult<()> {
        let point = DataPoint::new().field(level, message);
        self.store(&point, device_uid).await
    }

    /// Store one file's contents under a field, unencoded
    pub async fn store_file(
        &mut self,
        field_name: &str,
        path: impl AsRef<Path>,
        device_uid: Option<&str>,
        timestamp: Option<Timestamp>,
    ) -> ByteportResult<()> {
        let contents = std::fs::read_to_string(path)?;
        let mut point = DataPoint::new().field(field_name, contents);
        if let Some(ts) = timestamp {
            point = point.at(ts);
        }
        self.store(&point, device_uid).await
    }

    /// Compress and base64-encode a data block into a single field
    pub async fn store_blob(
        &mut self,
        field_name: &str,
        data: &[u8],
        compression: Compression,
        device_uid: Option<&str>,
        timestamp: Option<Timestamp>,
    ) -> ByteportResult<()> {
        let encoded = encode_blob(data, compression)?;
        let mut point = DataPoint::new().field(field_name, encoded);
        if let Some(ts) = timestamp {
            point = point.at(ts);
        }
        self.store(&point, device_uid).await
    }

    /// Compress and base64-encode a file into a single field
    pub async fn store_file_base64(
        &mut self,
        field_name: &str,
        path: impl AsRef<Path>,
        compression: Compression,
        device_uid: Option<&str>,
        timestamp: Option<Timestamp>,
    ) -> ByteportResult<()> {
        let data = std::fs::read(path)?;
        self.store_blob(field_name, &data, compression, device_uid, timestamp)
            .await
    }

    /// Store every file in a directory as one field per file
    ///
    /// File names become field names and are subject to the field naming
    /// rule.
    pub async fn store_directory(
        &mut self,
        directory: impl AsRef<Path>,
        device_uid: Option<&str>,
        timestamp: Option<Timestamp>,
    ) -> ByteportResult<()> {
        let mut point = DataPoint::new();
        for entry in std::fs::read_dir(directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            point.insert(name, std::fs::read_to_string(entry.path())?);
        }

        if point.is_empty() {
            warn!("store_directory found no files to send");
            return Ok(());
        }

        let point = match timestamp {
            Some(ts) => point.at(ts),
            None => point,
        };
        self.store(&point, device_uid).await
    }

    // ------------------------------------------------------------------
    // Read-side queries
    // ------------------------------------------------------------------

    /// List namespaces visible to the session
    pub async fn list_namespaces(&mut self) -> ByteportResult<serde_json::Value> {
        self.get_json(LIST_NAMESPACES_PATH, &[]).await
    }

    /// Search devices by term
    pub async fn query_devices(
        &mut self,
        term: &str,
        full: bool,
        limit: u32,
    ) -> ByteportResult<serde_json::Value> {
        let query = [
            ("term", term.to_string()),
            ("full", full.to_string()),
            ("limit", limit.to_string()),
        ];
        self.get_json(QUERY_DEVICES_PATH, &query).await
    }

    /// List devices registered under a namespace
    pub async fn get_devices(
        &mut self,
        namespace: &str,
        key: Option<&str>,
    ) -> ByteportResult<serde_json::Value> {
        let path = format!("/api/v1/namespace/{namespace}/device/");
        self.get_json(&path, &key_query(key)).await
    }

    /// List device types defined under a namespace
    pub async fn get_device_types(
        &mut self,
        namespace: &str,
        key: Option<&str>,
    ) -> ByteportResult<serde_json::Value> {
        let path = format!("/api/v1/namespace/{namespace}/device_type/");
        self.get_json(&path, &key_query(key)).await
    }

    /// List firmwares for a device type
    pub async fn get_firmwares(
        &mut self,
        namespace: &str,
        device_type_id: &str,
        key: Option<&str>,
    ) -> ByteportResult<serde_json::Value> {
        let path = format!("/api/v1/namespace/{namespace}/device_type/{device_type_id}/firmware/");
        self.get_json(&path, &key_query(key)).await
    }

    /// List field definitions for a device type
    pub async fn get_field_definitions(
        &mut self,
        namespace: &str,
        device_type_id: &str,
        key: Option<&str>,
    ) -> ByteportResult<serde_json::Value> {
        let path =
            format!("/api/v1/namespace/{namespace}/device_type/{device_type_id}/field_definition/");
        self.get_json(&path, &key_query(key)).await
    }

    /// Load historical time-series data for one field of one device
    pub async fn load_timeseries_data(
        &mut self,
        namespace: &str,
        device_uid: &str,
        field_name: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> ByteportResult<serde_json::Value> {
        let path = format!("/api/v1/timeseries/{namespace}/{device_uid}/{field_name}/");
        let query = [
            ("from", from.format(ISO8601_MICROS).to_string()),
            ("to", to.format(ISO8601_MICROS).to_string()),
        ];
        self.get_json(&path, &query).await
    }
}

fn key_query(key: Option<&str>) -> Vec<(&'static str, String)> {
    match key {
        Some(key) => vec![("key", key.to_string())],
        None => Vec::new(),
    }
}

/// Map connection-level failures; everything else is fatal and unmapped
fn map_transport_error(error: reqwest::Error) -> ByteportError {
    if error.is_connect() || error.is_timeout() {
        ByteportError::ConnectFailed(error.to_string())
    } else {
        ByteportError::Transport(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{body_string, body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(endpoint: &str) -> HttpConfig {
        HttpConfig::new(endpoint, "myns", "secret").without_initial_heartbeat()
    }

    async fn test_client(server: &MockServer) -> ByteportHttpClient {
        ByteportHttpClient::new(test_config(&server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_store_posts_reserved_fields_and_data() {
        let server = MockServer::start().await;
        let timestamp = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_micro_opt(0, 0, 1, 500_000)
            .unwrap();

        Mock::given(method("POST"))
            .and(path("/api/v1/timeseries/myns/dev1/"))
            .and(body_string("_key=secret&_ts=1577836801.5&temperature=21.5"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = test_client(&server).await;
        let point = DataPoint::new().field("temperature", 21.5).at(timestamp);
        client.store(&point, Some("dev1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_via_query_string_placement() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/timeseries/myns/dev1/"))
            .and(query_param("_key", "secret"))
            .and(query_param("temperature", "21.5"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server.uri()).placement(PayloadPlacement::QueryString);
        let mut client = ByteportHttpClient::new(config).unwrap();
        let point = DataPoint::new().field("temperature", 21.5);
        client.store(&point, Some("dev1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_uses_default_device_uid() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/timeseries/myns/falling-back/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server.uri()).default_device_uid("falling-back");
        let mut client = ByteportHttpClient::new(config).unwrap();
        client.store(&DataPoint::new(), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_without_credentials_is_a_config_error() {
        let mut client = ByteportHttpClient::new(HttpConfig::default()).unwrap();
        let result = client.store(&DataPoint::new(), Some("dev1")).await;
        assert!(matches!(result, Err(ByteportError::Config(_))));
    }

    #[tokio::test]
    async fn test_404_maps_to_device_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut client = test_client(&server).await;
        let result = client.store(&DataPoint::new(), Some("ghost")).await;
        assert!(
            matches!(result, Err(ByteportError::DeviceNotFound { ref namespace }) if namespace == "myns")
        );
    }

    #[tokio::test]
    async fn test_403_maps_to_forbidden_outside_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let mut client = test_client(&server).await;
        let result = client.store(&DataPoint::new(), Some("dev1")).await;
        assert!(matches!(result, Err(ByteportError::Forbidden)));
    }

    #[tokio::test]
    async fn test_connect_sends_initial_heartbeat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/timeseries/myns/dev1/"))
            .and(body_string("_key=secret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config =
            HttpConfig::new(server.uri(), "myns", "secret").default_device_uid("dev1");
        ByteportHttpClient::connect(config).await.unwrap();
    }

    #[tokio::test]
    async fn test_login_happy_path() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/login/"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("set-cookie", "csrftoken=tok123; Path=/"),
            )
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v1/login/"))
            .and(body_string_contains("csrfmiddlewaretoken=tok123"))
            .and(body_string_contains("username=bob"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("set-cookie", "sessionid=s3cret; Path=/"),
            )
            .mount(&server)
            .await;

        let mut client = test_client(&server).await;
        assert_eq!(client.session().state(), SessionState::Anonymous);

        client.login("bob", "hunter2").await.unwrap();
        assert!(client.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_login_without_csrf_cookie_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/login/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut client = test_client(&server).await;
        let result = client.login("bob", "hunter2").await;
        assert!(matches!(result, Err(ByteportError::Session(_))));
    }

    #[tokio::test]
    async fn test_login_403_is_reported_as_login_failed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/login/"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("set-cookie", "csrftoken=tok123"),
            )
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v1/login/"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let mut client = test_client(&server).await;
        let result = client.login("bob", "wrong").await;
        assert!(matches!(result, Err(ByteportError::LoginFailed(ref u)) if u == "bob"));
        assert!(!client.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_login_without_sessionid_fails_even_on_http_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/login/"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("set-cookie", "csrftoken=tok123"),
            )
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v1/login/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut client = test_client(&server).await;
        let result = client.login("bob", "hunter2").await;
        assert!(matches!(result, Err(ByteportError::LoginFailed(_))));
    }

    #[tokio::test]
    async fn test_session_cookies_are_replayed_on_later_requests() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/login/"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("set-cookie", "csrftoken=tok123"),
            )
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v1/login/"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("set-cookie", "sessionid=s3cret"),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/namespace/"))
            .and(wiremock::matchers::header("cookie", "csrftoken=tok123; sessionid=s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["myns"])))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = test_client(&server).await;
        client.login("bob", "hunter2").await.unwrap();

        let namespaces = client.list_namespaces().await.unwrap();
        assert_eq!(namespaces, serde_json::json!(["myns"]));
    }

    #[tokio::test]
    async fn test_query_devices_builds_parameters() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/search_devices/"))
            .and(query_param("term", "thermo"))
            .and(query_param("full", "false"))
            .and(query_param("limit", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = test_client(&server).await;
        client.query_devices("thermo", false, 20).await.unwrap();
    }

    #[tokio::test]
    async fn test_load_timeseries_formats_range_with_microseconds() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/timeseries/myns/dev1/temperature/"))
            .and(query_param("from", "2020-01-01T00:00:00.000000"))
            .and(query_param("to", "2020-01-02T12:30:45.000001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let from = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let to = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_micro_opt(12, 30, 45, 1)
            .unwrap();

        let mut client = test_client(&server).await;
        client
            .load_timeseries_data("myns", "dev1", "temperature", from, to)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_connect_failed() {
        // Bound then dropped so the port is very likely closed
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let config = test_config(&format!("http://127.0.0.1:{port}"));
        let mut client = ByteportHttpClient::new(config).unwrap();
        let result = client.store(&DataPoint::new(), Some("dev1")).await;
        assert!(matches!(result, Err(ByteportError::ConnectFailed(_))));
    }

    #[tokio::test]
    async fn test_invalid_field_name_aborts_before_any_request() {
        let server = MockServer::start().await;
        // No mocks mounted: a request would fail the test via 404 mapping
        let mut client = test_client(&server).await;

        let point = DataPoint::new().field("bad name", 1i64);
        let result = client.store(&point, Some("dev1")).await;
        assert!(matches!(result, Err(ByteportError::InvalidFieldName(_))));
    }
}
