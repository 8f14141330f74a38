//! HTTP client for the WeCom server API.
//!
//! This module provides the `WeComClient` struct. Building a client performs
//! the one `/gettoken` call of the session; every later call attaches that
//! token as the `access_token` query parameter.
//!
//! # Calls and outcomes
//!
//! Every operation is a single HTTP round trip in one of three shapes: GET
//! with query parameters, POST with a JSON body, POST with a multipart file.
//! Each returns `Ok(ApiReply)` once a vendor envelope was parsed, whether
//! `errcode` was zero or not. `Err` is reserved for failures that never
//! reached an envelope (transport, timeout, unparseable body), for local
//! validation failures (nothing was sent), and for token errors.
//!
//! # Token lifetime
//!
//! Tokens expire after 7200 seconds and are never refreshed. Once WeCom
//! reports the token as invalid, missing or expired, calls fail with
//! `WeComError::Authentication` and the caller must build a new client.
//!
//! # Security
//!
//! Neither the corp secret nor the access token is ever logged. Transport
//! errors are stripped of their URL and HTTP error bodies are sanitized.

use std::fmt;
use std::time::Duration;

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::{codes, WeComError};
use crate::models::{
    check_length, check_userid, interpret_response, parse_content_disposition,
    validate_tag_name, ApiReply, DepartmentUpdate, MediaDownload, MediaFetch, MediaFile,
    MediaType, MemberQuery, Message, NewDepartment, NewUser, TagBody, TagMembers,
    TokenResponse, UserUpdate,
};

/// Maximum length for HTTP error response bodies kept in errors.
const MAX_ERROR_BODY_LEN: usize = 500;

/// HTTP client for the WeCom API.
///
/// Immutable after construction; clones share the connection pool and the
/// session token, so a client can be used from many tasks at once.
///
/// # Example
///
/// ```ignore
/// let config = Config::from_env()?;
/// let client = WeComClient::connect(&config).await?;
///
/// let reply = client.create_department(&NewDepartment::new("Engineering")).await?;
/// if reply.success {
///     println!("created {}", reply.payload["id"]);
/// }
/// ```
#[derive(Clone)]
pub struct WeComClient {
    /// The underlying HTTP client (cloning is cheap).
    http: Client,

    /// Base URL, e.g. `https://qyapi.weixin.qq.com/cgi-bin`.
    base_url: String,

    /// Agent id messages are sent under.
    agent_id: u32,

    /// Per-request timeout, kept for error reporting.
    timeout: Duration,

    /// Session token.
    /// SECURITY: Never log this value!
    access_token: String,
}

impl fmt::Debug for WeComClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeComClient")
            .field("base_url", &self.base_url)
            .field("agent_id", &self.agent_id)
            .field("timeout", &self.timeout)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl WeComClient {
    /// Creates a client and acquires the session token.
    ///
    /// # Errors
    ///
    /// - `WeComError::HttpClient` if the HTTP client fails to initialize
    /// - a transport error if `/gettoken` could not be reached or parsed
    /// - `WeComError::Authentication` if the response carries no token
    pub async fn connect(config: &Config) -> Result<Self, WeComError> {
        let http = Self::build_http(config.timeout)?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let access_token = Self::fetch_access_token(&http, &base_url, config).await?;

        Ok(Self {
            http,
            base_url,
            agent_id: config.agent_id,
            timeout: config.timeout,
            access_token,
        })
    }

    /// Creates a client around a token obtained elsewhere.
    ///
    /// No network call is made.
    ///
    /// # Errors
    ///
    /// Returns `WeComError::HttpClient` if the HTTP client fails to initialize.
    pub fn with_access_token(
        config: &Config,
        access_token: impl Into<String>,
    ) -> Result<Self, WeComError> {
        Ok(Self {
            http: Self::build_http(config.timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            agent_id: config.agent_id,
            timeout: config.timeout,
            access_token: access_token.into(),
        })
    }

    fn build_http(timeout: Duration) -> Result<Client, WeComError> {
        Client::builder()
            .timeout(timeout)
            .build()
            .map_err(WeComError::HttpClient)
    }

    /// Performs `GET /gettoken?corpid=..&corpsecret=..`.
    async fn fetch_access_token(
        http: &Client,
        base_url: &str,
        config: &Config,
    ) -> Result<String, WeComError> {
        let operation = "GET /gettoken";
        tracing::debug!(corp_id = %config.corp_id, "Requesting WeCom access token");

        let response = http
            .get(format!("{}/gettoken", base_url))
            .query(&[
                ("corpid", config.corp_id.as_str()),
                ("corpsecret", config.corp_secret()),
            ])
            .send()
            .await
            .map_err(|e| WeComError::from_reqwest(e, config.timeout, operation))?;

        let payload =
            Self::read_envelope(response, operation, config.timeout, config.corp_secret()).await?;
        let token = serde_json::from_value::<TokenResponse>(payload)
            .map_err(|source| WeComError::InvalidBody {
                operation: operation.to_string(),
                source,
            })?
            .into_token()
            .inspect_err(|e| tracing::error!(error = %e, "Failed to acquire access token"))?;

        tracing::info!("WeCom access token acquired");
        Ok(token)
    }

    /// Returns the agent id messages are sent under.
    pub fn agent_id(&self) -> u32 {
        self.agent_id
    }

    /// Returns the session token for sanitization purposes.
    ///
    /// This should ONLY be used for sanitizing error messages, never for logging.
    pub(crate) fn token_for_sanitization(&self) -> &str {
        &self.access_token
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Starts a request with the token attached.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        tracing::debug!(method = %method, path = %path, "Making WeCom API request");
        self.http
            .request(method, self.url(path))
            .query(&[("access_token", self.access_token.as_str())])
    }

    /// Issues a GET with query parameters and interprets the envelope.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiReply, WeComError> {
        let request = self.request(Method::GET, path).query(query);
        self.dispatch(&format!("GET {}", path), request).await
    }

    /// Issues a POST with a UTF-8 JSON body and interprets the envelope.
    async fn post_json<B>(&self, path: &str, body: &B) -> Result<ApiReply, WeComError>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(body)?;
        let request = self
            .request(Method::POST, path)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(body);
        self.dispatch(&format!("POST {}", path), request).await
    }

    /// Issues a multipart POST and interprets the envelope.
    async fn post_multipart(
        &self,
        path: &str,
        query: &[(&str, String)],
        form: Form,
    ) -> Result<ApiReply, WeComError> {
        let request = self.request(Method::POST, path).query(query).multipart(form);
        self.dispatch(&format!("POST {}", path), request).await
    }

    async fn dispatch(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<ApiReply, WeComError> {
        let response = request
            .send()
            .await
            .map_err(|e| WeComError::from_reqwest(e, self.timeout, operation))?;

        let payload =
            Self::read_envelope(response, operation, self.timeout, &self.access_token).await?;
        tracing::trace!(
            operation = %operation,
            body = %WeComError::sanitize_message(&payload.to_string(), &self.access_token),
            "WeCom API response"
        );
        self.check_token(interpret_response(payload))
    }

    /// Reads a response body as a JSON envelope.
    ///
    /// Non-2xx responses are accepted only when they still carry `errcode`.
    /// The body is not logged here: on `/gettoken` it holds the new token.
    async fn read_envelope(
        response: Response,
        operation: &str,
        timeout: Duration,
        secret: &str,
    ) -> Result<Value, WeComError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WeComError::from_reqwest(e, timeout, operation))?;

        let parsed = serde_json::from_str::<Value>(&body);
        if !status.is_success() {
            return match parsed {
                Ok(payload) if payload.get("errcode").is_some() => Ok(payload),
                _ => Err(Self::http_status_error(status, &body, secret)),
            };
        }

        parsed.map_err(|source| WeComError::InvalidBody {
            operation: operation.to_string(),
            source,
        })
    }

    fn http_status_error(status: StatusCode, body: &str, secret: &str) -> WeComError {
        let body = WeComError::sanitize_message(body, secret);
        let body = if body.chars().count() > MAX_ERROR_BODY_LEN {
            let truncated: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
            format!("{}...[truncated]", truncated)
        } else {
            body
        };
        tracing::warn!(status = %status, "WeCom returned an HTTP error");
        WeComError::HttpStatus { status, body }
    }

    /// Escalates token rejections; every other envelope passes through.
    fn check_token(&self, reply: ApiReply) -> Result<ApiReply, WeComError> {
        match reply.errcode() {
            Some(code) if !reply.success && codes::is_token_error(code) => {
                let message = reply.errmsg().unwrap_or("access token rejected").to_string();
                tracing::warn!(errcode = code, "WeCom rejected the access token");
                Err(WeComError::authentication(code, message))
            }
            _ => Ok(reply),
        }
    }

    /// Verifies the token works by listing departments.
    ///
    /// # Errors
    ///
    /// Returns `WeComError::Config` describing why the check failed.
    pub async fn test_connection(&self) -> Result<(), WeComError> {
        tracing::debug!("Testing connection to WeCom");

        match self.list_departments().await {
            Ok(reply) if reply.success => {
                tracing::info!("Connection test successful");
                Ok(())
            }
            Ok(reply) => Err(WeComError::invalid_config(format!(
                "department list rejected (errcode {}): {} - check the app's contact permissions",
                reply.errcode().unwrap_or(-1),
                reply.errmsg().unwrap_or("no message")
            ))),
            Err(WeComError::Authentication { code, message }) => Err(WeComError::invalid_config(
                format!("access token rejected ({}): {}", code, message),
            )),
            Err(e) if e.is_transport() => Err(WeComError::invalid_config(format!(
                "{} - verify WECOM_BASE_URL and network connectivity",
                e.sanitized_display(&[self.access_token.as_str()])
            ))),
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Departments
    // ========================================================================

    /// Creates a department.
    ///
    /// On success the payload carries the new `id`.
    pub async fn create_department(
        &self,
        department: &NewDepartment,
    ) -> Result<ApiReply, WeComError> {
        department.validate()?;
        self.post_json("/department/create", department).await
    }

    /// Updates a department; only fields set on `update` are sent.
    pub async fn update_department(
        &self,
        update: &DepartmentUpdate,
    ) -> Result<ApiReply, WeComError> {
        update.validate()?;
        self.post_json("/department/update", update).await
    }

    /// Deletes a department.
    ///
    /// The root and departments with children or members cannot be deleted.
    pub async fn delete_department(&self, id: u64) -> Result<ApiReply, WeComError> {
        self.get("/department/delete", &[("id", id.to_string())])
            .await
    }

    /// Lists all departments visible to the app.
    ///
    /// Decode with [`DepartmentList`](crate::models::DepartmentList).
    pub async fn list_departments(&self) -> Result<ApiReply, WeComError> {
        self.get("/department/list", &[]).await
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Returns `WeComError::Validation` without sending anything when
    /// userid or name is missing, no department is given, or no contact
    /// (mobile, email, weixinid) is set.
    pub async fn create_user(&self, user: &NewUser) -> Result<ApiReply, WeComError> {
        user.validate()?;
        self.post_json("/user/create", user).await
    }

    /// Updates a user; only fields set on `update` are sent.
    pub async fn update_user(&self, update: &UserUpdate) -> Result<ApiReply, WeComError> {
        update.validate()?;
        self.post_json("/user/update", update).await
    }

    /// Deletes a user.
    pub async fn delete_user(&self, userid: &str) -> Result<ApiReply, WeComError> {
        check_userid(userid)?;
        self.get("/user/delete", &[("userid", userid.to_string())])
            .await
    }

    /// Deletes several users in one call.
    pub async fn batch_delete_users<S>(&self, userids: &[S]) -> Result<ApiReply, WeComError>
    where
        S: AsRef<str>,
    {
        if userids.is_empty() {
            return Err(WeComError::validation("useridlist cannot be empty"));
        }
        let useridlist: Vec<&str> = userids.iter().map(AsRef::as_ref).collect();
        for userid in &useridlist {
            check_userid(userid)?;
        }
        self.post_json("/user/batchdelete", &json!({ "useridlist": useridlist }))
            .await
    }

    /// Gets one user.
    ///
    /// Decode with [`UserDetail`](crate::models::UserDetail).
    pub async fn get_user(&self, userid: &str) -> Result<ApiReply, WeComError> {
        check_userid(userid)?;
        self.get("/user/get", &[("userid", userid.to_string())])
            .await
    }

    /// Lists members of a department (ids and names).
    ///
    /// Decode with [`SimpleUserList`](crate::models::SimpleUserList).
    pub async fn list_department_users(
        &self,
        query: MemberQuery,
    ) -> Result<ApiReply, WeComError> {
        self.get("/user/simplelist", &query.to_query()).await
    }

    /// Lists members of a department with full details.
    ///
    /// Decode with [`UserList`](crate::models::UserList).
    pub async fn list_department_users_detail(
        &self,
        query: MemberQuery,
    ) -> Result<ApiReply, WeComError> {
        self.get("/user/list", &query.to_query()).await
    }

    /// Invites a user to follow the corp account.
    ///
    /// `invite_tips` is only honoured for WeChat invitations of verified corps.
    pub async fn invite_user(
        &self,
        userid: &str,
        invite_tips: Option<&str>,
    ) -> Result<ApiReply, WeComError> {
        check_userid(userid)?;
        let mut data = serde_json::Map::new();
        data.insert("userid".to_string(), json!(userid));
        if let Some(tips) = invite_tips {
            data.insert("invite_tips".to_string(), json!(tips));
        }
        self.post_json("/invite/send", &Value::Object(data)).await
    }

    /// Confirms a user's second validation after OAuth login.
    pub async fn second_validation(&self, userid: &str) -> Result<ApiReply, WeComError> {
        check_userid(userid)?;
        self.get("/user/authsucc", &[("userid", userid.to_string())])
            .await
    }

    // ========================================================================
    // Tags
    // ========================================================================

    /// Creates a tag. On success the payload carries the new `tagid`.
    pub async fn create_tag(&self, tagname: &str) -> Result<ApiReply, WeComError> {
        validate_tag_name(tagname)?;
        self.post_json(
            "/tag/create",
            &TagBody {
                tagid: None,
                tagname,
            },
        )
        .await
    }

    /// Renames a tag.
    pub async fn update_tag(&self, tagid: u64, tagname: &str) -> Result<ApiReply, WeComError> {
        validate_tag_name(tagname)?;
        self.post_json(
            "/tag/update",
            &TagBody {
                tagid: Some(tagid),
                tagname,
            },
        )
        .await
    }

    /// Deletes a tag.
    pub async fn delete_tag(&self, tagid: u64) -> Result<ApiReply, WeComError> {
        self.get("/tag/delete", &[("tagid", tagid.to_string())])
            .await
    }

    /// Gets the users and departments carrying a tag.
    ///
    /// Decode with [`TagMembersReply`](crate::models::TagMembersReply).
    pub async fn get_tag_members(&self, tagid: u64) -> Result<ApiReply, WeComError> {
        self.get("/tag/get", &[("tagid", tagid.to_string())]).await
    }

    /// Attaches users and departments to a tag.
    pub async fn add_tag_members(
        &self,
        tagid: u64,
        members: &TagMembers,
    ) -> Result<ApiReply, WeComError> {
        members.validate()?;
        self.post_json("/tag/addtagusers", &members.to_body(tagid))
            .await
    }

    /// Detaches users and departments from a tag.
    pub async fn remove_tag_members(
        &self,
        tagid: u64,
        members: &TagMembers,
    ) -> Result<ApiReply, WeComError> {
        members.validate()?;
        self.post_json("/tag/deltagusers", &members.to_body(tagid))
            .await
    }

    /// Lists all tags.
    ///
    /// Decode with [`TagList`](crate::models::TagList).
    pub async fn list_tags(&self) -> Result<ApiReply, WeComError> {
        self.get("/tag/list", &[]).await
    }

    // ========================================================================
    // Media
    // ========================================================================

    /// Uploads a media file as the `media` form part.
    ///
    /// On success the payload carries the `media_id` to use in messages;
    /// decode with [`MediaUploaded`](crate::models::MediaUploaded).
    pub async fn upload_media(
        &self,
        media_type: MediaType,
        file: MediaFile,
    ) -> Result<ApiReply, WeComError> {
        file.validate()?;
        tracing::debug!(
            media_type = %media_type,
            size = file.bytes.len(),
            "Uploading media"
        );

        let mut part = Part::bytes(file.bytes).file_name(file.file_name);
        if let Some(content_type) = file.content_type {
            part = part.mime_str(&content_type).map_err(|e| {
                WeComError::validation(format!("invalid content type {:?}: {}", content_type, e))
            })?;
        }
        let form = Form::new().part("media", part);

        self.post_multipart(
            "/media/upload",
            &[("type", media_type.as_str().to_string())],
            form,
        )
        .await
    }

    /// Downloads a media file.
    ///
    /// Returns the raw file, or `MediaFetch::Rejected` when WeCom answers
    /// with an error envelope instead.
    pub async fn get_media(&self, media_id: &str) -> Result<MediaFetch, WeComError> {
        check_length("media_id", media_id, 1, usize::MAX)?;
        let operation = "GET /media/get";

        let response = self
            .request(Method::GET, "/media/get")
            .query(&[("media_id", media_id)])
            .send()
            .await
            .map_err(|e| WeComError::from_reqwest(e, self.timeout, operation))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_disposition);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| WeComError::from_reqwest(e, self.timeout, operation))?;

        let looks_like_envelope = content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/json") || ct.starts_with("text/plain"));

        if looks_like_envelope || !status.is_success() {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(payload)
                    if payload
                        .get("errcode")
                        .and_then(Value::as_i64)
                        .is_some_and(|code| code != codes::SUCCESS) =>
                {
                    let reply = self.check_token(interpret_response(payload))?;
                    return Ok(MediaFetch::Rejected(reply));
                }
                _ if !status.is_success() => {
                    return Err(Self::http_status_error(
                        status,
                        &String::from_utf8_lossy(&bytes),
                        &self.access_token,
                    ));
                }
                _ => {}
            }
        }

        Ok(MediaFetch::File(MediaDownload {
            content_type,
            file_name,
            bytes: bytes.to_vec(),
        }))
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Sends a message under this client's agent id.
    ///
    /// # Errors
    ///
    /// Returns `WeComError::Validation` without sending anything when the
    /// content is incomplete (empty text, empty media id, no articles, an
    /// article without a title) or when the recipients name an explicit but
    /// empty user list with no parties or tags, which would address nobody.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let message = Message::text("deploy finished").to(Recipients::users(["zhangsan"]));
    /// let reply = client.send_message(&message).await?;
    /// ```
    pub async fn send_message(&self, message: &Message) -> Result<ApiReply, WeComError> {
        message.validate()?;
        let payload = message.to_payload(self.agent_id)?;
        tracing::debug!(msgtype = message.content.msgtype(), "Sending message");
        self.post_json("/message/send", &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Creates a client for unit tests without any network call.
    fn test_client() -> WeComClient {
        let config = Config::new("corp", "secret")
            .with_agent_id(1000002)
            .with_base_url("https://example.com/cgi-bin/")
            .expect("valid base url");
        WeComClient::with_access_token(&config, "TOKEN").expect("client builds")
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let client = test_client();
        assert_eq!(
            client.url("/department/list"),
            "https://example.com/cgi-bin/department/list"
        );
    }

    #[test]
    fn test_agent_id_from_config() {
        assert_eq!(test_client().agent_id(), 1000002);
    }

    #[test]
    fn test_request_puts_token_first() {
        let client = test_client();
        let request = client
            .request(Method::GET, "/user/get")
            .query(&[("userid", "a&b")])
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://example.com/cgi-bin/user/get?access_token=TOKEN&userid=a%26b"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let shown = format!("{:?}", test_client());
        assert!(!shown.contains("TOKEN"));
        assert!(shown.contains("[REDACTED]"));
    }

    #[test]
    fn test_check_token_escalates_expired_token() {
        let client = test_client();
        let reply = interpret_response(json!({"errcode": 42001, "errmsg": "access_token expired"}));
        let err = client.check_token(reply).unwrap_err();
        assert!(matches!(err, WeComError::Authentication { code: 42001, .. }));
    }

    #[test]
    fn test_check_token_passes_other_rejections() {
        let client = test_client();
        let reply = interpret_response(json!({"errcode": 60111, "errmsg": "userid not found"}));
        let reply = client.check_token(reply).unwrap();
        assert!(!reply.success);
    }

    #[test]
    fn test_http_status_error_truncates_and_sanitizes() {
        let body = format!("TOKEN {}", "x".repeat(1000));
        let err = WeComClient::http_status_error(StatusCode::BAD_GATEWAY, &body, "TOKEN");
        match err {
            WeComError::HttpStatus { status, body } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert!(body.starts_with("[REDACTED]"));
                assert!(body.ends_with("...[truncated]"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
