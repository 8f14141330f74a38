//! # WeCom Admin
//!
//! WeCom Admin is a client for the WeCom (WeChat Work) server API covering
//! the corp directory (departments, members, tags), media files and app
//! messages, plus an MCP (Model Context Protocol) server that exposes the
//! common operations as tools.
//!
//! ## Features
//!
//! - **Directory**: Create, update, delete and list departments, members and tags
//! - **Media**: Upload files as multipart and download them by `media_id`
//! - **Messages**: Send text, media, news and mpnews messages through an app
//! - **Validation**: Malformed requests are rejected locally before anything is sent
//! - **Security**: The corp secret and access token are never logged or exposed in error messages
//!
//! ## Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`config`] - Configuration loading from environment variables
//! - [`error`] - Error types with message sanitization
//! - [`wecom_client`] - HTTP client for the WeCom API
//! - [`server`] - MCP server implementation with tool routing
//! - [`models`] - Request builders, the response envelope and typed views
//! - [`tools`] - Tool input parameter structs
//!
//! ## Outcomes
//!
//! Every client operation returns `Result<ApiReply, WeComError>`. An
//! [`ApiReply`](models::ApiReply) means WeCom answered with an envelope:
//! `success` is true exactly when `errcode` was `0`, and `payload` holds the
//! body as received. Rejections such as "department not found" therefore
//! arrive as `Ok` with `success == false`. `Err` covers transport failures,
//! timeouts, unparseable bodies, local validation failures and token errors.
//!
//! ## Configuration
//!
//! Required environment variables:
//!
//! - `WECOM_CORP_ID`: The corp id
//! - `WECOM_CORP_SECRET`: The secret of the app or of the contacts sync
//!
//! Optional:
//! - `WECOM_AGENT_ID`: App id messages are sent under (default `1`)
//! - `WECOM_BASE_URL`: API base (default `https://qyapi.weixin.qq.com/cgi-bin`)
//! - `WECOM_TIMEOUT_SECS`: Per-request timeout (default `30`)
//! - `RUST_LOG`: Log level (e.g., `wecom_admin=debug`)
//!
//! ## Example
//!
//! Using the [`WeComClient`](wecom_client::WeComClient) directly:
//!
//! ```ignore
//! use wecom_admin::config::Config;
//! use wecom_admin::models::{DepartmentList, NewDepartment};
//! use wecom_admin::wecom_client::WeComClient;
//!
//! async fn example() -> Result<(), wecom_admin::error::WeComError> {
//!     let config = Config::from_env()?;
//!     let client = WeComClient::connect(&config).await?;
//!
//!     let reply = client.create_department(&NewDepartment::new("Engineering")).await?;
//!     if !reply.success {
//!         eprintln!("rejected: {:?}", reply.errmsg());
//!     }
//!
//!     let departments: DepartmentList = client.list_departments().await?.decode()?;
//!     for department in departments.department {
//!         println!("#{} {}", department.id, department.name);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod tools;
pub mod wecom_client;
