//! Tool input parameter structs for MCP tools.
//!
//! This module defines the input types for each MCP tool, with
//! JSON Schema derivation for MCP tool discovery.
//!
//! # Input Sanitization
//!
//! All input structs implement `sanitize()` which trims whitespace
//! from string fields. This should be called before processing input.

use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;

use crate::models::{MemberQuery, MemberStatus, Message, NewDepartment, NewUser, Recipients};

/// Helper function to trim an optional string.
fn trim_option(s: &Option<String>) -> Option<String> {
    s.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Helper function to trim a list of ids, dropping blanks.
fn trim_list(list: &Option<Vec<String>>) -> Option<Vec<String>> {
    list.as_ref().map(|items| {
        items
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

/// Input parameters for the create_department tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateDepartmentInput {
    /// Department name (1-64 characters).
    pub name: String,

    /// Parent department ID. Default: 1 (the root department).
    #[serde(default)]
    pub parent_id: Option<u64>,

    /// Position among sibling departments, starting at 1.
    #[serde(default)]
    pub order: Option<u64>,
}

impl CreateDepartmentInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            parent_id: self.parent_id,
            order: self.order,
        }
    }

    /// Converts the input into a department builder.
    pub fn to_department(&self) -> NewDepartment {
        let mut department = NewDepartment::new(self.name.clone());
        if let Some(parent_id) = self.parent_id {
            department = department.with_parent(parent_id);
        }
        if let Some(order) = self.order {
            department = department.with_order(order);
        }
        department
    }
}

/// Input parameters for the delete_department tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DepartmentIdInput {
    /// The department ID.
    pub department_id: u64,
}

/// Input parameters for tools that take a single user.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UserIdInput {
    /// The member's UserID.
    pub userid: String,
}

impl UserIdInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            userid: self.userid.trim().to_string(),
        }
    }
}

/// Input parameters for the list_department_users tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListDepartmentUsersInput {
    /// The department ID to list.
    pub department_id: u64,

    /// If true, include members of child departments. Default: false.
    #[serde(default)]
    pub fetch_child: Option<bool>,

    /// Status filter: 0 all, 1 followed, 2 disabled, 4 not followed. Values can be added together.
    #[serde(default)]
    pub status: Option<u8>,
}

impl ListDepartmentUsersInput {
    /// Converts the input into a member query.
    pub fn to_query(&self) -> MemberQuery {
        let mut query = MemberQuery::new(self.department_id);
        if self.fetch_child.unwrap_or(false) {
            query = query.recursive();
        }
        if let Some(status) = self.status {
            query = query.with_status(MemberStatus::from_bits(status));
        }
        query
    }
}

/// Input parameters for the create_user tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateUserInput {
    /// Unique UserID (1-64 characters).
    pub userid: String,

    /// Display name (1-64 characters).
    pub name: String,

    /// Department IDs the member belongs to.
    pub department: Vec<u64>,

    /// Job title.
    #[serde(default)]
    pub position: Option<String>,

    /// Mobile number. At least one of mobile, email or weixinid is required.
    #[serde(default)]
    pub mobile: Option<String>,

    /// Email address.
    #[serde(default)]
    pub email: Option<String>,

    /// Personal WeChat ID.
    #[serde(default)]
    pub weixinid: Option<String>,
}

impl CreateUserInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            userid: self.userid.trim().to_string(),
            name: self.name.trim().to_string(),
            department: self.department,
            position: trim_option(&self.position),
            mobile: trim_option(&self.mobile),
            email: trim_option(&self.email),
            weixinid: trim_option(&self.weixinid),
        }
    }

    /// Converts the input into a user builder.
    pub fn to_user(&self) -> NewUser {
        NewUser {
            userid: self.userid.clone(),
            name: self.name.clone(),
            department: self.department.clone(),
            position: self.position.clone(),
            mobile: self.mobile.clone(),
            email: self.email.clone(),
            weixinid: self.weixinid.clone(),
            extattr: None,
        }
    }
}

/// Input parameters for the create_tag tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateTagInput {
    /// Tag name (1-64 characters, unique).
    pub tagname: String,
}

impl CreateTagInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            tagname: self.tagname.trim().to_string(),
        }
    }
}

/// Input parameters for tools that take a single tag.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TagIdInput {
    /// The tag ID.
    pub tagid: u64,
}

/// Input parameters for the send_text_message tool.
///
/// With no users the message goes to everyone the app can see.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SendTextMessageInput {
    /// Message text.
    pub content: String,

    /// Recipient UserIDs. Omit to send to everyone (@all).
    #[serde(default)]
    pub users: Option<Vec<String>>,

    /// Recipient department IDs. Ignored when sending to everyone.
    #[serde(default)]
    pub parties: Option<Vec<u64>>,

    /// Recipient tag IDs. Ignored when sending to everyone.
    #[serde(default)]
    pub tags: Option<Vec<u64>>,

    /// If true, send as a confidential message. Default: false.
    #[serde(default)]
    pub safe: Option<bool>,
}

impl SendTextMessageInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            content: self.content.trim().to_string(),
            users: trim_list(&self.users),
            parties: self.parties,
            tags: self.tags,
            safe: self.safe,
        }
    }

    /// Converts the input into a message.
    pub fn to_message(&self) -> Message {
        let recipients = Recipients {
            users: self.users.clone(),
            parties: self.parties.clone(),
            tags: self.tags.clone(),
        };
        let message = Message::text(self.content.clone()).to(recipients);
        if self.safe.unwrap_or(false) {
            message.safe()
        } else {
            message
        }
    }
}
