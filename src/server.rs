//! MCP server implementation for the WeCom admin client.
//!
//! This module defines the `WeComServer` struct that implements the MCP
//! `ServerHandler` trait, exposing WeCom directory and messaging operations
//! as tools.

use std::collections::{BTreeMap, HashSet};

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};

use crate::error::WeComError;
use crate::models::{
    ApiReply, Department, DepartmentList, SimpleUser, SimpleUserList, Tag, TagList,
    TagMembersReply, UserDetail,
};
use crate::tools::{
    CreateDepartmentInput, CreateTagInput, CreateUserInput, DepartmentIdInput,
    ListDepartmentUsersInput, SendTextMessageInput, TagIdInput, UserIdInput,
};
use crate::wecom_client::WeComClient;

/// The WeCom admin MCP server.
#[derive(Clone)]
pub struct WeComServer {
    /// WeCom client for API operations.
    client: WeComClient,
    /// Tool router for MCP tool dispatch.
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl WeComServer {
    /// Creates a new server instance.
    pub fn new(client: WeComClient) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    /// Returns "pong" on success.
    #[tool(description = "Test connectivity to the WeCom admin MCP server. Returns 'pong' if the server is running correctly.")]
    fn ping(&self) -> String {
        tracing::debug!("ping tool called");
        "pong".to_string()
    }

    // ========================================================================
    // Departments
    // ========================================================================

    #[tool(description = "List all departments visible to the app as a tree, with IDs, names and parent IDs.")]
    async fn list_departments(&self) -> Result<String, String> {
        tracing::debug!("list_departments tool called");

        let reply = self
            .outcome("list departments", self.client.list_departments().await)?;
        let list: DepartmentList = reply.decode().map_err(|e| self.sanitize_error(&e))?;

        Ok(format_department_list(&list.department))
    }

    #[tool(description = "Create a department. Name is required; parent defaults to the root department (ID 1). Returns the new department ID.")]
    async fn create_department(
        &self,
        Parameters(input): Parameters<CreateDepartmentInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(name = %input.name, "create_department tool called");

        let department = input.to_department();
        let reply = self.outcome(
            "create department",
            self.client.create_department(&department).await,
        )?;

        Ok(format!(
            "Created department '{}' with ID {} under parent {}.",
            department.name,
            reply.payload.get("id").map_or_else(|| "?".to_string(), |id| id.to_string()),
            department.parent_id
        ))
    }

    #[tool(description = "Delete a department by ID. The root department and departments with members or sub-departments cannot be deleted.")]
    async fn delete_department(
        &self,
        Parameters(input): Parameters<DepartmentIdInput>,
    ) -> Result<String, String> {
        tracing::debug!(department_id = input.department_id, "delete_department tool called");

        self.outcome(
            &format!("delete department {}", input.department_id),
            self.client.delete_department(input.department_id).await,
        )?;

        Ok(format!("Deleted department {}.", input.department_id))
    }

    // ========================================================================
    // Users
    // ========================================================================

    #[tool(description = "Get a member's details (name, departments, position, contact, status) by UserID.")]
    async fn get_user(&self, Parameters(input): Parameters<UserIdInput>) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(userid = %input.userid, "get_user tool called");

        let reply = self.outcome(
            &format!("get user {}", input.userid),
            self.client.get_user(&input.userid).await,
        )?;
        let user: UserDetail = reply.decode().map_err(|e| self.sanitize_error(&e))?;

        Ok(format_user_detail(&user))
    }

    #[tool(description = "List members of a department. Optionally include sub-departments and filter by status (0 all, 1 followed, 2 disabled, 4 not followed).")]
    async fn list_department_users(
        &self,
        Parameters(input): Parameters<ListDepartmentUsersInput>,
    ) -> Result<String, String> {
        tracing::debug!(?input, "list_department_users tool called");

        let reply = self.outcome(
            &format!("list members of department {}", input.department_id),
            self.client.list_department_users(input.to_query()).await,
        )?;
        let list: SimpleUserList = reply.decode().map_err(|e| self.sanitize_error(&e))?;

        Ok(format_simple_user_list(&list.userlist))
    }

    #[tool(description = "Create a member. UserID, name and at least one department are required, plus at least one of mobile, email or weixinid.")]
    async fn create_user(
        &self,
        Parameters(input): Parameters<CreateUserInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(userid = %input.userid, "create_user tool called");

        self.outcome(
            &format!("create user {}", input.userid),
            self.client.create_user(&input.to_user()).await,
        )?;

        Ok(format!("Created member {} ({}).", input.userid, input.name))
    }

    #[tool(description = "Delete a member by UserID.")]
    async fn delete_user(
        &self,
        Parameters(input): Parameters<UserIdInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(userid = %input.userid, "delete_user tool called");

        self.outcome(
            &format!("delete user {}", input.userid),
            self.client.delete_user(&input.userid).await,
        )?;

        Ok(format!("Deleted member {}.", input.userid))
    }

    // ========================================================================
    // Tags
    // ========================================================================

    #[tool(description = "List all tags with their IDs.")]
    async fn list_tags(&self) -> Result<String, String> {
        tracing::debug!("list_tags tool called");

        let reply = self.outcome("list tags", self.client.list_tags().await)?;
        let list: TagList = reply.decode().map_err(|e| self.sanitize_error(&e))?;

        Ok(format_tag_list(&list.taglist))
    }

    #[tool(description = "Create a tag. Tag names are 1-64 characters and must be unique. Returns the new tag ID.")]
    async fn create_tag(
        &self,
        Parameters(input): Parameters<CreateTagInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(tagname = %input.tagname, "create_tag tool called");

        let reply = self.outcome(
            &format!("create tag '{}'", input.tagname),
            self.client.create_tag(&input.tagname).await,
        )?;

        Ok(format!(
            "Created tag '{}' with ID {}.",
            input.tagname,
            reply.payload.get("tagid").map_or_else(|| "?".to_string(), |id| id.to_string())
        ))
    }

    #[tool(description = "List the members and departments carrying a tag.")]
    async fn get_tag_members(
        &self,
        Parameters(input): Parameters<TagIdInput>,
    ) -> Result<String, String> {
        tracing::debug!(tagid = input.tagid, "get_tag_members tool called");

        let reply = self.outcome(
            &format!("get members of tag {}", input.tagid),
            self.client.get_tag_members(input.tagid).await,
        )?;
        let members: TagMembersReply = reply.decode().map_err(|e| self.sanitize_error(&e))?;

        Ok(format_tag_members(input.tagid, &members))
    }

    // ========================================================================
    // Messages
    // ========================================================================

    #[tool(description = "Send a text message through the app. Omit users to send to everyone (@all); department and tag lists are ignored in that case.")]
    async fn send_text_message(
        &self,
        Parameters(input): Parameters<SendTextMessageInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(users = ?input.users, "send_text_message tool called");

        let message = input.to_message();
        let reply = self.outcome(
            "send message",
            self.client.send_message(&message).await,
        )?;

        Ok(format_send_result(&message.recipients.touser(), &reply))
    }

    /// Turns a client result into a tool result, logging failures.
    fn outcome(
        &self,
        action: &str,
        result: Result<ApiReply, WeComError>,
    ) -> Result<ApiReply, String> {
        match result {
            Ok(reply) if reply.success => Ok(reply),
            Ok(reply) => {
                tracing::warn!(
                    action = %action,
                    errcode = reply.errcode().unwrap_or(-1),
                    "WeCom rejected the request"
                );
                Err(format_rejection(action, &reply))
            }
            Err(e) => {
                let sanitized = self.sanitize_error(&e);
                tracing::error!(error = %sanitized, action = %action, "WeCom call failed");
                Err(format!("Failed to {}: {}", action, sanitized))
            }
        }
    }

    /// Sanitizes an error message to remove the access token.
    fn sanitize_error(&self, error: &WeComError) -> String {
        error.sanitized_display(&[self.client.token_for_sanitization()])
    }
}

#[tool_handler]
impl ServerHandler for WeComServer {
    /// Returns server information for the MCP initialize handshake.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "WeCom admin provides access to a WeCom (WeChat Work) corp directory. \
                 Use list_departments and list_department_users to browse the org, \
                 get_user for member details, and list_tags / get_tag_members for tags. \
                 Create and delete with create_department, delete_department, create_user, \
                 delete_user and create_tag. Send notifications with send_text_message. \
                 Start with 'ping' to verify connectivity."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Formats a remote rejection as human-readable text.
fn format_rejection(action: &str, reply: &ApiReply) -> String {
    format!(
        "Failed to {}: WeCom errcode {} ({})",
        action,
        reply
            .errcode()
            .map_or_else(|| "missing".to_string(), |code| code.to_string()),
        reply.errmsg().unwrap_or("no message")
    )
}

/// Formats departments as an indented tree.
fn format_department_list(departments: &[Department]) -> String {
    if departments.is_empty() {
        return "No departments visible to this app.".to_string();
    }

    let ids: HashSet<u64> = departments.iter().map(|d| d.id).collect();
    let mut children: BTreeMap<u64, Vec<&Department>> = BTreeMap::new();
    let mut roots = Vec::new();
    for department in departments {
        if ids.contains(&department.parent_id) && department.parent_id != department.id {
            children
                .entry(department.parent_id)
                .or_default()
                .push(department);
        } else {
            roots.push(department);
        }
    }
    for siblings in children.values_mut() {
        siblings.sort_by_key(|d| (d.order.unwrap_or(u64::MAX), d.id));
    }
    roots.sort_by_key(|d| (d.order.unwrap_or(u64::MAX), d.id));

    fn render(
        output: &mut String,
        department: &Department,
        children: &BTreeMap<u64, Vec<&Department>>,
        depth: usize,
    ) {
        output.push_str(&format!(
            "{}#{} {}\n",
            "  ".repeat(depth),
            department.id,
            department.name
        ));
        if let Some(kids) = children.get(&department.id) {
            for kid in kids {
                render(output, kid, children, depth + 1);
            }
        }
    }

    let mut output = format!("Found {} department(s):\n\n", departments.len());
    for root in roots {
        render(&mut output, root, &children, 0);
    }
    output
}

/// Formats a member listing.
fn format_simple_user_list(users: &[SimpleUser]) -> String {
    if users.is_empty() {
        return "No members found matching the criteria.".to_string();
    }

    let mut output = format!("Found {} member(s):\n\n", users.len());
    for user in users {
        output.push_str(&format!("{} - {}", user.userid, user.name));
        if !user.department.is_empty() {
            output.push_str(&format!(" (departments: {})", join_ids(&user.department)));
        }
        output.push('\n');
    }
    output
}

/// Formats a member's details.
fn format_user_detail(user: &UserDetail) -> String {
    let mut output = format!("Member {} - {}\n", user.userid, user.name);
    output.push_str(&format!("Departments: {}\n", join_ids(&user.department)));
    if let Some(position) = user.position.as_deref().filter(|p| !p.is_empty()) {
        output.push_str(&format!("Position: {}\n", position));
    }
    if let Some(mobile) = user.mobile.as_deref().filter(|m| !m.is_empty()) {
        output.push_str(&format!("Mobile: {}\n", mobile));
    }
    if let Some(email) = user.email.as_deref().filter(|e| !e.is_empty()) {
        output.push_str(&format!("Email: {}\n", email));
    }
    output.push_str(&format!("Status: {}\n", user.display_status()));
    if user.enable == Some(0) {
        output.push_str("Account: disabled\n");
    }
    if let Some(extattr) = &user.extattr {
        for attr in &extattr.attrs {
            output.push_str(&format!("{}: {}\n", attr.name, attr.value));
        }
    }
    output
}

/// Formats the tag list.
fn format_tag_list(tags: &[Tag]) -> String {
    if tags.is_empty() {
        return "No tags defined.".to_string();
    }

    let mut output = format!("Found {} tag(s):\n\n", tags.len());
    for tag in tags {
        output.push_str(&format!("#{} {}\n", tag.tagid, tag.tagname));
    }
    output
}

/// Formats the members of one tag.
fn format_tag_members(tagid: u64, members: &TagMembersReply) -> String {
    if members.userlist.is_empty() && members.partylist.is_empty() {
        return format!("Tag {} has no members.", tagid);
    }

    let mut output = format!("Tag {}:\n", tagid);
    if !members.userlist.is_empty() {
        output.push_str(&format!("\nMembers ({}):\n", members.userlist.len()));
        for user in &members.userlist {
            output.push_str(&format!("  {} - {}\n", user.userid, user.name));
        }
    }
    if !members.partylist.is_empty() {
        output.push_str(&format!("\nDepartments: {}\n", join_ids(&members.partylist)));
    }
    output
}

/// Formats a message send result, including recipients WeCom could not reach.
fn format_send_result(touser: &str, reply: &ApiReply) -> String {
    let mut output = format!("Message sent to {}.", touser);
    for (field, label) in [
        ("invaliduser", "Invalid users"),
        ("invalidparty", "Invalid departments"),
        ("invalidtag", "Invalid tags"),
    ] {
        if let Some(value) = reply
            .payload
            .get(field)
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
        {
            output.push_str(&format!("\n{}: {}", label, value));
        }
    }
    output
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{interpret_response, ExtAttr};
    use serde_json::json;

    fn test_client() -> WeComClient {
        let config = Config::new("corp", "secret")
            .with_base_url("https://test.example.com/cgi-bin")
            .expect("valid base url");
        WeComClient::with_access_token(&config, "TOKEN").expect("Failed to create test client")
    }

    fn department(id: u64, name: &str, parent_id: u64, order: Option<u64>) -> Department {
        Department {
            id,
            name: name.to_string(),
            parent_id,
            order,
        }
    }

    #[test]
    fn test_server_creation() {
        let server = WeComServer::new(test_client());
        let info = server.get_info();
        assert!(info.instructions.is_some());
    }

    #[test]
    fn test_server_info_has_tools_capability() {
        let server = WeComServer::new(test_client());
        let info = server.get_info();
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_ping_tool_returns_pong() {
        let server = WeComServer::new(test_client());
        assert_eq!(server.ping(), "pong");
    }

    #[test]
    fn test_outcome_rejection_text() {
        let server = WeComServer::new(test_client());
        let reply = interpret_response(json!({"errcode": 60003, "errmsg": "department not found"}));
        let err = server.outcome("delete department 9", Ok(reply)).unwrap_err();
        assert_eq!(
            err,
            "Failed to delete department 9: WeCom errcode 60003 (department not found)"
        );
    }

    #[test]
    fn test_outcome_error_is_sanitized() {
        let server = WeComServer::new(test_client());
        let err = server
            .outcome(
                "list tags",
                Err(WeComError::validation("bad token TOKEN")),
            )
            .unwrap_err();
        assert!(!err.contains("TOKEN"));
        assert!(err.contains("[REDACTED]"));
    }

    #[test]
    fn test_format_department_list_empty() {
        assert_eq!(
            format_department_list(&[]),
            "No departments visible to this app."
        );
    }

    #[test]
    fn test_format_department_list_tree() {
        let departments = vec![
            department(3, "Backend", 2, Some(2)),
            department(1, "Corp", 0, Some(1)),
            department(4, "Frontend", 2, Some(1)),
            department(2, "R&D", 1, None),
        ];
        let result = format_department_list(&departments);
        assert_eq!(
            result,
            "Found 4 department(s):\n\n#1 Corp\n  #2 R&D\n    #4 Frontend\n    #3 Backend\n"
        );
    }

    #[test]
    fn test_format_simple_user_list() {
        let users = vec![SimpleUser {
            userid: "zhangsan".to_string(),
            name: "Zhang San".to_string(),
            department: vec![1, 2],
        }];
        let result = format_simple_user_list(&users);
        assert!(result.contains("Found 1 member(s)"));
        assert!(result.contains("zhangsan - Zhang San (departments: 1, 2)"));
        assert_eq!(
            format_simple_user_list(&[]),
            "No members found matching the criteria."
        );
    }

    #[test]
    fn test_format_user_detail() {
        let user = UserDetail {
            userid: "lisi".to_string(),
            name: "Li Si".to_string(),
            department: vec![2],
            position: Some("Engineer".to_string()),
            mobile: None,
            email: Some("li@example.com".to_string()),
            weixinid: None,
            status: Some(2),
            enable: Some(0),
            extattr: Some(ExtAttr::default().with("floor", "3")),
        };
        let result = format_user_detail(&user);
        assert!(result.starts_with("Member lisi - Li Si\n"));
        assert!(result.contains("Position: Engineer"));
        assert!(result.contains("Email: li@example.com"));
        assert!(result.contains("Status: disabled"));
        assert!(result.contains("Account: disabled"));
        assert!(result.contains("floor: 3"));
        assert!(!result.contains("Mobile"));
    }

    #[test]
    fn test_format_tag_list() {
        let tags = vec![Tag {
            tagid: 7,
            tagname: "oncall".to_string(),
        }];
        assert_eq!(format_tag_list(&tags), "Found 1 tag(s):\n\n#7 oncall\n");
        assert_eq!(format_tag_list(&[]), "No tags defined.");
    }

    #[test]
    fn test_format_tag_members() {
        let members = TagMembersReply {
            userlist: vec![SimpleUser {
                userid: "zhangsan".to_string(),
                name: "Zhang San".to_string(),
                department: vec![],
            }],
            partylist: vec![2, 5],
        };
        let result = format_tag_members(7, &members);
        assert!(result.contains("Members (1)"));
        assert!(result.contains("zhangsan - Zhang San"));
        assert!(result.contains("Departments: 2, 5"));

        let empty = TagMembersReply {
            userlist: vec![],
            partylist: vec![],
        };
        assert_eq!(format_tag_members(7, &empty), "Tag 7 has no members.");
    }

    #[test]
    fn test_format_send_result_lists_invalid_recipients() {
        let reply = interpret_response(json!({
            "errcode": 0,
            "errmsg": "ok",
            "invaliduser": "ghost",
            "invalidparty": ""
        }));
        let result = format_send_result("ghost|zhangsan", &reply);
        assert_eq!(result, "Message sent to ghost|zhangsan.\nInvalid users: ghost");
    }
}
