//! User (member) models for the WeCom API.
//!
//! Uniqueness of `userid`, `mobile`, `email` and `weixinid` is enforced by
//! WeCom; the builders here only check presence and length.

use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use super::common::{
    check_length, check_optional_length, check_userid, serialize_optional_flag, MAX_FIELD_CHARS,
};
use crate::error::WeComError;

/// Extended attributes, configured in the admin console before use.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtAttr {
    /// Attribute name/value pairs.
    #[serde(default)]
    pub attrs: Vec<ExtAttrItem>,
}

/// A single extended attribute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtAttrItem {
    /// Attribute name as configured in the console.
    pub name: String,
    /// Attribute value.
    #[serde(default)]
    pub value: String,
}

impl ExtAttr {
    /// Adds an attribute.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push(ExtAttrItem {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// Body of `/user/create`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct NewUser {
    /// Unique user id, 1-64 characters.
    pub userid: String,

    /// Display name, 1-64 characters.
    pub name: String,

    /// Departments the user belongs to.
    pub department: Vec<u64>,

    /// Job title, up to 64 characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,

    /// Mobile number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,

    /// Email address, up to 64 characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Personal WeChat id (not the nickname).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weixinid: Option<String>,

    /// Extended attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extattr: Option<ExtAttr>,
}

impl NewUser {
    /// Creates a user in the given departments.
    pub fn new(userid: impl Into<String>, name: impl Into<String>, department: Vec<u64>) -> Self {
        Self {
            userid: userid.into(),
            name: name.into(),
            department,
            ..Default::default()
        }
    }

    /// Sets the job title.
    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    /// Sets the mobile number.
    pub fn with_mobile(mut self, mobile: impl Into<String>) -> Self {
        self.mobile = Some(mobile.into());
        self
    }

    /// Sets the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the personal WeChat id.
    pub fn with_weixinid(mut self, weixinid: impl Into<String>) -> Self {
        self.weixinid = Some(weixinid.into());
        self
    }

    /// Sets extended attributes.
    pub fn with_extattr(mut self, extattr: ExtAttr) -> Self {
        self.extattr = Some(extattr);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), WeComError> {
        check_userid(&self.userid)?;
        check_length("name", &self.name, 1, MAX_FIELD_CHARS)?;
        if self.department.is_empty() {
            return Err(WeComError::validation(
                "department must list at least one department id",
            ));
        }
        check_optional_length("position", self.position.as_deref(), 0, MAX_FIELD_CHARS)?;
        check_optional_length("email", self.email.as_deref(), 0, MAX_FIELD_CHARS)?;

        let has_contact = [&self.mobile, &self.email, &self.weixinid]
            .iter()
            .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()));
        if !has_contact {
            return Err(WeComError::validation(
                "mobile, email and weixinid cannot all be empty",
            ));
        }
        Ok(())
    }
}

/// Body of `/user/update`: only present fields are sent.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UserUpdate {
    /// User to update.
    pub userid: String,

    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Replacement department list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<Vec<u64>>,

    /// New job title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,

    /// New mobile number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,

    /// New email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// New personal WeChat id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weixinid: Option<String>,

    /// Enable (`true`) or disable (`false`) the member.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_flag"
    )]
    pub enable: Option<bool>,

    /// Replacement extended attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extattr: Option<ExtAttr>,
}

impl UserUpdate {
    /// Starts an update for the given user.
    pub fn new(userid: impl Into<String>) -> Self {
        Self {
            userid: userid.into(),
            ..Default::default()
        }
    }

    /// Renames the user.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replaces the department list.
    pub fn with_department(mut self, department: Vec<u64>) -> Self {
        self.department = Some(department);
        self
    }

    /// Changes the job title.
    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    /// Changes the mobile number.
    pub fn with_mobile(mut self, mobile: impl Into<String>) -> Self {
        self.mobile = Some(mobile.into());
        self
    }

    /// Changes the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Changes the personal WeChat id.
    pub fn with_weixinid(mut self, weixinid: impl Into<String>) -> Self {
        self.weixinid = Some(weixinid.into());
        self
    }

    /// Enables or disables the member.
    pub fn with_enable(mut self, enable: bool) -> Self {
        self.enable = Some(enable);
        self
    }

    /// Replaces extended attributes.
    pub fn with_extattr(mut self, extattr: ExtAttr) -> Self {
        self.extattr = Some(extattr);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), WeComError> {
        check_userid(&self.userid)?;
        check_optional_length("name", self.name.as_deref(), 0, MAX_FIELD_CHARS)?;
        check_optional_length("position", self.position.as_deref(), 0, MAX_FIELD_CHARS)?;
        check_optional_length("email", self.email.as_deref(), 0, MAX_FIELD_CHARS)
    }
}

/// Member status filter for department listings.
///
/// Values combine with `|`, e.g. `MemberStatus::FOLLOWED | MemberStatus::DISABLED`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberStatus(u8);

impl MemberStatus {
    /// Every member.
    pub const ALL: MemberStatus = MemberStatus(0);
    /// Members following the corp account.
    pub const FOLLOWED: MemberStatus = MemberStatus(1);
    /// Disabled members.
    pub const DISABLED: MemberStatus = MemberStatus(2);
    /// Members not yet following.
    pub const UNFOLLOWED: MemberStatus = MemberStatus(4);

    /// Builds a filter from a raw value; unknown bits are dropped.
    pub fn from_bits(bits: u8) -> Self {
        MemberStatus(bits & 0b111)
    }

    /// The raw value sent as `status`.
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for MemberStatus {
    type Output = MemberStatus;

    fn bitor(self, rhs: Self) -> Self::Output {
        MemberStatus(self.0 | rhs.0)
    }
}

/// Query for `/user/simplelist` and `/user/list`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberQuery {
    /// Department to list.
    pub department_id: u64,
    /// Recurse into child departments.
    pub fetch_child: bool,
    /// Status filter.
    pub status: MemberStatus,
}

impl MemberQuery {
    /// Lists direct members of a department, any status.
    pub fn new(department_id: u64) -> Self {
        Self {
            department_id,
            fetch_child: false,
            status: MemberStatus::ALL,
        }
    }

    /// Includes members of child departments.
    pub fn recursive(mut self) -> Self {
        self.fetch_child = true;
        self
    }

    /// Filters by member status.
    pub fn with_status(mut self, status: MemberStatus) -> Self {
        self.status = status;
        self
    }

    pub(crate) fn to_query(self) -> Vec<(&'static str, String)> {
        vec![
            ("department_id", self.department_id.to_string()),
            ("fetch_child", u8::from(self.fetch_child).to_string()),
            ("status", self.status.bits().to_string()),
        ]
    }
}

/// A member entry from `/user/simplelist`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SimpleUser {
    /// User id.
    pub userid: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Department ids.
    #[serde(default)]
    pub department: Vec<u64>,
}

/// Typed view of a `/user/simplelist` reply.
#[derive(Debug, Clone, Deserialize)]
pub struct SimpleUserList {
    /// Members.
    #[serde(default)]
    pub userlist: Vec<SimpleUser>,
}

/// A member as returned by `/user/get` and `/user/list`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UserDetail {
    /// User id.
    pub userid: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Department ids.
    #[serde(default)]
    pub department: Vec<u64>,
    /// Job title.
    #[serde(default)]
    pub position: Option<String>,
    /// Mobile number.
    #[serde(default)]
    pub mobile: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Personal WeChat id.
    #[serde(default)]
    pub weixinid: Option<String>,
    /// 1 followed, 2 disabled, 4 not followed.
    #[serde(default)]
    pub status: Option<u8>,
    /// 1 enabled, 0 disabled.
    #[serde(default)]
    pub enable: Option<u8>,
    /// Extended attributes.
    #[serde(default)]
    pub extattr: Option<ExtAttr>,
}

impl UserDetail {
    /// Human-readable follow status.
    pub fn display_status(&self) -> &'static str {
        match self.status {
            Some(1) => "followed",
            Some(2) => "disabled",
            Some(4) => "not followed",
            _ => "unknown",
        }
    }
}

/// Typed view of a `/user/list` reply.
#[derive(Debug, Clone, Deserialize)]
pub struct UserList {
    /// Members with details.
    #[serde(default)]
    pub userlist: Vec<UserDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_user() -> NewUser {
        NewUser::new("zhangsan", "Zhang San", vec![1]).with_mobile("13800000000")
    }

    #[test]
    fn test_new_user_serializes_present_fields() {
        let body = serde_json::to_value(valid_user().with_position("Engineer")).unwrap();
        assert_eq!(
            body,
            json!({
                "userid": "zhangsan",
                "name": "Zhang San",
                "department": [1],
                "position": "Engineer",
                "mobile": "13800000000"
            })
        );
    }

    #[test]
    fn test_new_user_requires_name() {
        let user = NewUser {
            name: String::new(),
            ..valid_user()
        };
        let err = user.validate().unwrap_err();
        assert_eq!(err.to_string(), "validation error: name is required");
    }

    #[test]
    fn test_new_user_requires_userid() {
        let user = NewUser {
            userid: String::new(),
            ..valid_user()
        };
        assert!(user.validate().is_err());
    }

    #[test]
    fn test_new_user_requires_contact() {
        let user = NewUser::new("lisi", "Li Si", vec![1]);
        let err = user.validate().unwrap_err();
        assert!(err.to_string().contains("cannot all be empty"));
    }

    #[test]
    fn test_new_user_requires_department() {
        let user = NewUser::new("lisi", "Li Si", vec![]).with_email("li@example.com");
        assert!(user.validate().is_err());
    }

    #[test]
    fn test_new_user_with_extattr() {
        let body = serde_json::to_value(
            valid_user().with_extattr(ExtAttr::default().with("floor", "3")),
        )
        .unwrap();
        assert_eq!(
            body["extattr"],
            json!({"attrs": [{"name": "floor", "value": "3"}]})
        );
    }

    #[test]
    fn test_user_update_enable_as_integer() {
        let body = serde_json::to_value(UserUpdate::new("zhangsan").with_enable(false)).unwrap();
        assert_eq!(body, json!({"userid": "zhangsan", "enable": 0}));
    }

    #[test]
    fn test_user_update_only_userid() {
        let body = serde_json::to_value(UserUpdate::new("zhangsan")).unwrap();
        assert_eq!(body, json!({"userid": "zhangsan"}));
    }

    #[test]
    fn test_user_update_rejects_long_position() {
        let update = UserUpdate::new("zhangsan").with_position("p".repeat(65));
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_member_status_combines() {
        let status = MemberStatus::FOLLOWED | MemberStatus::UNFOLLOWED;
        assert_eq!(status.bits(), 5);
        assert_eq!(MemberStatus::default(), MemberStatus::ALL);
        assert_eq!(MemberStatus::from_bits(0xFF).bits(), 7);
    }

    #[test]
    fn test_member_query_params() {
        let query = MemberQuery::new(3)
            .recursive()
            .with_status(MemberStatus::DISABLED)
            .to_query();
        assert_eq!(
            query,
            vec![
                ("department_id", "3".to_string()),
                ("fetch_child", "1".to_string()),
                ("status", "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_user_detail_decode() {
        let user: UserDetail = serde_json::from_value(json!({
            "errcode": 0,
            "errmsg": "ok",
            "userid": "zhangsan",
            "name": "Zhang San",
            "department": [1, 2],
            "status": 1,
            "enable": 1
        }))
        .unwrap();
        assert_eq!(user.department, vec![1, 2]);
        assert_eq!(user.display_status(), "followed");
    }
}
