//! Department models for the WeCom API.
//!
//! Departments form a tree rooted at [`ROOT_DEPARTMENT_ID`].

use serde::{Deserialize, Serialize};

use super::common::{check_length, check_optional_length, MAX_FIELD_CHARS};
use crate::error::WeComError;

/// Id of the root department.
pub const ROOT_DEPARTMENT_ID: u64 = 1;

/// A department as returned by `/department/list`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Department {
    /// Department id.
    pub id: u64,

    /// Department name.
    #[serde(default)]
    pub name: String,

    /// Parent department id (0 for the root).
    #[serde(default, rename = "parentid")]
    pub parent_id: u64,

    /// Position among siblings; larger sorts later.
    #[serde(default)]
    pub order: Option<u64>,
}

/// Typed view of a `/department/list` reply.
#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentList {
    /// All departments visible to the caller.
    #[serde(default)]
    pub department: Vec<Department>,
}

/// Body of `/department/create`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewDepartment {
    /// Department name, 1-64 characters.
    pub name: String,

    /// Parent department id.
    #[serde(rename = "parentid")]
    pub parent_id: u64,

    /// Position among siblings, starting at 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u64>,
}

impl NewDepartment {
    /// Creates a department directly under the root.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_id: ROOT_DEPARTMENT_ID,
            order: None,
        }
    }

    /// Sets the parent department.
    pub fn with_parent(mut self, parent_id: u64) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Sets the sibling order.
    pub fn with_order(mut self, order: u64) -> Self {
        self.order = Some(order);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), WeComError> {
        check_length("department name", &self.name, 1, MAX_FIELD_CHARS)
    }
}

/// Body of `/department/update`: only present fields are sent.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DepartmentUpdate {
    /// Department to update.
    pub id: u64,

    /// New name, 1-64 characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// New parent department.
    #[serde(rename = "parentid", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,

    /// New sibling order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u64>,
}

impl DepartmentUpdate {
    /// Starts an update for the given department.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Renames the department.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Moves the department.
    pub fn with_parent(mut self, parent_id: u64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Changes the sibling order.
    pub fn with_order(mut self, order: u64) -> Self {
        self.order = Some(order);
        self
    }

    /// Returns true if at least one field besides the id is set.
    pub fn has_updates(&self) -> bool {
        self.name.is_some() || self.parent_id.is_some() || self.order.is_some()
    }

    pub(crate) fn validate(&self) -> Result<(), WeComError> {
        if !self.has_updates() {
            return Err(WeComError::validation(
                "department update needs at least one of name, parentid, order",
            ));
        }
        check_optional_length("department name", self.name.as_deref(), 1, MAX_FIELD_CHARS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_department_defaults_to_root() {
        let body = serde_json::to_value(NewDepartment::new("Engineering")).unwrap();
        assert_eq!(body, json!({"name": "Engineering", "parentid": 1}));
    }

    #[test]
    fn test_new_department_with_order() {
        let body =
            serde_json::to_value(NewDepartment::new("Ops").with_parent(7).with_order(3)).unwrap();
        assert_eq!(body, json!({"name": "Ops", "parentid": 7, "order": 3}));
    }

    #[test]
    fn test_new_department_rejects_empty_name() {
        assert!(NewDepartment::new("").validate().is_err());
        assert!(NewDepartment::new("x".repeat(65)).validate().is_err());
    }

    #[test]
    fn test_update_sends_only_present_fields() {
        let body = serde_json::to_value(DepartmentUpdate::new(5).with_order(2)).unwrap();
        assert_eq!(body, json!({"id": 5, "order": 2}));
    }

    #[test]
    fn test_update_requires_a_field() {
        let err = DepartmentUpdate::new(5).validate().unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn test_department_list_decode() {
        let list: DepartmentList = serde_json::from_value(json!({
            "errcode": 0,
            "errmsg": "ok",
            "department": [
                {"id": 1, "name": "Corp", "parentid": 0, "order": 1},
                {"id": 2, "name": "R&D", "parentid": 1}
            ]
        }))
        .unwrap();
        assert_eq!(list.department.len(), 2);
        assert_eq!(list.department[1].parent_id, 1);
        assert_eq!(list.department[1].order, None);
    }
}
