//! Tag models for the WeCom API.

use serde::{Deserialize, Serialize};

use super::common::{check_length, MAX_FIELD_CHARS};
use super::user::SimpleUser;
use crate::error::WeComError;

/// A tag as returned by `/tag/list`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Tag {
    /// Tag id.
    pub tagid: u64,
    /// Tag name.
    #[serde(default)]
    pub tagname: String,
}

/// Typed view of a `/tag/list` reply.
#[derive(Debug, Clone, Deserialize)]
pub struct TagList {
    /// All tags.
    #[serde(default)]
    pub taglist: Vec<Tag>,
}

/// Typed view of a `/tag/get` reply.
#[derive(Debug, Clone, Deserialize)]
pub struct TagMembersReply {
    /// Users carrying the tag.
    #[serde(default)]
    pub userlist: Vec<SimpleUser>,
    /// Departments carrying the tag.
    #[serde(default)]
    pub partylist: Vec<u64>,
}

/// Users and departments to attach to or detach from a tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagMembers {
    /// User ids.
    pub userlist: Vec<String>,
    /// Department ids.
    pub partylist: Vec<u64>,
}

impl TagMembers {
    /// Members given as users only.
    pub fn users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            userlist: users.into_iter().map(Into::into).collect(),
            partylist: Vec::new(),
        }
    }

    /// Adds departments.
    pub fn with_parties(mut self, parties: impl IntoIterator<Item = u64>) -> Self {
        self.partylist.extend(parties);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), WeComError> {
        if self.userlist.is_empty() && self.partylist.is_empty() {
            return Err(WeComError::validation(
                "userlist and partylist cannot both be empty",
            ));
        }
        Ok(())
    }

    pub(crate) fn to_body(&self, tagid: u64) -> TagMembersBody<'_> {
        TagMembersBody {
            tagid,
            userlist: &self.userlist,
            partylist: &self.partylist,
        }
    }
}

/// Wire body of `/tag/addtagusers` and `/tag/deltagusers`.
#[derive(Debug, Serialize)]
pub(crate) struct TagMembersBody<'a> {
    tagid: u64,
    userlist: &'a [String],
    partylist: &'a [u64],
}

/// Body of `/tag/create` and `/tag/update`.
#[derive(Debug, Serialize)]
pub(crate) struct TagBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagid: Option<u64>,
    pub tagname: &'a str,
}

pub(crate) fn validate_tag_name(tagname: &str) -> Result<(), WeComError> {
    check_length("tagname", tagname, 1, MAX_FIELD_CHARS)
}
