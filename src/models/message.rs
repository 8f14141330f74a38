//! Message composition for `/message/send`.
//!
//! A [`Message`] pairs a type-specific [`MessageContent`] with
//! [`Recipients`] and the `safe` flag; [`Message::to_payload`] merges them
//! with the agent id into the body WeCom expects.

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::common::{check_length, flag};
use crate::error::WeComError;

/// Recipient value meaning "everyone in the agent's visibility scope".
pub const BROADCAST: &str = "@all";

/// Separator WeCom uses between recipients.
const RECIPIENT_SEPARATOR: &str = "|";

/// A link card in a `news` message.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct NewsArticle {
    /// Card title.
    pub title: String,
    /// Card description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Link target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Cover picture URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picurl: Option<String>,
}

impl NewsArticle {
    /// Creates a card with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the link target.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the cover picture URL.
    pub fn with_picurl(mut self, picurl: impl Into<String>) -> Self {
        self.picurl = Some(picurl.into());
        self
    }
}

/// An article hosted by WeCom in an `mpnews` message.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MpNewsArticle {
    /// Article title.
    pub title: String,
    /// Media id of the thumbnail image.
    pub thumb_media_id: String,
    /// Author.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// "Read more" link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_source_url: Option<String>,
    /// HTML body.
    pub content: String,
    /// Summary shown in the card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Show the thumbnail at the top of the body.
    #[serde(serialize_with = "serialize_flag_string")]
    pub show_cover_pic: bool,
}

impl MpNewsArticle {
    /// Creates an article with the required fields.
    pub fn new(
        title: impl Into<String>,
        thumb_media_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            thumb_media_id: thumb_media_id.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    /// Sets the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Sets the "read more" link.
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.content_source_url = Some(url.into());
        self
    }

    /// Sets the summary.
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    /// Shows the thumbnail at the top of the body.
    pub fn with_cover_pic(mut self) -> Self {
        self.show_cover_pic = true;
        self
    }
}

// mpnews carries the cover flag as "0"/"1".
fn serialize_flag_string<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(if *value { "1" } else { "0" })
}

/// Type-specific part of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    /// Plain text.
    Text {
        /// Message text.
        content: String,
    },
    /// Uploaded image.
    Image {
        /// Media id from an upload.
        media_id: String,
    },
    /// Uploaded voice clip.
    Voice {
        /// Media id from an upload.
        media_id: String,
    },
    /// Uploaded video.
    Video {
        /// Media id from an upload.
        media_id: String,
        /// Video title.
        title: Option<String>,
        /// Video description.
        description: Option<String>,
    },
    /// Uploaded file.
    File {
        /// Media id from an upload.
        media_id: String,
    },
    /// Link cards.
    News {
        /// Cards, in display order.
        articles: Vec<NewsArticle>,
    },
    /// WeCom-hosted articles.
    MpNews {
        /// Articles, in display order.
        articles: Vec<MpNewsArticle>,
    },
}

impl MessageContent {
    /// Plain text message.
    pub fn text(content: impl Into<String>) -> Self {
        MessageContent::Text {
            content: content.into(),
        }
    }

    /// Image message.
    pub fn image(media_id: impl Into<String>) -> Self {
        MessageContent::Image {
            media_id: media_id.into(),
        }
    }

    /// Voice message.
    pub fn voice(media_id: impl Into<String>) -> Self {
        MessageContent::Voice {
            media_id: media_id.into(),
        }
    }

    /// Video message without title or description.
    pub fn video(media_id: impl Into<String>) -> Self {
        MessageContent::Video {
            media_id: media_id.into(),
            title: None,
            description: None,
        }
    }

    /// File message.
    pub fn file(media_id: impl Into<String>) -> Self {
        MessageContent::File {
            media_id: media_id.into(),
        }
    }

    /// The `msgtype` value for this content.
    pub fn msgtype(&self) -> &'static str {
        match self {
            MessageContent::Text { .. } => "text",
            MessageContent::Image { .. } => "image",
            MessageContent::Voice { .. } => "voice",
            MessageContent::Video { .. } => "video",
            MessageContent::File { .. } => "file",
            MessageContent::News { .. } => "news",
            MessageContent::MpNews { .. } => "mpnews",
        }
    }

    /// The object stored under the `msgtype` key.
    fn body(&self) -> Result<Value, WeComError> {
        let body = match self {
            MessageContent::Text { content } => json!({ "content": content }),
            MessageContent::Image { media_id }
            | MessageContent::Voice { media_id }
            | MessageContent::File { media_id } => json!({ "media_id": media_id }),
            MessageContent::Video {
                media_id,
                title,
                description,
            } => {
                let mut video = Map::new();
                video.insert("media_id".to_string(), json!(media_id));
                if let Some(title) = title {
                    video.insert("title".to_string(), json!(title));
                }
                if let Some(description) = description {
                    video.insert("description".to_string(), json!(description));
                }
                Value::Object(video)
            }
            MessageContent::News { articles } => {
                json!({ "articles": serde_json::to_value(articles)? })
            }
            MessageContent::MpNews { articles } => {
                json!({ "articles": serde_json::to_value(articles)? })
            }
        };
        Ok(body)
    }

    fn validate(&self) -> Result<(), WeComError> {
        match self {
            MessageContent::Text { content } => {
                if content.trim().is_empty() {
                    return Err(WeComError::validation("text content is required"));
                }
            }
            MessageContent::Image { media_id }
            | MessageContent::Voice { media_id }
            | MessageContent::Video { media_id, .. }
            | MessageContent::File { media_id } => check_length("media_id", media_id, 1, usize::MAX)?,
            MessageContent::News { articles } => {
                if articles.is_empty() {
                    return Err(WeComError::validation("news needs at least one article"));
                }
                for article in articles {
                    check_length("article title", &article.title, 1, usize::MAX)?;
                }
            }
            MessageContent::MpNews { articles } => {
                if articles.is_empty() {
                    return Err(WeComError::validation("mpnews needs at least one article"));
                }
                for article in articles {
                    check_length("article title", &article.title, 1, usize::MAX)?;
                    check_length("thumb_media_id", &article.thumb_media_id, 1, usize::MAX)?;
                    check_length("article content", &article.content, 1, usize::MAX)?;
                }
            }
        }
        Ok(())
    }
}

/// Who receives a message.
///
/// With no user list the message goes to [`BROADCAST`], in which case WeCom
/// ignores any party or tag lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recipients {
    /// User ids (`touser`).
    pub users: Option<Vec<String>>,
    /// Department ids (`toparty`).
    pub parties: Option<Vec<u64>>,
    /// Tag ids (`totag`).
    pub tags: Option<Vec<u64>>,
}

impl Recipients {
    /// Everyone visible to the agent.
    pub fn all() -> Self {
        Self::default()
    }

    /// The given users.
    pub fn users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            users: Some(users.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    /// Adds departments.
    pub fn with_parties(mut self, parties: impl IntoIterator<Item = u64>) -> Self {
        self.parties = Some(parties.into_iter().collect());
        self
    }

    /// Adds tags.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = u64>) -> Self {
        self.tags = Some(tags.into_iter().collect());
        self
    }

    /// The `touser` value.
    pub fn touser(&self) -> String {
        match &self.users {
            None => BROADCAST.to_string(),
            Some(users) => users.join(RECIPIENT_SEPARATOR),
        }
    }

    fn join_ids(ids: &[u64]) -> String {
        ids.iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(RECIPIENT_SEPARATOR)
    }

    fn validate(&self) -> Result<(), WeComError> {
        let users_empty = self.users.as_ref().is_some_and(Vec::is_empty);
        let parties_empty = self.parties.as_ref().is_none_or(Vec::is_empty);
        let tags_empty = self.tags.as_ref().is_none_or(Vec::is_empty);
        if users_empty && parties_empty && tags_empty {
            return Err(WeComError::validation(
                "message has an empty user list and no parties or tags",
            ));
        }
        Ok(())
    }
}

/// A message ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Type-specific content.
    pub content: MessageContent,
    /// Recipients.
    pub recipients: Recipients,
    /// Confidential message (no forwarding, watermark).
    pub safe: bool,
}

impl Message {
    /// A broadcast, non-confidential message.
    pub fn new(content: MessageContent) -> Self {
        Self {
            content,
            recipients: Recipients::all(),
            safe: false,
        }
    }

    /// Plain text broadcast.
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(MessageContent::text(content))
    }

    /// Sets the recipients.
    pub fn to(mut self, recipients: Recipients) -> Self {
        self.recipients = recipients;
        self
    }

    /// Marks the message confidential.
    pub fn safe(mut self) -> Self {
        self.safe = true;
        self
    }

    /// Checks required fields.
    ///
    /// # Errors
    ///
    /// Returns `WeComError::Validation` describing the first missing field.
    pub fn validate(&self) -> Result<(), WeComError> {
        self.content.validate()?;
        self.recipients.validate()
    }

    /// Builds the `/message/send` body for the given agent.
    ///
    /// # Errors
    ///
    /// Returns `WeComError::Serialization` if an article cannot be encoded.
    pub fn to_payload(&self, agent_id: u32) -> Result<Value, WeComError> {
        let msgtype = self.content.msgtype();
        let mut data = Map::new();
        data.insert("touser".to_string(), json!(self.recipients.touser()));
        if let Some(parties) = &self.recipients.parties {
            data.insert(
                "toparty".to_string(),
                json!(Recipients::join_ids(parties)),
            );
        }
        if let Some(tags) = &self.recipients.tags {
            data.insert("totag".to_string(), json!(Recipients::join_ids(tags)));
        }
        data.insert("msgtype".to_string(), json!(msgtype));
        data.insert("agentid".to_string(), json!(agent_id));
        data.insert(msgtype.to_string(), self.content.body()?);
        data.insert("safe".to_string(), json!(flag(self.safe)));
        Ok(Value::Object(data))
    }
}
