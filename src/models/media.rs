//! Media models for the WeCom API.
//!
//! Uploaded media are referenced by `media_id` in later message sends.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::common::ApiReply;
use crate::error::WeComError;

/// Kind of media accepted by `/media/upload`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    /// Image (jpg, png).
    Image,
    /// Voice (amr).
    Voice,
    /// Video (mp4).
    Video,
    /// Any other file.
    File,
}

impl MediaType {
    /// The value sent as the `type` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Voice => "voice",
            MediaType::Video => "video",
            MediaType::File => "file",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = WeComError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(MediaType::Image),
            "voice" => Ok(MediaType::Voice),
            "video" => Ok(MediaType::Video),
            "file" => Ok(MediaType::File),
            other => Err(WeComError::validation(format!(
                "unknown media type {:?} (expected image, voice, video or file)",
                other
            ))),
        }
    }
}

/// A file to upload as the `media` form part.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    /// File name reported to WeCom.
    pub file_name: String,
    /// MIME type, if known.
    pub content_type: Option<String>,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl MediaFile {
    /// Wraps in-memory file contents.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    /// Sets the MIME type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), WeComError> {
        if self.file_name.trim().is_empty() {
            return Err(WeComError::validation("media file name is required"));
        }
        if self.bytes.is_empty() {
            return Err(WeComError::validation("media file is empty"));
        }
        Ok(())
    }
}

/// Typed view of a `/media/upload` reply.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaUploaded {
    /// Media type echoed back.
    #[serde(rename = "type", default)]
    pub media_type: String,
    /// Id to reference in messages.
    pub media_id: String,
    /// Upload timestamp (seconds), as a string or number.
    #[serde(default)]
    pub created_at: Option<serde_json::Value>,
}

/// A file downloaded from `/media/get`.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaDownload {
    /// `Content-Type` of the response.
    pub content_type: Option<String>,
    /// File name from `Content-Disposition`.
    pub file_name: Option<String>,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Result of `/media/get`: the file, or an error envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaFetch {
    /// The raw file.
    File(MediaDownload),
    /// WeCom answered with an envelope instead of a file.
    Rejected(ApiReply),
}

/// Extracts the file name from a `Content-Disposition` header value.
///
/// Prefers the RFC 5987 `filename*` form over plain `filename`.
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    for param in header.split(';').map(str::trim) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                // charset'lang'percent-encoded
                let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value);
                if let Ok(decoded) = urlencoding::decode(encoded) {
                    return Some(decoded.into_owned());
                }
            }
            "filename" if !value.is_empty() => plain = Some(value.to_string()),
            _ => {}
        }
    }
    plain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_round_trip_names() {
        assert_eq!(MediaType::Image.as_str(), "image");
        assert_eq!("VIDEO".parse::<MediaType>().unwrap(), MediaType::Video);
        assert!("gif".parse::<MediaType>().is_err());
    }

    #[test]
    fn test_media_file_validate() {
        assert!(MediaFile::new("a.png", vec![1, 2, 3]).validate().is_ok());
        assert!(MediaFile::new("a.png", Vec::new()).validate().is_err());
        assert!(MediaFile::new(" ", vec![1]).validate().is_err());
    }

    #[test]
    fn test_content_disposition_plain() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="report.pdf""#),
            Some("report.pdf".to_string())
        );
    }

    #[test]
    fn test_content_disposition_extended() {
        assert_eq!(
            parse_content_disposition(
                "attachment; filename=\"x.png\"; filename*=UTF-8''%E5%9B%BE%E7%89%87.png"
            ),
            Some("图片.png".to_string())
        );
    }

    #[test]
    fn test_content_disposition_missing() {
        assert_eq!(parse_content_disposition("inline"), None);
    }
}
