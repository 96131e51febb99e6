//! Telegram desktop chat export (`result.json`) and its conversion into [`Message`]s.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TelequestError};

use super::{Author, Message};

const EXPORT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatExport {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub chat_type: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub messages: Vec<RawMessage>,
}

impl ChatExport {
    /// Parse an uploaded export, rejecting oversized, malformed and empty files.
    pub fn from_slice(bytes: &[u8], max_bytes: usize) -> Result<Self> {
        if bytes.len() > max_bytes {
            return Err(TelequestError::Validation(format!(
                "The uploaded file is too big. Please upload a file less than {}MB.",
                max_bytes / (1024 * 1024)
            )));
        }

        let export: ChatExport = serde_json::from_slice(bytes).map_err(|e| {
            tracing::debug!(error = %e, "Rejected chat export");
            TelequestError::Validation(
                "The uploaded file is invalid. Please upload a valid file.".to_string(),
            )
        })?;

        if export.messages.is_empty() {
            return Err(TelequestError::Validation(
                "The uploaded file is empty. Please upload a valid file.".to_string(),
            ));
        }

        Ok(export)
    }
}

/// One entry of an export's `messages` array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: i64,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub date_unixtime: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub from_id: Option<String>,
    #[serde(default)]
    pub reply_to_message_id: Option<i64>,
    #[serde(default)]
    pub text: Option<RawText>,
}

/// Message text: either plain or a list of formatted fragments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawText {
    Plain(String),
    Rich(Vec<TextPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextPart {
    Plain(String),
    Entity {
        #[serde(default, rename = "type")]
        kind: Option<String>,
        text: String,
    },
}

impl RawText {
    /// Rich fragments are joined with a trailing space after each one.
    pub fn flatten(&self) -> String {
        match self {
            RawText::Plain(text) => text.clone(),
            RawText::Rich(parts) => parts
                .iter()
                .map(|part| match part {
                    TextPart::Plain(text) => text.as_str(),
                    TextPart::Entity { text, .. } => text.as_str(),
                })
                .fold(String::new(), |mut acc, text| {
                    acc.push_str(text);
                    acc.push(' ');
                    acc
                }),
        }
    }
}

/// Why a raw message was not converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Service entries (joins, pins, title changes) carry no conversation content.
    NotAMessage,
    MissingAuthor,
    InvalidDate,
}

impl RawMessage {
    pub fn into_message(
        self,
        chat_id: i64,
        chat_title: Option<&str>,
    ) -> std::result::Result<Message, DiscardReason> {
        if self.kind.as_deref().is_some_and(|kind| kind != "message") {
            return Err(DiscardReason::NotAMessage);
        }

        let author_id = self
            .from_id
            .as_deref()
            .and_then(parse_author_id)
            .ok_or(DiscardReason::MissingAuthor)?;

        let date = self.parse_date().ok_or(DiscardReason::InvalidDate)?;

        Ok(Message {
            id: self.id,
            chat_id,
            from_user: Author {
                id: author_id,
                name: self.from,
                is_bot: false,
            },
            date,
            text: self.text.map(|text| text.flatten()).filter(|text| !text.is_empty()),
            reply_to_message: self.reply_to_message_id,
            chat_title: chat_title.map(str::to_string),
        })
    }

    fn parse_date(&self) -> Option<DateTime<Utc>> {
        if let Some(seconds) = self
            .date_unixtime
            .as_deref()
            .and_then(|raw| raw.parse::<i64>().ok())
        {
            return Utc.timestamp_opt(seconds, 0).single();
        }

        let raw = self.date.as_deref()?;
        NaiveDateTime::parse_from_str(raw, EXPORT_DATE_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Export author ids look like `user123456` or `channel987`.
fn parse_author_id(raw: &str) -> Option<i64> {
    let digits = raw.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    digits.parse().ok()
}
