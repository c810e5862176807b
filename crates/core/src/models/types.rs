//! Conversation types shared by the API surface and the LLM wire format.
//!
//! `Message` is what callers send (camelCase JSON, as the frontend emits it);
//! `Content`/`Part` is what the Gemini API expects.

use serde::{Deserialize, Serialize};

/// Author of a conversation message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// A file attached to a message by the user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalFile {
    pub file_name: String,
    /// Raw base64 or a `data:` URL
    pub base64_content: String,
}

/// One turn of the conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    /// Images as `data:<mime>;base64,...` URLs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_files: Vec<ExternalFile>,
    /// Paths of files in the current file set the user referred to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentioned_files: Vec<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: Vec::new(),
            external_files: Vec::new(),
            mentioned_files: Vec::new(),
        }
    }

    /// Convert to a model-facing turn. System messages have no turn.
    pub fn to_content(&self) -> Option<Content> {
        let role = match self.role {
            MessageRole::System => return None,
            MessageRole::User => ContentRole::User,
            MessageRole::Assistant => ContentRole::Model,
        };

        let mut text = self.content.clone();
        if !self.mentioned_files.is_empty() {
            text.push_str("\n\nReferenced files: ");
            text.push_str(&self.mentioned_files.join(", "));
        }

        let mut parts = vec![Part::text(text)];
        for image in &self.images {
            parts.push(Part::inline(mime_from_data_url(image), strip_data_url(image)));
        }
        for file in &self.external_files {
            let mime = mime_guess::from_path(&file.file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string();
            parts.push(Part::inline(mime, strip_data_url(&file.base64_content)));
        }

        Some(Content { role, parts })
    }
}

/// What a downstream build/install/start step reported when it failed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentError {
    pub action: String,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

/// Role of a turn on the Gemini wire
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    User,
    Model,
}

/// A turn on the Gemini wire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Content {
    pub role: ContentRole,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: ContentRole::User,
            parts: vec![Part::text(text)],
        }
    }
}

/// Inline binary payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

/// One piece of a turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData {
            inline_data: Blob {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }
}

/// MIME type declared by a `data:` URL, or octet-stream
pub fn mime_from_data_url(data_url: &str) -> String {
    data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(mime, _)| mime)
        .filter(|mime| {
            mime.split_once('/').is_some_and(|(kind, sub)| {
                !kind.is_empty()
                    && !sub.is_empty()
                    && kind.chars().all(|c| c.is_ascii_alphanumeric())
                    && sub
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || "-+.=".contains(c))
            })
        })
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Base64 payload of a `data:` URL (input returned as-is when it has no prefix)
pub fn strip_data_url(data_url: &str) -> &str {
    data_url
        .split_once(',')
        .map(|(_, data)| data)
        .unwrap_or(data_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_messages_have_no_turn() {
        assert!(Message::system("be nice").to_content().is_none());
    }

    #[test]
    fn test_assistant_maps_to_model_role() {
        let content = Message::assistant("done").to_content().unwrap();
        assert_eq!(content.role, ContentRole::Model);
        assert_eq!(content.parts, vec![Part::text("done")]);
    }

    #[test]
    fn test_attachments_become_inline_parts() {
        let mut msg = Message::user("look at this");
        msg.images.push("data:image/png;base64,iVBORw0KGgo=".to_string());
        msg.external_files.push(ExternalFile {
            file_name: "notes.txt".to_string(),
            base64_content: "aGVsbG8=".to_string(),
        });
        msg.mentioned_files.push("app/page.tsx".to_string());

        let content = msg.to_content().unwrap();
        assert_eq!(content.parts.len(), 3);
        assert_eq!(
            content.parts[0],
            Part::text("look at this\n\nReferenced files: app/page.tsx")
        );
        assert_eq!(content.parts[1], Part::inline("image/png", "iVBORw0KGgo="));
        assert_eq!(content.parts[2], Part::inline("text/plain", "aGVsbG8="));
    }

    #[test]
    fn test_data_url_helpers() {
        assert_eq!(mime_from_data_url("data:image/jpeg;base64,AAAA"), "image/jpeg");
        assert_eq!(mime_from_data_url("AAAA"), "application/octet-stream");
        assert_eq!(strip_data_url("data:image/jpeg;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url("AAAA"), "AAAA");
    }

    #[test]
    fn test_part_wire_format() {
        let json = serde_json::to_value(Part::inline("image/png", "xyz")).unwrap();
        assert_eq!(json["inlineData"]["mimeType"], "image/png");
        assert_eq!(json["inlineData"]["data"], "xyz");

        let json = serde_json::to_value(Part::text("hi")).unwrap();
        assert_eq!(json["text"], "hi");
    }

    #[test]
    fn test_message_deserializes_camel_case() {
        let msg: Message = serde_json::from_str(
            r#"{"role":"user","content":"hi","mentionedFiles":["a.ts"],"externalFiles":[{"fileName":"x.png","base64Content":"AA"}]}"#,
        )
        .unwrap();
        assert_eq!(msg.mentioned_files, vec!["a.ts"]);
        assert_eq!(msg.external_files[0].file_name, "x.png");
    }
}
