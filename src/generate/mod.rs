//! Content Generation Module
//!
//! Prompt in, file contents out. The HTTP layer stores whatever a
//! `ContentGenerator` returns under the requested path.

mod openai;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use openai::OpenAiGenerator;

/// Kind of file to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeneratedFileType {
    #[serde(rename = "Text")]
    Text,
    #[serde(rename = "Image")]
    Image,
    #[serde(rename = "Text-to-Speech")]
    Audio,
}

impl GeneratedFileType {
    pub const ALL: [GeneratedFileType; 3] = [Self::Text, Self::Image, Self::Audio];

    /// Wire name, as accepted in `file_type=`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Image => "Image",
            Self::Audio => "Text-to-Speech",
        }
    }
}

impl fmt::Display for GeneratedFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneratedFileType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::InvalidRequest(format!(
                    "file_type must be one of Text, Image, Text-to-Speech (got '{}')",
                    s
                ))
            })
    }
}

/// Generated file contents
#[derive(Debug, Clone)]
pub struct GeneratedContent {
    pub data: Bytes,
    pub content_type: String,
}

/// Produces file contents from a prompt
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, file_type: GeneratedFileType) -> Result<GeneratedContent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_parsing() {
        assert_eq!("Text".parse::<GeneratedFileType>().unwrap(), GeneratedFileType::Text);
        assert_eq!("image".parse::<GeneratedFileType>().unwrap(), GeneratedFileType::Image);
        assert_eq!(
            "Text-to-Speech".parse::<GeneratedFileType>().unwrap(),
            GeneratedFileType::Audio
        );
        assert!(matches!(
            "Video".parse::<GeneratedFileType>(),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_file_type_wire_names() {
        assert_eq!(serde_json::to_string(&GeneratedFileType::Audio).unwrap(), "\"Text-to-Speech\"");
        assert_eq!(GeneratedFileType::Image.to_string(), "Image");
    }
}
