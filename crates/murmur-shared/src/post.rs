use serde::{Deserialize, Serialize};

/// Content of a post or reply about to be published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub content: String,
    pub media_ref: Option<String>,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
}

impl NewPost {
    /// Build a post, extracting `#hashtags` and `@mentions` from the content.
    pub fn new(content: impl Into<String>, media_ref: Option<String>) -> Self {
        let content = content.into();
        Self {
            hashtags: extract_tagged(&content, '#'),
            mentions: extract_tagged(&content, '@'),
            content,
            media_ref,
        }
    }
}

pub fn extract_hashtags(content: &str) -> Vec<String> {
    extract_tagged(content, '#')
}

pub fn extract_mentions(content: &str) -> Vec<String> {
    extract_tagged(content, '@')
}

/// Words (alphanumerics and `_`) directly following `marker`, in order of appearance.
fn extract_tagged(content: &str, marker: char) -> Vec<String> {
    let mut tags = Vec::new();
    let mut chars = content.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != marker {
            continue;
        }
        let mut word = String::new();
        while let Some(&(_, next)) = chars.peek() {
            if next.is_alphanumeric() || next == '_' {
                word.push(next);
                chars.next();
            } else {
                break;
            }
        }
        if !word.is_empty() {
            tags.push(word);
        }
    }

    tags
}
