use chrono::{DateTime, TimeZone, Utc};
use eraser_core::ContentKind;
use serde::{Deserialize, Serialize};

/// Comment bodies longer than this are truncated in progress output.
pub const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub link_title: Option<String>,
    #[serde(default)]
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub score: i64,
}

/// What the deletion loop needs to know about an item, independent of kind.
pub trait Deletable {
    fn kind(&self) -> ContentKind;

    fn id(&self) -> &str;

    /// Reddit listings carry the fullname as `name`; fall back to building it.
    fn listed_name(&self) -> &str {
        ""
    }

    fn fullname(&self) -> String {
        let listed = self.listed_name();
        if listed.is_empty() {
            format!("{}_{}", self.kind().fullname_prefix(), self.id())
        } else {
            listed.to_string()
        }
    }

    /// Title for posts, truncated body for comments.
    fn headline(&self) -> String;

    fn created_utc(&self) -> f64;

    fn created_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.created_utc() as i64, 0)
            .single()
            .unwrap_or_default()
    }

    fn score(&self) -> i64;

    fn describe(&self) -> String {
        format!("Deleting {}: {}", self.kind(), self.headline())
    }
}

impl Deletable for RedditPostData {
    fn kind(&self) -> ContentKind {
        ContentKind::Post
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn listed_name(&self) -> &str {
        &self.name
    }

    fn headline(&self) -> String {
        self.title.clone()
    }

    fn created_utc(&self) -> f64 {
        self.created_utc
    }

    fn score(&self) -> i64 {
        self.score
    }
}

impl Deletable for RedditCommentData {
    fn kind(&self) -> ContentKind {
        ContentKind::Comment
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn listed_name(&self) -> &str {
        &self.name
    }

    fn headline(&self) -> String {
        preview(&self.body, PREVIEW_CHARS)
    }

    fn created_utc(&self) -> f64 {
        self.created_utc
    }

    fn score(&self) -> i64 {
        self.score
    }
}

#[derive(Debug, Clone)]
pub enum ContentItem {
    Post(RedditPostData),
    Comment(RedditCommentData),
}

impl ContentItem {
    fn inner(&self) -> &dyn Deletable {
        match self {
            ContentItem::Post(post) => post,
            ContentItem::Comment(comment) => comment,
        }
    }
}

impl Deletable for ContentItem {
    fn kind(&self) -> ContentKind {
        self.inner().kind()
    }

    fn id(&self) -> &str {
        self.inner().id()
    }

    fn listed_name(&self) -> &str {
        self.inner().listed_name()
    }

    fn headline(&self) -> String {
        self.inner().headline()
    }

    fn created_utc(&self) -> f64 {
        self.inner().created_utc()
    }

    fn score(&self) -> i64 {
        self.inner().score()
    }
}

impl From<RedditPostData> for ContentItem {
    fn from(post: RedditPostData) -> Self {
        ContentItem::Post(post)
    }
}

impl From<RedditCommentData> for ContentItem {
    fn from(comment: RedditCommentData) -> Self {
        ContentItem::Comment(comment)
    }
}

/// Truncates `text` to `max_chars` characters, appending `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
