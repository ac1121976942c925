//! Record shapes returned by the search API and stored in monthly archives.

use crate::store::Columns;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which search endpoint / archive directory a record belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKind {
    Submission,
    Comment,
}

impl ItemKind {
    pub const ALL: [ItemKind; 2] = [ItemKind::Submission, ItemKind::Comment];

    /// Directory name under a community, also the endpoint path segment.
    pub fn dir_name(self) -> &'static str {
        match self {
            ItemKind::Submission => "submission",
            ItemKind::Comment => "comment",
        }
    }

    /// Prefix used for summary column names.
    pub fn column_prefix(self) -> &'static str {
        match self {
            ItemKind::Submission => "submissions",
            ItemKind::Comment => "comments",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Shared view over both record kinds, used by the fetcher, the archive store and
/// the daily summarizer.
pub trait Record: Serialize + DeserializeOwned + Clone + Columns {
    const KIND: ItemKind;

    fn id(&self) -> &str;
    fn created_utc(&self) -> i64;
    fn score(&self) -> Option<f64>;
    /// Text handed to the sentiment scorer; missing fields count as empty.
    fn sentiment_text(&self) -> String;
    /// Kind-specific metric averaged per day (upvote ratio / controversiality).
    fn extra_metric(&self) -> Option<f64>;
}

/// A post. Field order is the archive column order (`id` first, it is the row key).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub selftext: Option<String>,
    pub title: Option<String>,
    pub upvote_ratio: Option<f64>,
    pub score: Option<i64>,
    pub num_comments: Option<i64>,
    pub created_utc: i64,
}

impl Columns for Submission {
    const COLUMNS: &'static [&'static str] =
        &["id", "selftext", "title", "upvote_ratio", "score", "num_comments", "created_utc"];
}

impl Record for Submission {
    const KIND: ItemKind = ItemKind::Submission;

    fn id(&self) -> &str { &self.id }
    fn created_utc(&self) -> i64 { self.created_utc }
    fn score(&self) -> Option<f64> { self.score.map(|s| s as f64) }

    fn sentiment_text(&self) -> String {
        format!(
            "{} - {}",
            self.title.as_deref().unwrap_or(""),
            self.selftext.as_deref().unwrap_or("")
        )
    }

    fn extra_metric(&self) -> Option<f64> { self.upvote_ratio }
}

/// A reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub body: Option<String>,
    pub created_utc: i64,
    pub controversiality: Option<i64>,
    pub score: Option<i64>,
}

impl Columns for Comment {
    const COLUMNS: &'static [&'static str] = &["id", "body", "created_utc", "controversiality", "score"];
}

impl Record for Comment {
    const KIND: ItemKind = ItemKind::Comment;

    fn id(&self) -> &str { &self.id }
    fn created_utc(&self) -> i64 { self.created_utc }
    fn score(&self) -> Option<f64> { self.score.map(|s| s as f64) }
    fn sentiment_text(&self) -> String { self.body.clone().unwrap_or_default() }
    fn extra_metric(&self) -> Option<f64> { self.controversiality.map(|c| c as f64) }
}
