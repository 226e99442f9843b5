//! Core domain types for pledge-dl
//!
//! Wire records (`PlanRecord`, `PostPage`, `PostDetailRecord`) mirror the
//! platform API and are decoded with serde; domain values (`Artist`,
//! `PostDetail`, `FileEntry`) are resolved from them once and never mutated
//! afterwards.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Envelope wrapping every API response body.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiEnvelope<T> {
    pub(crate) body: T,
}

/// One record from the supported-plan listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRecord {
    /// The creator behind the plan
    pub user: PlanUser,
    /// Plan title
    pub title: String,
    /// Monthly pledged fee for this plan
    pub fee: u32,
    /// Creator identifier used by the post-listing endpoint
    pub creator_id: String,
}

/// Creator identity embedded in a plan record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanUser {
    /// Display name
    pub name: String,
    /// Numeric account id
    pub user_id: u64,
}

/// An artist the account supports, resolved from a plan record.
///
/// Immutable once constructed. Identity for rule matching is the 4-tuple
/// (name, title, id, creator_id); any of the four may match a rule pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artist {
    /// Display name; also the artist's directory name on disk
    pub name: String,
    /// Supported plan title
    pub title: String,
    /// Numeric account id
    pub id: u64,
    /// Creator identifier used for post listing
    pub creator_id: String,
    /// Pledged fee; gates which paid posts are accessible
    pub fee: u32,
}

impl Artist {
    /// Build an artist from a supported-plan record.
    pub fn from_plan(plan: PlanRecord) -> Self {
        Self {
            name: plan.user.name,
            title: plan.title,
            id: plan.user.user_id,
            creator_id: plan.creator_id,
            fee: plan.fee,
        }
    }

    /// The four identifier strings rules are matched against.
    pub fn identifiers(&self) -> [String; 4] {
        [
            self.name.clone(),
            self.title.clone(),
            self.id.to_string(),
            self.creator_id.clone(),
        ]
    }
}

/// Post summary from one page of the paginated listing. Ephemeral.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Post identifier
    pub id: String,
    /// Post title
    pub title: String,
    /// Fee tier required to access this post (0 = free)
    pub fee_required: u32,
}

impl Post {
    /// Whether the caller's pledge grants access to this post.
    ///
    /// Free posts are excluded by design (they are not gated content);
    /// posts above the pledged tier are excluded because the account is
    /// not entitled to them even though the API lists them.
    pub fn is_accessible(&self, artist: &Artist) -> bool {
        self.fee_required > 0 && self.fee_required <= artist.fee
    }
}

/// One page of the post listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    /// Post summaries on this page
    #[serde(default)]
    pub items: Vec<Post>,
    /// Absolute URL of the next page, if any
    #[serde(default)]
    pub next_url: Option<String>,
}

/// Full post record as returned by the detail endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetailRecord {
    /// Post identifier
    pub id: String,
    /// Post title
    pub title: String,
    /// Tags attached to the post
    #[serde(default)]
    pub tags: Vec<String>,
    /// Leading excerpt text
    #[serde(default)]
    pub excerpt: String,
    /// Publication timestamp
    #[serde(default)]
    pub published_datetime: Option<DateTime<Utc>>,
    /// File collection in whichever shape the body uses
    #[serde(default)]
    pub body: Option<PostBodyFiles>,
}

/// The two wire shapes a post body's file collection can take.
///
/// Resolved exactly once, at [`PostDetail::from_api`] time, into a single
/// ordered sequence; consumers never sniff shapes themselves.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PostBodyFiles {
    /// Ordered list form: `{"files": [...]}`
    Listed {
        /// Files in source order
        files: Vec<RemoteFile>,
    },
    /// Keyed map form: `{"fileMap": {...}}`. Entry order is the map's
    /// iteration order (ascending key).
    Keyed {
        /// Files keyed by block id
        #[serde(rename = "fileMap")]
        file_map: BTreeMap<String, RemoteFile>,
    },
    /// Neither shape present
    Empty {},
}

impl PostBodyFiles {
    /// Flatten into the resolved ordered sequence.
    fn into_entries(self) -> Vec<RemoteFile> {
        match self {
            Self::Listed { files } => files,
            Self::Keyed { file_map } => file_map.into_values().collect(),
            Self::Empty {} => Vec::new(),
        }
    }
}

/// One downloadable item as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Display name; may be empty
    #[serde(default)]
    pub name: String,
    /// File extension without the leading dot
    pub extension: String,
    /// Source URL
    pub url: String,
}

/// A post with its resolved, ordered file sequence.
#[derive(Debug, Clone)]
pub struct PostDetail {
    /// Post identifier
    pub id: String,
    /// Post title
    pub title: String,
    /// Tags attached to the post
    pub tags: Vec<String>,
    /// Leading excerpt text
    pub excerpt: String,
    /// Downloadable files in source order
    pub files: Vec<FileEntry>,
}

impl PostDetail {
    /// Resolve a wire record into the domain value, flattening the body's
    /// file shapes into one ordered sequence and assigning 1-based indices.
    pub fn from_api(record: PostDetailRecord) -> Self {
        let published = record
            .published_datetime
            .map(|dt| dt.format("%Y%m%d").to_string())
            .unwrap_or_default();

        let files = record
            .body
            .map(PostBodyFiles::into_entries)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, file)| FileEntry {
                index: i + 1,
                published: published.clone(),
                name: if file.name.is_empty() {
                    record.title.clone()
                } else {
                    file.name
                },
                extension: file.extension,
                url: file.url,
            })
            .collect();

        Self {
            id: record.id,
            title: record.title,
            tags: record.tags,
            excerpt: record.excerpt,
            files,
        }
    }
}

/// One downloadable file, resolved and ready for path derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// 1-based position within the post's file sequence
    pub index: usize,
    /// Publication date rendered as `YYYYMMDD`; empty when unknown
    pub published: String,
    /// Display name, falling back to the post title
    pub name: String,
    /// File extension without the leading dot
    pub extension: String,
    /// Source URL
    pub url: String,
}

impl FileEntry {
    /// On-disk basename without the extension: the non-empty components of
    /// {index, published, name} joined with `-`. Indices below 10 render
    /// zero-padded to two digits.
    pub fn basename(&self) -> String {
        let index = format!("{:02}", self.index);
        [index, self.published.clone(), self.name.clone()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}
