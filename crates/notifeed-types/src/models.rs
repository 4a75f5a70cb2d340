use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::CodecError;

/// Longest comment preview stored on a `CommentNotification`, omission included.
pub const COMMENT_PREVIEW_MAX: usize = 100;
const PREVIEW_OMISSION: &str = "...";

/// Current wall-clock time as fractional Unix seconds (microsecond precision).
pub fn unix_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Converts a fractional Unix timestamp into a `DateTime`. Out-of-range values collapse to the epoch.
pub fn to_datetime(time: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros((time * 1_000_000.0).round() as i64).unwrap_or_default()
}

// -- Resolved domain references --
//
// Callers flatten their users, posts and comments into these before building a notification.
// Nothing in the feed ever looks a domain object up again.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl UserRef {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostType {
    Status,
    Photo,
    Video,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "Status",
            Self::Photo => "Photo",
            Self::Video => "Video",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRef {
    pub id: Uuid,
    pub post_type: PostType,
    /// Image URL for photos, thumbnail URL for videos. Ignored for statuses.
    #[serde(default)]
    pub media_url: Option<String>,
    pub owner: UserRef,
}

impl PostRef {
    pub fn thumbnail_url(&self) -> Option<String> {
        match self.post_type {
            PostType::Status => None,
            PostType::Photo | PostType::Video => self.media_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRef {
    pub id: Uuid,
    pub body: String,
    pub author: UserRef,
}

// -- Attribute sets --

/// Who performed the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub actor_id: Uuid,
    pub actor_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_pic_url: Option<String>,
}

impl From<&UserRef> for Actor {
    fn from(user: &UserRef) -> Self {
        Self {
            actor_id: user.id,
            actor_name: user.full_name(),
            actor_pic_url: user.photo_url.clone(),
        }
    }
}

/// The content acted upon and its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostAttrs {
    pub post_id: Uuid,
    pub post_type: PostType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_thumbnail_url: Option<String>,
    pub post_user_id: Uuid,
    pub post_user_name: String,
}

impl From<&PostRef> for PostAttrs {
    fn from(post: &PostRef) -> Self {
        Self {
            post_id: post.id,
            post_type: post.post_type,
            post_thumbnail_url: post.thumbnail_url(),
            post_user_id: post.owner.id,
            post_user_name: post.owner.full_name(),
        }
    }
}

/// Fields shared by every variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub time: f64,
}

impl Envelope {
    fn owned_by(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            time: unix_now(),
        }
    }
}

// -- Variants --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowerNotification {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(flatten)]
    pub actor: Actor,
}

impl FollowerNotification {
    /// `follower` started following `followed`; the notification lands in `followed`'s feed.
    pub fn new(follower: &UserRef, followed: &UserRef) -> Self {
        Self {
            envelope: Envelope::owned_by(followed.id),
            actor: follower.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeNotification {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(flatten)]
    pub post: PostAttrs,
    #[serde(flatten)]
    pub actor: Actor,
}

impl LikeNotification {
    /// `liker` liked `post`; the notification lands in the post owner's feed.
    pub fn new(liker: &UserRef, post: &PostRef) -> Self {
        Self {
            envelope: Envelope::owned_by(post.owner.id),
            post: post.into(),
            actor: liker.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentNotification {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(flatten)]
    pub post: PostAttrs,
    #[serde(flatten)]
    pub actor: Actor,
    pub comment_id: Uuid,
    pub comment_preview: String,
}

impl CommentNotification {
    /// `comment` was left on `post`. The notification goes to `recipient` when given
    /// (e.g. a previous commenter), otherwise to the post owner.
    pub fn new(comment: &CommentRef, post: &PostRef, recipient: Option<&UserRef>) -> Self {
        let owner = recipient.unwrap_or(&post.owner);
        Self {
            envelope: Envelope::owned_by(owner.id),
            post: post.into(),
            actor: (&comment.author).into(),
            comment_id: comment.id,
            comment_preview: truncate_preview(&comment.body, COMMENT_PREVIEW_MAX),
        }
    }
}

/// Cuts `text` to at most `max` characters, ending with "..." when anything was dropped.
pub fn truncate_preview(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(PREVIEW_OMISSION.len());
    let mut preview: String = text.chars().take(keep).collect();
    preview.push_str(PREVIEW_OMISSION);
    preview
}

// -- The tagged union --

/// Closed set of notification kinds. The tag doubles as the `type` field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Follower,
    Like,
    Comment,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 3] = [Self::Follower, Self::Like, Self::Comment];

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Follower => "Follower",
            Self::Like => "Like",
            Self::Comment => "Comment",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for NotificationKind {
    type Err = CodecError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| CodecError::UnknownVariant(tag.to_string()))
    }
}

/// A feed entry. Serializes to the flat wire payload: `type` plus every populated field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notification {
    Follower(FollowerNotification),
    Like(LikeNotification),
    Comment(CommentNotification),
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Follower(_) => NotificationKind::Follower,
            Self::Like(_) => NotificationKind::Like,
            Self::Comment(_) => NotificationKind::Comment,
        }
    }

    pub fn tag(&self) -> &'static str {
        self.kind().tag()
    }

    pub fn envelope(&self) -> &Envelope {
        match self {
            Self::Follower(n) => &n.envelope,
            Self::Like(n) => &n.envelope,
            Self::Comment(n) => &n.envelope,
        }
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        match self {
            Self::Follower(n) => &mut n.envelope,
            Self::Like(n) => &mut n.envelope,
            Self::Comment(n) => &mut n.envelope,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.envelope().user_id
    }

    /// Fractional Unix seconds. Also the score the entry is stored under.
    pub fn time(&self) -> f64 {
        self.envelope().time
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        to_datetime(self.time())
    }

    /// Overrides the construction timestamp.
    pub fn at(mut self, time: f64) -> Self {
        self.envelope_mut().time = time;
        self
    }

    /// Overrides the feed owner.
    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.envelope_mut().user_id = Some(user_id);
        self
    }

    /// Strictly newer than the owner's confirmed watermark.
    pub fn is_new(&self, last_read: f64) -> bool {
        self.time() > last_read
    }

    pub fn actor(&self) -> &Actor {
        match self {
            Self::Follower(n) => &n.actor,
            Self::Like(n) => &n.actor,
            Self::Comment(n) => &n.actor,
        }
    }

    pub fn post(&self) -> Option<&PostAttrs> {
        match self {
            Self::Follower(_) => None,
            Self::Like(n) => Some(&n.post),
            Self::Comment(n) => Some(&n.post),
        }
    }
}

impl From<FollowerNotification> for Notification {
    fn from(n: FollowerNotification) -> Self {
        Self::Follower(n)
    }
}

impl From<LikeNotification> for Notification {
    fn from(n: LikeNotification) -> Self {
        Self::Like(n)
    }
}

impl From<CommentNotification> for Notification {
    fn from(n: CommentNotification) -> Self {
        Self::Comment(n)
    }
}
