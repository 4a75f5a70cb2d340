use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    CommentNotification, CommentRef, FollowerNotification, LikeNotification, Notification, PostRef,
    UserRef,
};

/// Social events that produce a notification, with every referenced object already resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SocialEvent {
    /// `follower` started following `followed`
    Follow { follower: UserRef, followed: UserRef },

    /// `liker` liked a post
    Like { liker: UserRef, post: PostRef },

    /// A comment was posted. `recipient` overrides the post owner as the notified user.
    Comment {
        comment: CommentRef,
        post: PostRef,
        #[serde(default)]
        recipient: Option<UserRef>,
    },
}

impl SocialEvent {
    /// The user whose feed receives the notification.
    pub fn recipient_id(&self) -> Uuid {
        match self {
            Self::Follow { followed, .. } => followed.id,
            Self::Like { post, .. } => post.owner.id,
            Self::Comment {
                post, recipient, ..
            } => recipient.as_ref().map_or(post.owner.id, |r| r.id),
        }
    }

    pub fn to_notification(&self) -> Notification {
        match self {
            Self::Follow { follower, followed } => {
                FollowerNotification::new(follower, followed).into()
            }
            Self::Like { liker, post } => LikeNotification::new(liker, post).into(),
            Self::Comment {
                comment,
                post,
                recipient,
            } => CommentNotification::new(comment, post, recipient.as_ref()).into(),
        }
    }
}
