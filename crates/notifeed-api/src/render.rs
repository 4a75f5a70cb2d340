use notifeed_db::FeedEntry;
use notifeed_types::api::FeedEntryResponse;
use notifeed_types::{DispatchError, DispatchTable, Notification, NotificationKind, PostAttrs};

/// Icon and summary text for one notification kind.
struct KindRenderer {
    icon: String,
    summary: fn(&Notification) -> String,
}

impl KindRenderer {
    fn new(kind: NotificationKind, summary: fn(&Notification) -> String) -> Self {
        Self {
            icon: icon_path(kind),
            summary,
        }
    }
}

/// Presentation for every notification kind, checked for completeness when built.
pub struct Renderers {
    table: DispatchTable<KindRenderer>,
}

impl Renderers {
    pub fn new() -> Result<Self, DispatchError> {
        let table = DispatchTable::builder()
            .on(
                NotificationKind::Follower,
                KindRenderer::new(NotificationKind::Follower, follower_summary),
            )
            .on(
                NotificationKind::Like,
                KindRenderer::new(NotificationKind::Like, like_summary),
            )
            .on(
                NotificationKind::Comment,
                KindRenderer::new(NotificationKind::Comment, comment_summary),
            )
            .build()?;
        Ok(Self { table })
    }

    pub fn icon(&self, notification: &Notification) -> &str {
        &self.table.handler_for(notification).icon
    }

    pub fn summary(&self, notification: &Notification) -> String {
        (self.table.handler_for(notification).summary)(notification)
    }

    pub fn entry(&self, entry: FeedEntry) -> FeedEntryResponse {
        FeedEntryResponse {
            icon: self.icon(&entry.notification).to_string(),
            summary: self.summary(&entry.notification),
            created_at: entry.notification.datetime(),
            is_new: entry.is_new,
            notification: entry.notification,
        }
    }
}

pub fn icon_path(kind: NotificationKind) -> String {
    format!(
        "icons/notifications/{}_notification.png",
        kind.tag().to_lowercase()
    )
}

/// The new-notification count as shown on the menu icon: the number, or "{cap}+" above `cap`.
pub fn badge(count: usize, cap: usize) -> String {
    if count <= cap {
        count.to_string()
    } else {
        format!("{}+", cap)
    }
}

fn follower_summary(n: &Notification) -> String {
    format!("{} started following you.", n.actor().actor_name)
}

fn like_summary(n: &Notification) -> String {
    match n.post() {
        Some(post) => format!(
            "{} liked {} {}",
            n.actor().actor_name,
            possessive(n, post),
            post.post_type.as_str().to_lowercase()
        ),
        None => format!("{} liked your post", n.actor().actor_name),
    }
}

fn comment_summary(n: &Notification) -> String {
    let target = match n.post() {
        Some(post) => format!(
            "{} {}",
            possessive(n, post),
            post.post_type.as_str().to_lowercase()
        ),
        None => "your post".to_string(),
    };
    match n {
        Notification::Comment(c) => format!(
            "{} commented on {}: \"{}\"",
            c.actor.actor_name, target, c.comment_preview
        ),
        _ => format!("{} commented on {}", n.actor().actor_name, target),
    }
}

/// Whose post it is, from the feed owner's point of view.
fn possessive(n: &Notification, post: &PostAttrs) -> String {
    if n.user_id() == Some(post.post_user_id) {
        "your".to_string()
    } else if n.actor().actor_id == post.post_user_id {
        "their".to_string()
    } else {
        format!("{}'s", post.post_user_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifeed_types::{
        CommentNotification, CommentRef, FollowerNotification, LikeNotification, PostRef,
        PostType, UserRef,
    };
    use uuid::Uuid;

    fn user(first: &str, last: &str) -> UserRef {
        UserRef {
            id: Uuid::new_v4(),
            first_name: first.into(),
            last_name: last.into(),
            photo_url: None,
        }
    }

    fn post(post_type: PostType, owner: &UserRef) -> PostRef {
        PostRef {
            id: Uuid::new_v4(),
            post_type,
            media_url: None,
            owner: owner.clone(),
        }
    }

    fn comment(body: &str, author: &UserRef) -> CommentRef {
        CommentRef {
            id: Uuid::new_v4(),
            body: body.into(),
            author: author.clone(),
        }
    }

    #[test]
    fn test_icon_paths() {
        assert_eq!(
            icon_path(NotificationKind::Follower),
            "icons/notifications/follower_notification.png"
        );
        assert_eq!(
            icon_path(NotificationKind::Comment),
            "icons/notifications/comment_notification.png"
        );
    }

    #[test]
    fn test_badge_caps() {
        assert_eq!(badge(0, 30), "0");
        assert_eq!(badge(30, 30), "30");
        assert_eq!(badge(31, 30), "30+");
    }

    #[test]
    fn test_summaries() {
        let renderers = Renderers::new().unwrap();
        let owner = user("Giovanni", "Rossi");
        let stefano = user("Stefano", "Uli");
        let photo = post(PostType::Photo, &owner);

        let follow: Notification = FollowerNotification::new(&stefano, &owner).into();
        assert_eq!(renderers.summary(&follow), "Stefano Uli started following you.");
        assert_eq!(renderers.icon(&follow), "icons/notifications/follower_notification.png");

        let like: Notification = LikeNotification::new(&stefano, &photo).into();
        assert_eq!(renderers.summary(&like), "Stefano Uli liked your photo");

        let status = post(PostType::Status, &owner);
        let on_status: Notification =
            CommentNotification::new(&comment("commento su uno status", &stefano), &status, None)
                .into();
        assert_eq!(
            renderers.summary(&on_status),
            "Stefano Uli commented on your status: \"commento su uno status\""
        );
    }

    #[test]
    fn test_comment_possessive_for_other_recipients() {
        let renderers = Renderers::new().unwrap();
        let owner = user("Giovanni", "Rossi");
        let stefano = user("Stefano", "Uli");
        let previous = user("Anna", "Bianchi");
        let video = post(PostType::Video, &owner);

        // The owner comments on their own video; a previous commenter is told.
        let own: Notification =
            CommentNotification::new(&comment("grazie", &owner), &video, Some(&previous)).into();
        assert_eq!(
            renderers.summary(&own),
            "Giovanni Rossi commented on their video: \"grazie\""
        );

        let third: Notification =
            CommentNotification::new(&comment("bello", &stefano), &video, Some(&previous)).into();
        assert_eq!(
            renderers.summary(&third),
            "Stefano Uli commented on Giovanni Rossi's video: \"bello\""
        );
    }

    #[test]
    fn test_entry_carries_presentation() {
        let renderers = Renderers::new().unwrap();
        let owner = user("Giovanni", "Rossi");
        let n: Notification = FollowerNotification::new(&user("Stefano", "Uli"), &owner).into();
        let response = renderers.entry(FeedEntry {
            notification: n.at(1_700_000_000.5),
            is_new: true,
        });
        assert!(response.is_new);
        assert_eq!(response.created_at.timestamp_millis(), 1_700_000_000_500);
        assert_eq!(response.icon, "icons/notifications/follower_notification.png");
    }
}
