/// Notification model shared by the feed store and the HTTP surface.
///
/// - `models`: the notification variants and the resolved domain references they are built from
/// - `codec`: the flat tagged JSON payload stored per feed entry
/// - `dispatch`: per-kind handler tables checked for completeness at startup
/// - `events`: social events that produce notifications
/// - `api`: request/response bodies

pub mod api;
pub mod codec;
pub mod dispatch;
pub mod events;
pub mod models;

pub use codec::{CodecError, decode, encode};
pub use dispatch::{DispatchError, DispatchTable};
pub use events::SocialEvent;
pub use models::{
    Actor, CommentNotification, CommentRef, Envelope, FollowerNotification, LikeNotification,
    Notification, NotificationKind, PostAttrs, PostRef, PostType, UserRef, unix_now,
};
