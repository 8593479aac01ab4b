use crate::model::{
    Id,
    access::Owned,
    comment::CommentSummary,
    user::{UserMarker, UserSummary},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A post as stored. `deleted_at` is set once the post has been soft-deleted.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: String,
    pub content: String,
    pub user_id: Id<UserMarker>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl Post {
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Owned for Post {
    const RESOURCE: &'static str = "post";

    fn resource_id(&self) -> i64 {
        self.id.get()
    }

    fn owner(&self) -> Id<UserMarker> {
        self.user_id
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    pub title: String,
    pub content: String,
    pub user_id: Id<UserMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePost {
    pub user_id: Id<UserMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
pub struct PostDeleted {
    pub message: String,
}

/// Live post with its author and comments, as listed by `/posts/details`.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
pub struct PostDetails {
    pub id: Id<PostMarker>,
    pub title: String,
    pub user: UserSummary,
    pub comments: Vec<CommentSummary>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCommentCount {
    pub id: Id<PostMarker>,
    pub title: String,
    pub comment_count: i64,
}
