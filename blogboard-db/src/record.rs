use blogboard_common::model::{
    ModelValidationError,
    comment::{Comment, CommentDetails, CommentSummary},
    password::PasswordDigest,
    post::{Post, PostCommentCount},
    user::{UpsertedUser, User, UserProfile},
};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UpsertedUserRecord {
    #[sqlx(flatten)]
    pub user: UserRecord,
    pub inserted: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PasswordDigestRecord {
    pub password_digest: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PostWithAuthorRecord {
    pub post_id: i64,
    pub title: String,
    pub user_id: i64,
    pub user_name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PostCommentCountRecord {
    pub id: i64,
    pub title: String,
    pub comment_count: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub id: i64,
    pub content: String,
    pub post_id: i64,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct CommentSummaryRecord {
    pub id: i64,
    pub post_id: i64,
    pub content: String,
}

/// Comment joined with its author and post; joined columns carry a `user_` or `post_` prefix.
#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentDetailsRecord {
    pub id: i64,
    pub content: String,
    pub post_id: i64,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub user_name: String,
    pub user_email: String,
    pub user_created_at: OffsetDateTime,
    pub user_updated_at: OffsetDateTime,
    pub post_title: String,
    pub post_content: String,
    pub post_user_id: i64,
    pub post_created_at: OffsetDateTime,
    pub post_updated_at: OffsetDateTime,
    pub post_deleted_at: Option<OffsetDateTime>,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            name: value.name,
            email: value.email,
            role: value.role.parse()?,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

impl TryFrom<UserRecord> for UserProfile {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        User::try_from(value).map(UserProfile::from)
    }
}

impl TryFrom<UpsertedUserRecord> for UpsertedUser {
    type Error = ModelValidationError;

    fn try_from(value: UpsertedUserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user.try_into()?,
            created: value.inserted,
        })
    }
}

impl TryFrom<PasswordDigestRecord> for PasswordDigest {
    type Error = ModelValidationError;

    fn try_from(value: PasswordDigestRecord) -> Result<Self, Self::Error> {
        Ok(value.password_digest.parse()?)
    }
}

impl From<PostRecord> for Post {
    fn from(value: PostRecord) -> Self {
        Self {
            id: value.id.into(),
            title: value.title,
            content: value.content,
            user_id: value.user_id.into(),
            created_at: value.created_at,
            updated_at: value.updated_at,
            deleted_at: value.deleted_at,
        }
    }
}

impl From<PostCommentCountRecord> for PostCommentCount {
    fn from(value: PostCommentCountRecord) -> Self {
        Self {
            id: value.id.into(),
            title: value.title,
            comment_count: value.comment_count,
        }
    }
}

impl From<CommentRecord> for Comment {
    fn from(value: CommentRecord) -> Self {
        Self {
            id: value.id.into(),
            content: value.content,
            post_id: value.post_id.into(),
            user_id: value.user_id.into(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<CommentSummaryRecord> for CommentSummary {
    fn from(value: CommentSummaryRecord) -> Self {
        Self {
            id: value.id.into(),
            content: value.content,
        }
    }
}

impl From<CommentDetailsRecord> for CommentDetails {
    fn from(value: CommentDetailsRecord) -> Self {
        Self {
            comment: Comment {
                id: value.id.into(),
                content: value.content,
                post_id: value.post_id.into(),
                user_id: value.user_id.into(),
                created_at: value.created_at,
                updated_at: value.updated_at,
            },
            user: UserProfile {
                id: value.user_id.into(),
                name: value.user_name,
                email: value.user_email,
                created_at: value.user_created_at,
                updated_at: value.user_updated_at,
            },
            post: Post {
                id: value.post_id.into(),
                title: value.post_title,
                content: value.post_content,
                user_id: value.post_user_id.into(),
                created_at: value.post_created_at,
                updated_at: value.post_updated_at,
                deleted_at: value.post_deleted_at,
            },
        }
    }
}
