use crate::model::{
    Id,
    access::Owned,
    post::{Post, PostMarker},
    user::{UserMarker, UserProfile},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// How many comments `/comments/newest/{postId}` returns at most.
pub const NEWEST_COMMENTS_LIMIT: i64 = 3;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub content: String,
    pub post_id: Id<PostMarker>,
    pub user_id: Id<UserMarker>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Owned for Comment {
    const RESOURCE: &'static str = "comment";

    fn resource_id(&self) -> i64 {
        self.id.get()
    }

    fn owner(&self) -> Id<UserMarker> {
        self.user_id
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
pub struct CommentSummary {
    pub id: Id<CommentMarker>,
    pub content: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComment {
    pub content: String,
    pub post_id: Id<PostMarker>,
    pub user_id: Id<UserMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateComment {
    pub user_id: Id<UserMarker>,
    pub content: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct FoundOrCreatedComment {
    pub comment: Comment,
    pub created: bool,
}

/// Result of a substring search. `count` always equals `rows.len()`.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
pub struct CommentSearch {
    pub count: usize,
    pub rows: Vec<Comment>,
}

impl From<Vec<Comment>> for CommentSearch {
    fn from(rows: Vec<Comment>) -> Self {
        Self {
            count: rows.len(),
            rows,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct CommentDetails {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: UserProfile,
    pub post: Post,
}

#[cfg(test)]
mod tests {
    use crate::model::{
        Id,
        access::Owned,
        comment::{Comment, CommentSearch, CreateComment},
    };
    use time::macros::datetime;

    fn comment(id: i64, user_id: i64) -> Comment {
        Comment {
            id: Id::new(id),
            content: format!("comment {id}"),
            post_id: Id::new(1),
            user_id: Id::new(user_id),
            created_at: datetime!(2025-10-24 10:00 UTC),
            updated_at: datetime!(2025-10-24 10:00 UTC),
        }
    }

    #[test]
    fn search_count_matches_rows() {
        let search = CommentSearch::from(vec![comment(1, 1), comment(2, 1)]);

        assert_eq!(search.count, 2);
        assert_eq!(search.count, search.rows.len());
        assert_eq!(CommentSearch::from(Vec::new()).count, 0);
    }

    #[test]
    fn ownership_follows_user_id() {
        let comment = comment(5, 9);

        assert!(comment.ensure_owned_by(Id::new(9)).is_ok());
        let error = comment.ensure_owned_by(Id::new(1)).unwrap_err();
        assert_eq!(error.resource, "comment");
        assert_eq!(error.resource_id, 5);
    }

    #[test]
    fn bulk_payload_is_an_array_of_camel_case_objects() {
        let comments: Vec<CreateComment> = serde_json::from_str(
            r#"[{"content":"first","postId":1,"userId":2},{"content":"second","postId":1,"userId":3}]"#,
        )
        .unwrap();

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[1].user_id, Id::new(3));
    }
}
