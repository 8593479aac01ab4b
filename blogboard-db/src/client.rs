use crate::{
    MIGRATOR,
    record::{
        CommentDetailsRecord, CommentRecord, CommentSummaryRecord, PasswordDigestRecord,
        PostCommentCountRecord, PostRecord, PostWithAuthorRecord, UpsertedUserRecord, UserRecord,
    },
};
use blogboard_common::model::{
    Id, ModelValidationError,
    access::{NotOwnerError, Owned},
    comment::{
        Comment, CommentDetails, CommentMarker, CommentSearch, CommentSummary, CreateComment,
        FoundOrCreatedComment, NEWEST_COMMENTS_LIMIT, UpdateComment,
    },
    password::PasswordDigest,
    post::{CreatePost, Post, PostCommentCount, PostDetails, PostMarker},
    user::{
        Role, UpsertUser, UpsertedUser, User, UserMarker, UserProfile, UserSummary, ValidatedUser,
    },
};
use sqlx::{
    PgPool, error::ErrorKind, migrate::MigrateError, postgres::PgDatabaseError, query, query_as,
};
use std::collections::HashMap;
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

const USERS_EMAIL_CONSTRAINT: &str = "users_email_key";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Email already exists")]
    EmailTaken(String),
    #[error("A referenced record does not exist ({0})")]
    MissingReference(String),
    #[error("No value given for required field {0}")]
    MissingValue(String),
    #[error(transparent)]
    NotOwner(#[from] NotOwnerError),
    #[error("Applying migrations failed: {0}")]
    Migrate(#[from] MigrateError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DbError {
    /// Turns constraint violations into their domain meaning. `email` is the address that was
    /// being written, if any, and is reported back on a unique violation.
    fn from_write(error: sqlx::Error, email: Option<&str>) -> Self {
        if let Some(db_error) = error.as_database_error() {
            match (db_error.kind(), email) {
                (ErrorKind::UniqueViolation, Some(email))
                    if db_error.constraint() == Some(USERS_EMAIL_CONSTRAINT) =>
                {
                    return DbError::EmailTaken(email.to_owned());
                }
                (ErrorKind::ForeignKeyViolation, _) => {
                    let constraint = db_error.constraint().unwrap_or("unknown").to_owned();
                    return DbError::MissingReference(constraint);
                }
                (ErrorKind::NotNullViolation, _) => {
                    let column = db_error
                        .try_downcast_ref::<PgDatabaseError>()
                        .and_then(PgDatabaseError::column)
                        .unwrap_or("unknown")
                        .to_owned();
                    return DbError::MissingValue(column);
                }
                _ => {}
            }
        }

        DbError::Sqlx(error)
    }
}

/// Escapes `LIKE` wildcards so the word is matched literally, using `\` as the escape character.
fn escape_like(word: &str) -> String {
    let mut escaped = String::with_capacity(word.len());
    for c in word.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Clone, Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<UserProfile>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.id,
                users.name,
                users.email,
                users.role,
                users.created_at,
                users.updated_at
            FROM
                users
            WHERE
                users.id = $1
            ",
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(UserProfile::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.id,
                users.name,
                users.email,
                users.role,
                users.created_at,
                users.updated_at
            FROM
                users
            WHERE
                users.email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_password_digest(
        &self,
        user_id: Id<UserMarker>,
    ) -> Result<Option<PasswordDigest>> {
        let record = query_as::<_, PasswordDigestRecord>(
            "
            SELECT
                users.password_digest
            FROM
                users
            WHERE
                users.id = $1
            ",
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let digest = record.map(PasswordDigest::try_from).transpose()?;
        Ok(digest)
    }

    pub async fn create_user(
        &self,
        user: &ValidatedUser,
        digest: &PasswordDigest,
    ) -> Result<User> {
        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users (name, email, password_digest, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, role, created_at, updated_at
            ",
        )
        .bind(user.name())
        .bind(user.email())
        .bind(digest.as_encoded())
        .bind(user.role().as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| DbError::from_write(err, Some(user.email())))?;

        Ok(record.try_into()?)
    }

    /// Updates the user with the given id, keeping stored values for absent fields, or inserts
    /// it if there is none. Field contents are stored unchecked.
    pub async fn upsert_user(
        &self,
        user_id: Id<UserMarker>,
        user: &UpsertUser,
        digest: Option<&PasswordDigest>,
    ) -> Result<UpsertedUser> {
        let mut transaction = self.pool.begin().await?;

        let updated = query_as::<_, UpsertedUserRecord>(
            "
            UPDATE users
            SET
                name = COALESCE($2, users.name),
                email = COALESCE($3, users.email),
                password_digest = COALESCE($4, users.password_digest),
                role = COALESCE($5, users.role),
                updated_at = now()
            WHERE users.id = $1
            RETURNING id, name, email, role, created_at, updated_at, FALSE AS inserted
            ",
        )
        .bind(user_id.get())
        .bind(user.name.as_deref())
        .bind(user.email.as_deref())
        .bind(digest.map(PasswordDigest::as_encoded))
        .bind(user.role.map(Role::as_str))
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|err| DbError::from_write(err, user.email.as_deref()))?;

        let record = match updated {
            Some(record) => record,
            None => {
                let inserted = query_as::<_, UpsertedUserRecord>(
                    "
                    INSERT INTO users (id, name, email, password_digest, role)
                    VALUES ($1, $2, $3, $4, COALESCE($5, 'user'))
                    RETURNING id, name, email, role, created_at, updated_at, TRUE AS inserted
                    ",
                )
                .bind(user_id.get())
                .bind(user.name.as_deref())
                .bind(user.email.as_deref())
                .bind(digest.map(PasswordDigest::as_encoded))
                .bind(user.role.map(Role::as_str))
                .fetch_one(&mut *transaction)
                .await
                .map_err(|err| DbError::from_write(err, user.email.as_deref()))?;

                // Explicit ids bypass the identity sequence; move it past them.
                query(
                    "
                    SELECT setval(
                        pg_get_serial_sequence('users', 'id'),
                        GREATEST((SELECT MAX(users.id) FROM users), 1)
                    )
                    ",
                )
                .execute(&mut *transaction)
                .await?;

                inserted
            }
        };

        transaction.commit().await?;

        Ok(record.try_into()?)
    }

    pub async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let record = query_as::<_, PostRecord>(
            "
            INSERT INTO posts (title, content, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, content, user_id, created_at, updated_at, deleted_at
            ",
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.user_id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| DbError::from_write(err, None))?;

        Ok(record.into())
    }

    /// Looks up a post by id, including soft-deleted ones.
    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "
            SELECT
                posts.id,
                posts.title,
                posts.content,
                posts.user_id,
                posts.created_at,
                posts.updated_at,
                posts.deleted_at
            FROM
                posts
            WHERE
                posts.id = $1
            ",
        )
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Post::from))
    }

    /// Soft-deletes a live post owned by `requester`. Returns `None` if there is no live post
    /// with that id.
    pub async fn soft_delete_post(
        &self,
        post_id: Id<PostMarker>,
        requester: Id<UserMarker>,
    ) -> Result<Option<Post>> {
        let mut transaction = self.pool.begin().await?;

        let Some(record) = query_as::<_, PostRecord>(
            "
            SELECT
                posts.id,
                posts.title,
                posts.content,
                posts.user_id,
                posts.created_at,
                posts.updated_at,
                posts.deleted_at
            FROM
                posts
            WHERE
                posts.id = $1 AND posts.deleted_at IS NULL
            FOR UPDATE
            ",
        )
        .bind(post_id.get())
        .fetch_optional(&mut *transaction)
        .await?
        else {
            return Ok(None);
        };

        Post::from(record).ensure_owned_by(requester)?;

        let deleted = query_as::<_, PostRecord>(
            "
            UPDATE posts
            SET deleted_at = now()
            WHERE posts.id = $1
            RETURNING id, title, content, user_id, created_at, updated_at, deleted_at
            ",
        )
        .bind(post_id.get())
        .fetch_one(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(Some(deleted.into()))
    }

    /// Posts and their comments are read from one snapshot.
    pub async fn fetch_post_details(&self) -> Result<Vec<PostDetails>> {
        let mut transaction = self.pool.begin().await?;
        query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *transaction)
            .await?;

        let posts = query_as::<_, PostWithAuthorRecord>(
            "
            SELECT
                posts.id AS post_id,
                posts.title,
                users.id AS user_id,
                users.name AS user_name
            FROM
                posts JOIN users ON users.id = posts.user_id
            WHERE
                posts.deleted_at IS NULL
            ORDER BY
                posts.id
            ",
        )
        .fetch_all(&mut *transaction)
        .await?;

        let post_ids: Vec<i64> = posts.iter().map(|post| post.post_id).collect();
        let comments = query_as::<_, CommentSummaryRecord>(
            "
            SELECT
                comments.id,
                comments.post_id,
                comments.content
            FROM
                comments
            WHERE
                comments.post_id = ANY($1)
            ORDER BY
                comments.id
            ",
        )
        .bind(&post_ids)
        .fetch_all(&mut *transaction)
        .await?;

        transaction.commit().await?;

        let mut comments_by_post: HashMap<i64, Vec<CommentSummary>> = HashMap::new();
        for comment in comments {
            comments_by_post
                .entry(comment.post_id)
                .or_default()
                .push(comment.into());
        }

        let details = posts
            .into_iter()
            .map(|post| PostDetails {
                id: post.post_id.into(),
                title: post.title,
                user: UserSummary {
                    id: post.user_id.into(),
                    name: post.user_name,
                },
                comments: comments_by_post.remove(&post.post_id).unwrap_or_default(),
            })
            .collect();

        Ok(details)
    }

    pub async fn fetch_post_comment_counts(&self) -> Result<Vec<PostCommentCount>> {
        let records = query_as::<_, PostCommentCountRecord>(
            "
            SELECT
                posts.id,
                posts.title,
                COUNT(comments.id) AS comment_count
            FROM
                posts LEFT JOIN comments ON comments.post_id = posts.id
            WHERE
                posts.deleted_at IS NULL
            GROUP BY
                posts.id
            ORDER BY
                posts.id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(PostCommentCount::from).collect())
    }

    /// Creates all comments or none of them.
    pub async fn create_comments(&self, comments: &[CreateComment]) -> Result<Vec<Comment>> {
        let mut transaction = self.pool.begin().await?;

        let mut created = Vec::with_capacity(comments.len());
        for comment in comments {
            let record = query_as::<_, CommentRecord>(
                "
                INSERT INTO comments (content, post_id, user_id)
                VALUES ($1, $2, $3)
                RETURNING id, content, post_id, user_id, created_at, updated_at
                ",
            )
            .bind(&comment.content)
            .bind(comment.post_id.get())
            .bind(comment.user_id.get())
            .fetch_one(&mut *transaction)
            .await
            .map_err(|err| DbError::from_write(err, None))?;

            created.push(record.into());
        }

        transaction.commit().await?;

        Ok(created)
    }

    /// Replaces the content of a comment owned by `update.user_id`. Returns `None` if the
    /// comment does not exist.
    pub async fn update_comment(
        &self,
        comment_id: Id<CommentMarker>,
        update: &UpdateComment,
    ) -> Result<Option<Comment>> {
        let mut transaction = self.pool.begin().await?;

        let Some(record) = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.id,
                comments.content,
                comments.post_id,
                comments.user_id,
                comments.created_at,
                comments.updated_at
            FROM
                comments
            WHERE
                comments.id = $1
            FOR UPDATE
            ",
        )
        .bind(comment_id.get())
        .fetch_optional(&mut *transaction)
        .await?
        else {
            return Ok(None);
        };

        Comment::from(record).ensure_owned_by(update.user_id)?;

        let updated = query_as::<_, CommentRecord>(
            "
            UPDATE comments
            SET content = $2, updated_at = now()
            WHERE comments.id = $1
            RETURNING id, content, post_id, user_id, created_at, updated_at
            ",
        )
        .bind(comment_id.get())
        .bind(&update.content)
        .fetch_one(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(Some(updated.into()))
    }

    pub async fn find_or_create_comment(
        &self,
        comment: &CreateComment,
    ) -> Result<FoundOrCreatedComment> {
        let mut transaction = self.pool.begin().await?;

        let existing = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.id,
                comments.content,
                comments.post_id,
                comments.user_id,
                comments.created_at,
                comments.updated_at
            FROM
                comments
            WHERE
                comments.content = $1
                AND comments.post_id = $2
                AND comments.user_id = $3
            ORDER BY
                comments.id
            LIMIT 1
            ",
        )
        .bind(&comment.content)
        .bind(comment.post_id.get())
        .bind(comment.user_id.get())
        .fetch_optional(&mut *transaction)
        .await?;

        let (record, created) = match existing {
            Some(record) => (record, false),
            None => {
                let record = query_as::<_, CommentRecord>(
                    "
                    INSERT INTO comments (content, post_id, user_id)
                    VALUES ($1, $2, $3)
                    RETURNING id, content, post_id, user_id, created_at, updated_at
                    ",
                )
                .bind(&comment.content)
                .bind(comment.post_id.get())
                .bind(comment.user_id.get())
                .fetch_one(&mut *transaction)
                .await
                .map_err(|err| DbError::from_write(err, None))?;

                (record, true)
            }
        };

        transaction.commit().await?;

        Ok(FoundOrCreatedComment {
            comment: record.into(),
            created,
        })
    }

    /// Case-sensitive substring search over comment content.
    pub async fn search_comments(&self, word: &str) -> Result<CommentSearch> {
        let pattern = format!("%{}%", escape_like(word));

        let records = query_as::<_, CommentRecord>(
            r"
            SELECT
                comments.id,
                comments.content,
                comments.post_id,
                comments.user_id,
                comments.created_at,
                comments.updated_at
            FROM
                comments
            WHERE
                comments.content LIKE $1 ESCAPE '\'
            ORDER BY
                comments.id
            ",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        let rows: Vec<Comment> = records.into_iter().map(Comment::from).collect();
        Ok(rows.into())
    }

    pub async fn fetch_newest_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.id,
                comments.content,
                comments.post_id,
                comments.user_id,
                comments.created_at,
                comments.updated_at
            FROM
                comments
            WHERE
                comments.post_id = $1
            ORDER BY
                comments.created_at DESC,
                comments.id DESC
            LIMIT $2
            ",
        )
        .bind(post_id.get())
        .bind(NEWEST_COMMENTS_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Comment::from).collect())
    }

    pub async fn fetch_comment_details(
        &self,
        comment_id: Id<CommentMarker>,
    ) -> Result<Option<CommentDetails>> {
        let record = query_as::<_, CommentDetailsRecord>(
            "
            SELECT
                comments.id,
                comments.content,
                comments.post_id,
                comments.user_id,
                comments.created_at,
                comments.updated_at,
                users.name AS user_name,
                users.email AS user_email,
                users.created_at AS user_created_at,
                users.updated_at AS user_updated_at,
                posts.title AS post_title,
                posts.content AS post_content,
                posts.user_id AS post_user_id,
                posts.created_at AS post_created_at,
                posts.updated_at AS post_updated_at,
                posts.deleted_at AS post_deleted_at
            FROM
                comments
                JOIN users ON users.id = comments.user_id
                JOIN posts ON posts.id = comments.post_id
            WHERE
                comments.id = $1
            ",
        )
        .bind(comment_id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(CommentDetails::from))
    }
}

#[cfg(test)]
mod tests {
    use crate::client::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("xyz"), "xyz");
        assert_eq!(escape_like("100%"), r"100\%");
        assert_eq!(escape_like("snake_case"), r"snake\_case");
        assert_eq!(escape_like(r"C:\path"), r"C:\\path");
        assert_eq!(escape_like(""), "");
    }
}
