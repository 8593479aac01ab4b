use crate::server::{Result, ServerError, ServerRouter, json::Json, query::Query};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use blogboard_common::model::{
    Id,
    comment::{
        Comment, CommentDetails, CommentMarker, CommentSearch, CreateComment,
        FoundOrCreatedComment, UpdateComment,
    },
    post::PostMarker,
};
use blogboard_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_comments)
        .typed_post(find_or_create_comment)
        .typed_get(search_comments)
        .typed_get(get_newest_comments)
        .typed_get(get_comment_details)
        .typed_patch(update_comment)
}

#[derive(TypedPath)]
#[typed_path("/comments")]
struct CommentsPath;

async fn create_comments(
    _: CommentsPath,
    State(db): State<Arc<DbClient>>,
    Json(comments): Json<Vec<CreateComment>>,
) -> Result<Json<Vec<Comment>>> {
    let comments = db.create_comments(&comments).await?;

    info!(count = comments.len(), "Created comments");
    Ok(Json(comments))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{comment_id}", rejection(ServerError))]
struct CommentPath {
    comment_id: Id<CommentMarker>,
}

async fn update_comment(
    CommentPath { comment_id }: CommentPath,
    State(db): State<Arc<DbClient>>,
    Json(update): Json<UpdateComment>,
) -> Result<Json<Comment>> {
    let comment = db
        .update_comment(comment_id, &update)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(comment_id))?;

    info!(%comment_id, user_id = %update.user_id, "Updated comment");
    Ok(Json(comment))
}

#[derive(TypedPath)]
#[typed_path("/comments/find-or-create")]
struct FindOrCreateCommentPath;

async fn find_or_create_comment(
    _: FindOrCreateCommentPath,
    State(db): State<Arc<DbClient>>,
    Json(comment): Json<CreateComment>,
) -> Result<Json<FoundOrCreatedComment>> {
    let found = db.find_or_create_comment(&comment).await?;

    Ok(Json(found))
}

#[derive(TypedPath)]
#[typed_path("/comments/search")]
struct SearchCommentsPath;

#[derive(Deserialize)]
struct SearchCommentsQuery {
    word: String,
}

async fn search_comments(
    _: SearchCommentsPath,
    State(db): State<Arc<DbClient>>,
    Query(SearchCommentsQuery { word }): Query<SearchCommentsQuery>,
) -> Result<Json<CommentSearch>> {
    let search = db.search_comments(&word).await?;

    Ok(Json(search))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/newest/{post_id}", rejection(ServerError))]
struct NewestCommentsPath {
    post_id: Id<PostMarker>,
}

async fn get_newest_comments(
    NewestCommentsPath { post_id }: NewestCommentsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Comment>>> {
    let comments = db.fetch_newest_comments(post_id).await?;

    Ok(Json(comments))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/details/{id}", rejection(ServerError))]
struct CommentDetailsPath {
    id: Id<CommentMarker>,
}

async fn get_comment_details(
    CommentDetailsPath { id }: CommentDetailsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<CommentDetails>> {
    let details = db
        .fetch_comment_details(id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    Ok(Json(details))
}
