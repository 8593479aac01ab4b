use crate::server::{Result, ServerError, ServerRouter, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use blogboard_common::model::{
    Id,
    post::{CreatePost, DeletePost, Post, PostCommentCount, PostDeleted, PostDetails, PostMarker},
};
use blogboard_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_post)
        .typed_get(get_post_details)
        .typed_get(get_post_comment_counts)
        .typed_get(get_post)
        .typed_delete(delete_post)
}

#[derive(TypedPath)]
#[typed_path("/posts")]
struct PostsPath;

async fn create_post(
    _: PostsPath,
    State(db): State<Arc<DbClient>>,
    Json(post): Json<CreatePost>,
) -> Result<Json<Post>> {
    let post = db.create_post(&post).await?;

    Ok(Json(post))
}

#[derive(TypedPath)]
#[typed_path("/posts/details")]
struct PostDetailsPath;

async fn get_post_details(
    _: PostDetailsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<PostDetails>>> {
    let posts = db.fetch_post_details().await?;

    Ok(Json(posts))
}

#[derive(TypedPath)]
#[typed_path("/posts/comment-count")]
struct PostCommentCountPath;

async fn get_post_comment_counts(
    _: PostCommentCountPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<PostCommentCount>>> {
    let counts = db.fetch_post_comment_counts().await?;

    Ok(Json(counts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}", rejection(ServerError))]
struct PostPath {
    post_id: Id<PostMarker>,
}

/// Direct lookup; also finds soft-deleted posts.
async fn get_post(
    PostPath { post_id }: PostPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(post_id))?;

    Ok(Json(post))
}

async fn delete_post(
    PostPath { post_id }: PostPath,
    State(db): State<Arc<DbClient>>,
    Json(DeletePost { user_id }): Json<DeletePost>,
) -> Result<Json<PostDeleted>> {
    db.soft_delete_post(post_id, user_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(post_id))?;

    info!(%post_id, %user_id, "Soft-deleted post");
    Ok(Json(PostDeleted {
        message: "Post deleted".to_owned(),
    }))
}
