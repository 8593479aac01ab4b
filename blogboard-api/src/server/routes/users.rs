use crate::server::{Result, ServerError, ServerRouter, json::Json, query::Query};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use blogboard_common::model::{
    Id,
    password::PasswordDigest,
    user::{NewUser, UpsertUser, UpsertedUser, User, UserMarker, UserProfile},
};
use blogboard_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(signup)
        .typed_get(get_user_by_email)
        .typed_get(get_user)
        .typed_put(upsert_user)
}

/// Argon2 is deliberately slow, so it runs off the async workers.
async fn hash_password(password: String) -> Result<PasswordDigest> {
    let digest = tokio::task::spawn_blocking(move || PasswordDigest::hash(&password)).await??;

    Ok(digest)
}

#[derive(TypedPath)]
#[typed_path("/users/signup")]
struct SignupPath;

async fn signup(
    _: SignupPath,
    State(db): State<Arc<DbClient>>,
    Json(user): Json<NewUser>,
) -> Result<Json<User>> {
    if db.fetch_user_by_email(&user.email).await?.is_some() {
        return Err(ServerError::EmailAlreadyExists);
    }

    let user = user.validate()?;
    let digest = hash_password(user.password().to_owned()).await?;
    let user = db.create_user(&user, &digest).await?;

    info!(user_id = %user.id, "Signed up user");
    Ok(Json(user))
}

#[derive(TypedPath)]
#[typed_path("/users/by-email")]
struct UserByEmailPath;

#[derive(Deserialize)]
struct UserByEmailQuery {
    email: String,
}

async fn get_user_by_email(
    _: UserByEmailPath,
    State(db): State<Arc<DbClient>>,
    Query(UserByEmailQuery { email }): Query<UserByEmailQuery>,
) -> Result<Json<Option<User>>> {
    let user = db.fetch_user_by_email(&email).await?;

    Ok(Json(user))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}", rejection(ServerError))]
struct UserPath {
    id: Id<UserMarker>,
}

async fn get_user(
    UserPath { id }: UserPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<UserProfile>> {
    let user = db
        .fetch_user(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(user))
}

async fn upsert_user(
    UserPath { id }: UserPath,
    State(db): State<Arc<DbClient>>,
    Json(user): Json<UpsertUser>,
) -> Result<Json<UpsertedUser>> {
    let digest = match user.password.clone() {
        Some(password) => Some(hash_password(password).await?),
        None => None,
    };
    let upserted = db.upsert_user(id, &user, digest.as_ref()).await?;

    info!(user_id = %id, created = upserted.created, "Upserted user without validation");
    Ok(Json(upserted))
}
