use crate::server::ServerRouter;

mod comments;
mod posts;
mod users;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(users::routes())
        .merge(posts::routes())
        .merge(comments::routes())
}

// Runs against a real Postgres: `DATABASE_URL=postgres://… cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use crate::server::testing::{app, send};
    use axum::{
        Router,
        http::{Method, StatusCode},
    };
    use serde_json::{Value, json};
    use sqlx::PgPool;

    async fn signup(app: &Router, name: &str, email: &str) -> i64 {
        let (status, body) = send(
            app,
            Method::POST,
            "/users/signup",
            Some(json!({ "name": name, "email": email, "password": "longenough" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        body["id"].as_i64().unwrap()
    }

    async fn create_post(app: &Router, user_id: i64) -> i64 {
        let (status, body) = send(
            app,
            Method::POST,
            "/posts",
            Some(json!({ "title": "Hello", "content": "World", "userId": user_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        body["id"].as_i64().unwrap()
    }

    #[sqlx::test(migrator = "blogboard_db::MIGRATOR")]
    #[ignore = "requires DATABASE_URL"]
    async fn signup_reports_taken_email_before_validation(pool: PgPool) {
        let app = app(pool);
        signup(&app, "Ally", "a@a.com").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/users/signup",
            Some(json!({ "name": "Al", "email": "a@a.com", "password": "short" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "status": 400, "message": "Email already exists" }));

        let (status, body) = send(
            &app,
            Method::POST,
            "/users/signup",
            Some(json!({ "name": "Al", "email": "nope", "password": "short" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert_eq!(
            body["error"],
            "Validation error: Validation isEmail on email failed"
        );
    }

    #[sqlx::test(migrator = "blogboard_db::MIGRATOR")]
    #[ignore = "requires DATABASE_URL"]
    async fn user_lookups(pool: PgPool) {
        let app = app(pool);
        let id = signup(&app, "Ally", "a@a.com").await;

        let (status, body) = send(&app, Method::GET, "/users/by-email?email=a@a.com", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id);
        assert_eq!(body["role"], "user");

        let (status, body) = send(&app, Method::GET, "/users/by-email?email=b@b.com", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Null);

        let (status, body) = send(&app, Method::GET, &format!("/users/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Ally");
        assert!(body.get("role").is_none());

        let (status, _) = send(&app, Method::GET, "/users/9999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrator = "blogboard_db::MIGRATOR")]
    #[ignore = "requires DATABASE_URL"]
    async fn upsert_accepts_partial_payloads(pool: PgPool) {
        let app = app(pool);
        let id = signup(&app, "Ally", "a@a.com").await;

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/users/{id}"),
            Some(json!({ "name": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["created"], false);
        assert_eq!(body["user"]["name"], "x");
        assert_eq!(body["user"]["email"], "a@a.com");

        let (status, body) =
            send(&app, Method::PUT, "/users/77", Some(json!({ "name": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "status": 400, "error": "No value given for required field email" })
        );
    }

    #[sqlx::test(migrator = "blogboard_db::MIGRATOR")]
    #[ignore = "requires DATABASE_URL"]
    async fn post_listings_are_routed_ahead_of_ids(pool: PgPool) {
        let app = app(pool);
        let author = signup(&app, "Author", "author@example.com").await;
        let post_id = create_post(&app, author).await;

        let (status, body) = send(&app, Method::GET, "/posts/details", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{
                "id": post_id,
                "title": "Hello",
                "user": { "id": author, "name": "Author" },
                "comments": [],
            }])
        );

        let (status, body) = send(&app, Method::GET, "/posts/comment-count", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{ "id": post_id, "title": "Hello", "commentCount": 0 }])
        );
    }

    #[sqlx::test(migrator = "blogboard_db::MIGRATOR")]
    #[ignore = "requires DATABASE_URL"]
    async fn post_deletion_checks_owner_and_existence(pool: PgPool) {
        let app = app(pool);
        let owner = signup(&app, "Owner", "owner@example.com").await;
        let intruder = signup(&app, "Intruder", "intruder@example.com").await;
        let post_id = create_post(&app, owner).await;
        let uri = format!("/posts/{post_id}");

        let (status, body) =
            send(&app, Method::DELETE, &uri, Some(json!({ "userId": intruder }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["status"], 403);
        assert!(body["message"].is_string());

        let (status, _) =
            send(&app, Method::DELETE, "/posts/9999", Some(json!({ "userId": owner }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) =
            send(&app, Method::DELETE, &uri, Some(json!({ "userId": owner }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Post deleted" }));

        let (status, _) =
            send(&app, Method::DELETE, &uri, Some(json!({ "userId": owner }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["deletedAt"].is_string());
    }

    #[sqlx::test(migrator = "blogboard_db::MIGRATOR")]
    #[ignore = "requires DATABASE_URL"]
    async fn comment_update_checks_owner_and_existence(pool: PgPool) {
        let app = app(pool);
        let author = signup(&app, "Author", "author@example.com").await;
        let intruder = signup(&app, "Intruder", "intruder@example.com").await;
        let post_id = create_post(&app, author).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/comments",
            Some(json!([{ "content": "first", "postId": post_id, "userId": author }])),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let uri = format!("/comments/{}", body[0]["id"]);

        let (status, body) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(json!({ "userId": intruder, "content": "hijacked" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["message"].is_string());

        let (status, _) = send(
            &app,
            Method::PATCH,
            "/comments/9999",
            Some(json!({ "userId": author, "content": "edited" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(json!({ "userId": author, "content": "edited" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], "edited");
    }
}
