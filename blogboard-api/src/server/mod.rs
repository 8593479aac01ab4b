use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use blogboard_common::model::{
    Id,
    comment::CommentMarker,
    password::PasswordHashError,
    post::PostMarker,
    user::{UserMarker, UserValidationError},
};
use blogboard_db::client::{DbClient, DbError};
use json::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, warn};

mod json;
mod query;
mod routes;
#[cfg(test)]
mod testing;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

/// Gives the bare timeout response from the timeout layer the usual error body.
pub async fn timeout_response(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        ServerError::RequestTimeout.into_response()
    } else {
        response
    }
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] UserValidationError),
    #[error("Email already exists")]
    EmailAlreadyExists,
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
    #[error("Blocking task failed: {0}")]
    BlockingTask(#[from] JoinError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("Comment with id {0} was not found.")]
    CommentByIdNotFound(Id<CommentMarker>),
    #[error("Request timed out")]
    RequestTimeout,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByIdNotFound(_)
            | ServerError::CommentByIdNotFound(_)
            | ServerError::Database(DbError::MissingReference(_)) => StatusCode::NOT_FOUND,
            ServerError::Database(DbError::NotOwner(_)) => StatusCode::FORBIDDEN,
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::Validation(_)
            | ServerError::EmailAlreadyExists
            | ServerError::Database(DbError::EmailTaken(_) | DbError::MissingValue(_)) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ServerError::JsonResponse(_)
            | ServerError::PasswordHash(_)
            | ServerError::BlockingTask(_)
            | ServerError::Database(
                DbError::Data(_) | DbError::Migrate(_) | DbError::Sqlx(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Refusals answer a well-formed request the server will not carry out. They are reported
    /// under `message`, every other failure under `error`.
    fn is_refusal(&self) -> bool {
        matches!(
            self,
            ServerError::UnknownRoute(_)
                | ServerError::PathRejection(_)
                | ServerError::PostByIdNotFound(_)
                | ServerError::UserByIdNotFound(_)
                | ServerError::CommentByIdNotFound(_)
                | ServerError::EmailAlreadyExists
                | ServerError::Database(
                    DbError::MissingReference(_) | DbError::NotOwner(_) | DbError::EmailTaken(_)
                )
        )
    }

    fn error_response(&self) -> ErrorResponse {
        let status = self.status();

        let text = if status.is_server_error() {
            "Internal server error".to_owned()
        } else {
            self.to_string()
        };
        let body = if self.is_refusal() {
            ErrorBody::Message(text)
        } else {
            ErrorBody::Error(text)
        };

        ErrorResponse {
            status: status.as_u16(),
            body,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ErrorBody {
    Message(String),
    Error(String),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
    #[serde(flatten)]
    body: ErrorBody,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
        } else {
            warn!(error = %self, %status, "Rejecting request");
        }

        (status, Json(self.error_response())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::server::{
        ServerError,
        testing::{app, send},
        timeout_response,
    };
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
        response::IntoResponse,
    };
    use blogboard_common::model::{Id, access::NotOwnerError, user::UserValidationError};
    use blogboard_db::client::DbError;
    use serde_json::{Value, json};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    /// These requests are all rejected before a handler reaches the database, so the pool
    /// never connects.
    fn offline_app() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://blogboard@localhost/blogboard")
            .unwrap();

        app(pool)
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, body) = send(&offline_app(), Method::GET, "/nowhere", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({ "status": 404, "message": "Unknown route requested: /nowhere" })
        );
    }

    #[tokio::test]
    async fn non_numeric_id_is_not_found() {
        let (status, body) = send(&offline_app(), Method::GET, "/users/abc", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn malformed_signup_body_is_bad_request() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/users/signup")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{"))
            .unwrap();
        let response = offline_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], 400);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("Incoming JSON rejected")
        );
    }

    #[tokio::test]
    async fn delete_without_requester_is_bad_request() {
        let (status, _) = send(&offline_app(), Method::DELETE, "/posts/1", Some(json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bulk_create_expects_an_array() {
        let (status, _) = send(
            &offline_app(),
            Method::POST,
            "/comments",
            Some(json!({ "content": "hi", "postId": 1, "userId": 1 })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn search_requires_a_word() {
        let (status, body) = send(&offline_app(), Method::GET, "/comments/search", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("Query string rejected")
        );
    }

    #[tokio::test]
    async fn timed_out_requests_get_an_error_body() {
        let response = timeout_response(StatusCode::REQUEST_TIMEOUT.into_response()).await;

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "status": 408, "error": "Request timed out" }));
    }

    #[tokio::test]
    async fn other_responses_pass_the_timeout_mapping_untouched() {
        let response = timeout_response(StatusCode::NO_CONTENT.into_response()).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let error = ServerError::from(UserValidationError::PasswordTooShort);

        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            serde_json::to_value(error.error_response()).unwrap(),
            json!({
                "status": 400,
                "error": "Validation error: Password must be more than 6 characters",
            })
        );
    }

    #[test]
    fn duplicate_email_is_a_bad_request_message() {
        for error in [
            ServerError::EmailAlreadyExists,
            ServerError::Database(DbError::EmailTaken("a@a.com".to_owned())),
        ] {
            assert_eq!(error.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                serde_json::to_value(error.error_response()).unwrap(),
                json!({ "status": 400, "message": "Email already exists" })
            );
        }
    }

    #[test]
    fn missing_upsert_value_is_a_bad_request() {
        let error = ServerError::Database(DbError::MissingValue("email".to_owned()));

        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            serde_json::to_value(error.error_response()).unwrap(),
            json!({ "status": 400, "error": "No value given for required field email" })
        );
    }

    #[test]
    fn ownership_mismatch_is_forbidden() {
        let error = ServerError::Database(DbError::NotOwner(NotOwnerError {
            resource: "post",
            resource_id: 3,
            requester: Id::new(2),
        }));

        assert_eq!(error.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            serde_json::to_value(error.error_response()).unwrap(),
            json!({ "status": 403, "message": "User 2 is not allowed to modify post 3" })
        );
    }

    #[test]
    fn missing_records_are_not_found() {
        assert_eq!(
            ServerError::PostByIdNotFound(Id::new(1)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::Database(DbError::MissingReference("posts_user_id_fkey".to_owned()))
                .status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn internal_errors_are_redacted() {
        let error = ServerError::Database(DbError::Sqlx(sqlx::Error::PoolTimedOut));

        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            serde_json::to_value(error.error_response()).unwrap(),
            json!({ "status": 500, "error": "Internal server error" })
        );
    }
}
