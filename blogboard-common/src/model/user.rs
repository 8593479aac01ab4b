use crate::model::Id;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;
use time::OffsetDateTime;
use validator::ValidateEmail;

/// Names must be longer than two characters.
pub const USER_NAME_MIN_LEN: usize = 3;
/// Passwords must be longer than six characters.
pub const PASSWORD_MIN_LEN: usize = 7;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown user role: {0}")]
pub struct InvalidRoleError(String);

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = InvalidRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(InvalidRoleError(other.to_owned())),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id<UserMarker>,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A user as returned by id lookups and embedded in comment details: never carries the role.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Id<UserMarker>,
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Id<UserMarker>,
    pub name: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct UpsertedUser {
    pub user: User,
    pub created: bool,
}

/// Signup payload. Has to pass [`NewUser::validate`] before it can be stored.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Upsert payload. Stored as given, without any field validation. Absent fields keep their
/// stored value when the user already exists.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct UpsertUser {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum UserValidationError {
    #[error("Validation error: Validation isEmail on email failed")]
    InvalidEmail,
    #[error("Validation error: Password must be more than 6 characters")]
    PasswordTooShort,
    #[error("Name must be longer than 2 characters")]
    NameTooShort,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ValidatedUser {
    name: String,
    email: String,
    password: String,
    role: Role,
}

impl NewUser {
    /// Field checks run before the name check, so a payload breaking several rules reports the
    /// email first, then the password.
    pub fn validate(self) -> Result<ValidatedUser, UserValidationError> {
        if !is_valid_email(&self.email) {
            return Err(UserValidationError::InvalidEmail);
        }
        if self.password.chars().count() < PASSWORD_MIN_LEN {
            return Err(UserValidationError::PasswordTooShort);
        }
        if self.name.chars().count() < USER_NAME_MIN_LEN {
            return Err(UserValidationError::NameTooShort);
        }

        Ok(ValidatedUser {
            name: self.name,
            email: self.email,
            password: self.password,
            role: self.role.unwrap_or_default(),
        })
    }
}

impl ValidatedUser {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }
}

/// Address syntax as checked by `validator`, plus a top-level domain: at least two letters, or
/// a punycode `xn--` label.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if !email.validate_email() {
        return false;
    }

    let top_level_domain = email
        .rsplit_once('@')
        .and_then(|(_, domain)| domain.rsplit_once('.'))
        .map(|(_, label)| label);

    top_level_domain.is_some_and(|label| {
        label.chars().count() >= 2
            && (label.chars().all(char::is_alphabetic)
                || label.to_ascii_lowercase().starts_with("xn--"))
    })
}
