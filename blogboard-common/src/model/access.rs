use crate::model::{Id, user::UserMarker};
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error("User {requester} is not allowed to modify {resource} {resource_id}")]
pub struct NotOwnerError {
    pub resource: &'static str,
    pub resource_id: i64,
    pub requester: Id<UserMarker>,
}

/// A resource that only its owning user may mutate.
pub trait Owned {
    const RESOURCE: &'static str;

    fn resource_id(&self) -> i64;

    fn owner(&self) -> Id<UserMarker>;

    fn ensure_owned_by(&self, requester: Id<UserMarker>) -> Result<(), NotOwnerError> {
        if self.owner() == requester {
            Ok(())
        } else {
            Err(NotOwnerError {
                resource: Self::RESOURCE,
                resource_id: self.resource_id(),
                requester,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        Id,
        access::{NotOwnerError, Owned},
        user::UserMarker,
    };

    struct Note {
        id: i64,
        author: Id<UserMarker>,
    }

    impl Owned for Note {
        const RESOURCE: &'static str = "note";

        fn resource_id(&self) -> i64 {
            self.id
        }

        fn owner(&self) -> Id<UserMarker> {
            self.author
        }
    }

    #[test]
    fn owner_passes() {
        let note = Note {
            id: 7,
            author: Id::new(1),
        };

        assert_eq!(note.ensure_owned_by(Id::new(1)), Ok(()));
    }

    #[test]
    fn anyone_else_is_refused() {
        let note = Note {
            id: 7,
            author: Id::new(1),
        };

        let error = note.ensure_owned_by(Id::new(2)).unwrap_err();
        assert_eq!(
            error,
            NotOwnerError {
                resource: "note",
                resource_id: 7,
                requester: Id::new(2),
            }
        );
        assert_eq!(error.to_string(), "User 2 is not allowed to modify note 7");
    }
}
