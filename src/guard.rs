use sea_orm::DatabaseConnection;

use crate::auth::Principal;
use crate::errors::EsdrError;
use crate::storage::{self, Owner, OwnerKind};

/// Owner-level access decision. Key-level visibility across clients is the
/// store's business, not the guard's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerAccess {
    Allowed,
    Forbidden,
}

/// Checks that the principal's user owns the target. Feeds resolve to their
/// owning user; a feed that does not exist is treated like a foreign one.
pub async fn check_owner(
    db: &DatabaseConnection,
    principal: Principal,
    owner: Owner,
) -> Result<OwnerAccess, EsdrError> {
    match owner.kind {
        OwnerKind::User => {
            if owner.id == principal.user_id {
                Ok(OwnerAccess::Allowed)
            } else {
                Ok(OwnerAccess::Forbidden)
            }
        }
        OwnerKind::Feed => match storage::get_feed(db, owner.id).await? {
            Some(feed) if feed.user_id == principal.user_id => Ok(OwnerAccess::Allowed),
            _ => Ok(OwnerAccess::Forbidden),
        },
    }
}
