//! Role hierarchy and resource ownership checks
//!
//! Authorization is a pure decision: a [`Policy`] value is evaluated against
//! the authenticated identity and a [`Resource`] the route has already
//! resolved. Nothing here touches storage.
//!
//! # Permission Model
//!
//! 1. **Role hierarchy**: `user (1) < organizer (2) < admin (3)`. A role
//!    satisfies every requirement at or below its level. Unknown role
//!    strings satisfy nothing.
//! 2. **Path ownership**: the caller's ID equals the ID in the path
//!    (e.g. `PUT /users/:id`).
//! 3. **Entity ownership**: the caller's ID equals an owner field on a stored
//!    entity (an event's organizer, a payment's buyer).
//!
//! # Example
//!
//! ```
//! use tickr_shared::auth::authorization::{Policy, Resource};
//! use tickr_shared::auth::middleware::AuthContext;
//! use tickr_shared::models::Role;
//! use uuid::Uuid;
//!
//! let caller = AuthContext {
//!     user_id: Uuid::new_v4(),
//!     email: "ada@example.com".to_string(),
//!     role: "user".to_string(),
//! };
//!
//! // Users may edit themselves...
//! let own = Resource::Path(caller.user_id);
//! assert!(Policy::OwnerOrRole(Role::Admin).authorize(&caller, &own).is_ok());
//!
//! // ...but not anyone else.
//! let other = Resource::Path(Uuid::new_v4());
//! assert!(Policy::OwnerOrRole(Role::Admin).authorize(&caller, &other).is_err());
//! ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::Role;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Identity is known but not allowed
    #[error("Insufficient permissions")]
    Forbidden,

    /// The entity whose ownership gates access does not exist
    #[error("Resource not found")]
    ResourceNotFound,
}

/// Checks whether `actual` meets or exceeds `required` in the role hierarchy
///
/// Fails closed: if either string is not a known role the answer is `false`.
///
/// # Example
///
/// ```
/// use tickr_shared::auth::authorization::has_role;
///
/// assert!(has_role("admin", "user"));
/// assert!(has_role("organizer", "organizer"));
/// assert!(!has_role("user", "admin"));
/// assert!(!has_role("bogus", "user"));
/// ```
pub fn has_role(actual: &str, required: &str) -> bool {
    match (actual.parse::<Role>(), required.parse::<Role>()) {
        (Ok(actual), Ok(required)) => actual.satisfies(required),
        _ => false,
    }
}

/// What the request targets, as resolved by the route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// No particular resource
    None,

    /// A user ID taken from the request path
    Path(Uuid),

    /// The owner of a stored entity, or `None` if the entity was not found
    Entity(Option<Uuid>),
}

/// Access rule attached to a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    /// Any authenticated caller
    Authenticated,

    /// Caller's role must meet the given level
    Role(Role),

    /// Caller's role must meet at least one of the given levels
    AnyRole(Vec<Role>),

    /// Caller holds the role, or owns the user ID in the path
    OwnerOrRole(Role),

    /// Caller holds the role, or owns the stored entity
    EntityOwnerOrRole(Role),
}

impl Policy {
    /// Evaluates the policy
    ///
    /// # Errors
    ///
    /// - `AuthzError::ResourceNotFound` if an entity-ownership policy is
    ///   evaluated against a missing entity (checked before roles)
    /// - `AuthzError::Forbidden` if no rule grants access
    pub fn authorize(&self, identity: &AuthContext, resource: &Resource) -> Result<(), AuthzError> {
        let granted = match self {
            Policy::Authenticated => true,
            Policy::Role(required) => has_role(&identity.role, required.as_str()),
            Policy::AnyRole(roles) => roles
                .iter()
                .any(|required| has_role(&identity.role, required.as_str())),
            Policy::OwnerOrRole(required) => {
                has_role(&identity.role, required.as_str())
                    || matches!(resource, Resource::Path(id) if *id == identity.user_id)
            }
            Policy::EntityOwnerOrRole(required) => match resource {
                Resource::Entity(None) => return Err(AuthzError::ResourceNotFound),
                Resource::Entity(Some(owner_id)) => {
                    has_role(&identity.role, required.as_str()) || *owner_id == identity.user_id
                }
                _ => false,
            },
        };

        if granted {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %identity.user_id,
                role = %identity.role,
                policy = ?self,
                "Authorization denied"
            );
            Err(AuthzError::Forbidden)
        }
    }
}
