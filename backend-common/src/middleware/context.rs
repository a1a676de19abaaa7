//! Request-scoped user identity.
//!
//! Authentication middleware stores the caller with [`insert_user`]; the
//! request logger and handlers read it back from the request extensions.

use http::Extensions;
use thiserror::Error;

/// Authenticated caller of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUser {
    /// User identifier
    pub user_id: String,
    /// Organization (site) identifier
    pub org_id: String,
    /// Whether the user administers the organization
    pub admin: bool,
}

/// Errors reading the request user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// No user was stored for this request
    #[error("user is not stored in request context")]
    NoUser,

    /// The user id is empty
    #[error("user id is not stored in request context")]
    MissingUserId,

    /// The org id is empty
    #[error("org id is not stored in request context")]
    MissingOrgId,
}

/// Store the request user, replacing any previous one.
pub fn insert_user(
    extensions: &mut Extensions,
    user_id: impl Into<String>,
    org_id: impl Into<String>,
    admin: bool,
) {
    extensions.insert(RequestUser {
        user_id: user_id.into(),
        org_id: org_id.into(),
        admin,
    });
}

/// The stored user's id.
///
/// # Errors
///
/// Returns an error if no user is stored or its id is empty.
pub fn user_id_from_extensions(extensions: &Extensions) -> Result<&str, ContextError> {
    let user = extensions
        .get::<RequestUser>()
        .ok_or(ContextError::NoUser)?;
    if user.user_id.is_empty() {
        return Err(ContextError::MissingUserId);
    }
    Ok(&user.user_id)
}

/// The stored user's org id.
///
/// # Errors
///
/// Returns an error if no user is stored or its org id is empty.
pub fn org_id_from_extensions(extensions: &Extensions) -> Result<&str, ContextError> {
    let user = extensions
        .get::<RequestUser>()
        .ok_or(ContextError::NoUser)?;
    if user.org_id.is_empty() {
        return Err(ContextError::MissingOrgId);
    }
    Ok(&user.org_id)
}

/// Whether the stored user is an admin; false when no user is stored.
#[must_use]
pub fn is_admin_from_extensions(extensions: &Extensions) -> bool {
    extensions
        .get::<RequestUser>()
        .is_some_and(|user| user.admin)
}
