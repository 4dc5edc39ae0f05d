//! Route handlers, one module per resource.

pub mod carts;
pub mod health;
pub mod merchants;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod users;

use storage::{User, UserStore};

use crate::error::ApiError;

/// Resolves a user account string to a user row.
///
/// An empty account is a caller error; an unknown account is a 404.
pub(crate) async fn resolve_user<S: UserStore>(store: &S, account: &str) -> Result<User, ApiError> {
    if account.trim().is_empty() {
        return Err(ApiError::BadRequest("user account is required".to_string()));
    }
    store
        .get_user_by_account(account)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {account} not found")))
}
