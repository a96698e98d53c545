use chrono::Utc;
use tracing::info;

use super::{is_unique_violation, Database};
use crate::auth;
use crate::error::{ApiError, ApiResult};
use crate::models::Account;

const ACCOUNT_COLUMNS: &str =
    "id, account_id, password_hash, created_at, updated_at, deleted_at";

impl Database {
    /// Register an account. The password is stored as an argon2id hash,
    /// never in the clear. Fails with `AccountConflict` when the handle is
    /// already taken.
    pub async fn signup(&self, account_id: &str, password: &str) -> ApiResult<Account> {
        let password_hash = auth::hash_password(password)?;
        let now = Utc::now();

        let result = sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO account (account_id, password_hash, created_at, updated_at) \
             VALUES (?, ?, ?, ?) RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(account_id)
        .bind(&password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(account) => {
                info!("new account: account_id='{account_id}'");
                Ok(account)
            }
            Err(e) if is_unique_violation(&e) => Err(ApiError::AccountConflict),
            Err(e) => Err(e.into()),
        }
    }

    /// Authenticate against an existing, non-deleted account. Fails with
    /// `NotFound` when the handle is unknown and `InvalidCredentials` when
    /// the password does not match.
    pub async fn signin(&self, account_id: &str, password: &str) -> ApiResult<Account> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE account_id = ? AND deleted_at IS NULL"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

        auth::verify_password(password, &account.password_hash)?;
        Ok(account)
    }

    /// Lazy signup: sign in, creating the account first if the handle has
    /// never been seen. Only for low-stakes identification; operations that
    /// require proof of an existing identity must call [`Database::signin`]
    /// directly so they fail closed.
    pub async fn get_auth(&self, account_id: &str, password: &str) -> ApiResult<Account> {
        match self.signin(account_id, password).await {
            Ok(account) => Ok(account),
            Err(ApiError::NotFound) => {
                match self.signup(account_id, password).await {
                    // lost a signup race; the retried signin decides
                    Ok(_) | Err(ApiError::AccountConflict) => {}
                    Err(e) => return Err(e),
                }
                self.signin(account_id, password).await
            }
            Err(e) => Err(e),
        }
    }
}
