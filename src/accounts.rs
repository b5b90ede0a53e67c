use crate::clock::Clock;
use crate::errors::AccountError;
use crate::manager::validate_goal;
use crate::models::{
    DEFAULT_CALORIE_GOAL, Ledger, RegisterRequest, RegisterResponse, TokenResponse, User, UserId,
    UserProfile,
};
use crate::storage::{Store, bounded};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Registers users and issues the opaque bearer tokens bound to them.
pub struct AccountService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, store_timeout: Duration) -> Self {
        Self {
            store,
            clock,
            store_timeout,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<RegisterResponse, AccountError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AccountError::Validation("name must not be empty".into()));
        }
        let email = normalize_email(&request.email)?;
        let calorie_goal = match request.calorie_goal {
            Some(goal) => validate_goal(goal).map_err(|err| AccountError::Validation(err.to_string()))?,
            None => DEFAULT_CALORIE_GOAL,
        };

        let user = User {
            id: UserId::new(),
            name: name.to_string(),
            email: email.clone(),
            calorie_goal,
            daily_calories: Ledger::new(self.clock.today()),
            created_at: Utc::now(),
        };
        let token = Uuid::new_v4().simple().to_string();

        if !bounded(self.store_timeout, self.store.insert_user(&user, &token)).await? {
            return Err(AccountError::EmailTaken(email));
        }
        info!(user_id = %user.id, calorie_goal, "registered user");

        Ok(RegisterResponse {
            token,
            user: UserProfile::from(&user),
        })
    }

    pub async fn resolve_token(&self, token: &str) -> Result<Option<UserId>, AccountError> {
        Ok(bounded(self.store_timeout, self.store.resolve_token(token)).await?)
    }

    /// Swaps `token` for a fresh one; the old token stops resolving.
    pub async fn refresh_token(&self, token: &str) -> Result<TokenResponse, AccountError> {
        let fresh = Uuid::new_v4().simple().to_string();
        if !bounded(self.store_timeout, self.store.rotate_token(token, &fresh)).await? {
            return Err(AccountError::InvalidToken);
        }
        info!("rotated bearer token");
        Ok(TokenResponse {
            success: true,
            token: fresh,
        })
    }

    pub async fn profile(&self, user_id: UserId) -> Result<UserProfile, AccountError> {
        bounded(self.store_timeout, self.store.load_user(user_id))
            .await?
            .map(|record| UserProfile::from(&record.user))
            .ok_or_else(|| AccountError::NotFound(user_id.to_string()))
    }

    pub async fn profile_by_email(&self, email: &str) -> Result<UserProfile, AccountError> {
        let email = email.trim().to_lowercase();
        bounded(self.store_timeout, self.store.find_user_by_email(&email))
            .await?
            .map(|record| UserProfile::from(&record.user))
            .ok_or(AccountError::NotFound(email))
    }
}

fn normalize_email(raw: &str) -> Result<String, AccountError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email)
        }
        _ => Err(AccountError::Validation(format!("'{}' is not a valid email", raw.trim()))),
    }
}
