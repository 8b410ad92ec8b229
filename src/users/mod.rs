//! User record lifecycle.
//!
//! Records are created on first verified login and refreshed on every
//! subsequent one. Role assignment is the one asymmetry worth knowing about:
//! the bootstrap allowlist decides the role of a brand-new record, but an
//! existing record keeps its stored role across logins even if the allowlist
//! changed in between. Demotions therefore stick.

mod store;

pub use store::{SqliteUserStore, UserStore};

use std::sync::Arc;

use chrono::Utc;

use crate::authz::{resolve_role, AdminAllowlist, Role};
use crate::errors::AppError;
use crate::models::user::{User, UserStats};

#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn UserStore>,
    allowlist: AdminAllowlist,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn UserStore>, allowlist: AdminAllowlist) -> Self {
        Self { store, allowlist }
    }

    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    /// Effective role per the resolver rules (store first, allowlist
    /// fallback, `reader` default).
    pub async fn resolve_role(&self, email: Option<&str>) -> Role {
        resolve_role(self.store.as_ref(), &self.allowlist, email).await
    }

    /// Called once per verified authentication event.
    pub async fn upsert_on_login(
        &self,
        email: &str,
        name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<User, AppError> {
        let now = Utc::now();

        let user = match self.store.find_by_email(email).await? {
            Some(mut existing) => {
                // Profile refreshes on every login; role does not.
                existing.name = name.map(str::to_string);
                existing.avatar_url = avatar_url.map(str::to_string);
                existing.last_login = now;
                existing
            }
            None => {
                let role = if self.allowlist.is_member(email) {
                    Role::Admin
                } else {
                    Role::Reader
                };
                User {
                    email: email.to_string(),
                    name: name.map(str::to_string),
                    avatar_url: avatar_url.map(str::to_string),
                    role,
                    last_login: now,
                    created_at: now,
                }
            }
        };

        self.store.upsert(&user).await?;
        Ok(user)
    }

    /// Admin-only; the caller is responsible for gating.
    pub async fn update_role(&self, email: &str, role: Role) -> Result<User, AppError> {
        let mut user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::not_found("no user with that email"))?;

        user.role = role;
        self.store.upsert(&user).await?;
        Ok(user)
    }

    /// Admin-only; the caller is responsible for gating.
    pub async fn delete(&self, email: &str) -> Result<(), AppError> {
        if self.store.delete(email).await? {
            Ok(())
        } else {
            Err(AppError::not_found("no user with that email"))
        }
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        self.store.list_all().await
    }

    pub async fn stats(&self) -> Result<UserStats, AppError> {
        let users = self.store.list_all().await?;
        let mut stats = UserStats {
            total: users.len(),
            ..UserStats::default()
        };
        for user in &users {
            match user.role {
                Role::Admin => stats.admins += 1,
                Role::Writer => stats.writers += 1,
                Role::Reader => stats.readers += 1,
                Role::Banned => stats.banned += 1,
            }
        }
        Ok(stats)
    }
}
