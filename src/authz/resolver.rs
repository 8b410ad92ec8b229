use super::allowlist::AdminAllowlist;
use super::role::Role;
use crate::users::UserStore;

/// Effective role for an identity.
///
/// The user store is authoritative once a record exists; the allowlist only
/// matters for emails the store has never seen. A store read failure is
/// treated as "no record" so a flaky backend degrades privileges instead of
/// failing the request.
pub async fn resolve_role(
    store: &dyn UserStore,
    allowlist: &AdminAllowlist,
    email: Option<&str>,
) -> Role {
    let Some(email) = email else {
        return Role::Reader;
    };

    let record = match store.find_by_email(email).await {
        Ok(record) => record,
        Err(err) => {
            tracing::warn!(email, error = %err, "user store read failed; treating identity as unknown");
            None
        }
    };

    match record {
        Some(user) => user.role,
        None if allowlist.is_member(email) => Role::Admin,
        None => Role::Reader,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::errors::AppError;
    use crate::models::user::User;

    struct MapStore {
        users: HashMap<String, User>,
    }

    impl MapStore {
        fn with(roles: &[(&str, Role)]) -> Self {
            let now = Utc::now();
            let users = roles
                .iter()
                .map(|(email, role)| {
                    let user = User {
                        email: email.to_string(),
                        name: None,
                        avatar_url: None,
                        role: *role,
                        last_login: now,
                        created_at: now,
                    };
                    (email.to_string(), user)
                })
                .collect();
            Self { users }
        }
    }

    #[async_trait]
    impl UserStore for MapStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
            Ok(self.users.get(email).cloned())
        }

        async fn upsert(&self, _user: &User) -> Result<(), AppError> {
            Ok(())
        }

        async fn delete(&self, _email: &str) -> Result<bool, AppError> {
            Ok(false)
        }

        async fn list_all(&self) -> Result<Vec<User>, AppError> {
            Ok(self.users.values().cloned().collect())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl UserStore for BrokenStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<User>, AppError> {
            Err(AppError::internal("store offline"))
        }

        async fn upsert(&self, _user: &User) -> Result<(), AppError> {
            Err(AppError::internal("store offline"))
        }

        async fn delete(&self, _email: &str) -> Result<bool, AppError> {
            Err(AppError::internal("store offline"))
        }

        async fn list_all(&self) -> Result<Vec<User>, AppError> {
            Err(AppError::internal("store offline"))
        }
    }

    #[tokio::test]
    async fn no_session_resolves_to_reader() {
        let store = MapStore::with(&[]);
        let allowlist = AdminAllowlist::parse("boss@example.com");
        assert_eq!(resolve_role(&store, &allowlist, None).await, Role::Reader);
    }

    #[tokio::test]
    async fn stored_role_is_authoritative() {
        let store = MapStore::with(&[("boss@example.com", Role::Banned)]);
        let allowlist = AdminAllowlist::parse("boss@example.com");
        // Stored banned wins over allowlist membership.
        assert_eq!(
            resolve_role(&store, &allowlist, Some("boss@example.com")).await,
            Role::Banned
        );
    }

    #[tokio::test]
    async fn allowlist_grants_admin_when_store_has_no_record() {
        let store = MapStore::with(&[]);
        let allowlist = AdminAllowlist::parse("boss@example.com");
        assert_eq!(
            resolve_role(&store, &allowlist, Some("boss@example.com")).await,
            Role::Admin
        );
        assert_eq!(
            resolve_role(&store, &allowlist, Some("BOSS@EXAMPLE.COM")).await,
            Role::Admin
        );
    }

    #[tokio::test]
    async fn unknown_email_defaults_to_reader() {
        let store = MapStore::with(&[]);
        let allowlist = AdminAllowlist::parse("");
        assert_eq!(
            resolve_role(&store, &allowlist, Some("visitor@example.com")).await,
            Role::Reader
        );
    }

    #[tokio::test]
    async fn store_failure_degrades_to_allowlist_then_default() {
        let allowlist = AdminAllowlist::parse("boss@example.com");
        assert_eq!(
            resolve_role(&BrokenStore, &allowlist, Some("boss@example.com")).await,
            Role::Admin
        );
        assert_eq!(
            resolve_role(&BrokenStore, &allowlist, Some("visitor@example.com")).await,
            Role::Reader
        );
    }
}
