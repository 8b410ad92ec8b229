use std::collections::HashSet;

/// Bootstrap admin allowlist, parsed once at startup from a comma-separated
/// list of emails. Membership can only ever grant admin; a stored user record
/// always takes precedence over this list.
#[derive(Debug, Clone, Default)]
pub struct AdminAllowlist {
    emails: HashSet<String>,
}

impl AdminAllowlist {
    pub fn parse(raw: &str) -> Self {
        let emails = raw
            .split(',')
            .map(|email| email.trim().to_lowercase())
            .filter(|email| !email.is_empty())
            .collect();
        Self { emails }
    }

    /// Reads `ADMIN_EMAILS`. Missing or empty means no bootstrap admins.
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("ADMIN_EMAILS").unwrap_or_default())
    }

    pub fn is_member(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_trims_entries() {
        let list = AdminAllowlist::parse(" pastor@church.org , Admin@Example.com ,, ");
        assert!(list.is_member("pastor@church.org"));
        assert!(list.is_member("admin@example.com"));
        assert!(!list.is_member("someone@example.com"));
    }

    #[test]
    fn membership_is_case_insensitive() {
        let list = AdminAllowlist::parse("pastor@church.org");
        assert!(list.is_member("PASTOR@CHURCH.ORG"));
        assert!(list.is_member("  pastor@church.org  "));
    }

    #[test]
    fn empty_source_means_no_members() {
        let list = AdminAllowlist::parse("");
        assert!(list.is_empty());
        assert!(!list.is_member("anyone@example.com"));
    }
}
