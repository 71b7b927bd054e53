//! Role derivation from federated group and scope claims.

use std::collections::HashSet;

use portal_security::{Identity, IdentitySource, Role};
use regex::Regex;

use super::federated::FederatedIdentity;
use crate::config::RoleConfig;

/// Case-insensitive group key where `-` and `_` are the same separator.
#[must_use]
pub fn normalize_group(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}

/// Applies the role precedence to federated identities.
///
/// Evaluated top-down, first match wins:
/// 1. an admin group is present: `Admin`
/// 2. a user group is present: `User`
/// 3. a scope matches `<app_id>[!tenant](.|!)Administrator` or contains
///    "administrator": `Admin`
/// 4. otherwise `Unrecognized`
///
/// Group claims always precede scope claims.
#[derive(Debug, Clone)]
pub struct RoleResolver {
    admin_groups: HashSet<String>,
    user_groups: HashSet<String>,
    legacy_admin_scope: Regex,
}

impl RoleResolver {
    /// # Errors
    ///
    /// Returns a regex error if the admin scope pattern cannot be compiled.
    pub fn new(cfg: &RoleConfig) -> Result<Self, regex::Error> {
        let pattern = format!(
            r"(?i)^{}(?:![\w-]+)?[.!]administrator$",
            regex::escape(cfg.app_id.trim())
        );
        Ok(Self {
            admin_groups: cfg.admin_groups.iter().map(|g| normalize_group(g)).collect(),
            user_groups: cfg.user_groups.iter().map(|g| normalize_group(g)).collect(),
            legacy_admin_scope: Regex::new(&pattern)?,
        })
    }

    #[must_use]
    pub fn resolve_role(&self, groups: &[String], scopes: &[String]) -> Role {
        let normalized: Vec<String> = groups.iter().map(|g| normalize_group(g)).collect();

        if normalized.iter().any(|g| self.admin_groups.contains(g)) {
            return Role::Admin;
        }
        if normalized.iter().any(|g| self.user_groups.contains(g)) {
            return Role::User;
        }
        if scopes.iter().any(|s| self.is_legacy_admin_scope(s)) {
            return Role::Admin;
        }
        Role::Unrecognized
    }

    fn is_legacy_admin_scope(&self, scope: &str) -> bool {
        self.legacy_admin_scope.is_match(scope) || scope.to_lowercase().contains("administrator")
    }

    /// Finish a federated identity with its resolved role.
    #[must_use]
    pub fn resolve(&self, federated: FederatedIdentity, credential: &str) -> Identity {
        let role = self.resolve_role(&federated.groups, &federated.scopes);
        let mut builder = Identity::builder(IdentitySource::Federated)
            .subject_id(federated.subject_id)
            .email(federated.email)
            .given_name(federated.given_name)
            .family_name(federated.family_name)
            .company_code(federated.company_code)
            .role(role)
            .scopes(federated.scopes)
            .groups(federated.groups)
            .expires_at(federated.expires_at)
            .bearer_token(credential.to_owned());
        if let Some(user_id) = federated.user_id {
            builder = builder.user_id(user_id);
        }
        builder.build()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use portal_security::constants::DEFAULT_COMPANY_CODE;

    use super::*;

    fn resolver() -> RoleResolver {
        RoleResolver::new(&RoleConfig::default()).unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn admin_group_matches_case_and_separator_insensitively() {
        let r = resolver();
        for group in ["ADMIN-GROUP", "admin_group", "Admin-Group", " admin-GROUP "] {
            assert_eq!(r.resolve_role(&strings(&[group]), &[]), Role::Admin, "{group}");
        }
    }

    #[test]
    fn user_group_only_is_recognized_non_admin() {
        let r = resolver();
        assert_eq!(r.resolve_role(&strings(&["user_group"]), &[]), Role::User);
    }

    #[test]
    fn admin_group_wins_over_user_group() {
        let r = resolver();
        assert_eq!(
            r.resolve_role(&strings(&["USER-GROUP", "ADMIN_GROUP"]), &[]),
            Role::Admin
        );
    }

    #[test]
    fn user_group_takes_precedence_over_admin_scope() {
        let r = resolver();
        assert_eq!(
            r.resolve_role(
                &strings(&["USER-GROUP"]),
                &strings(&["it-portal!t42.Administrator"])
            ),
            Role::User
        );
    }

    #[test]
    fn legacy_scope_pattern_grants_admin() {
        let r = resolver();
        for scope in [
            "it-portal.Administrator",
            "IT-PORTAL!administrator",
            "it-portal!t4711.Administrator",
        ] {
            assert!(r.is_legacy_admin_scope(scope), "{scope}");
            assert_eq!(r.resolve_role(&[], &strings(&[scope])), Role::Admin);
        }
    }

    #[test]
    fn any_scope_containing_administrator_grants_admin() {
        let r = resolver();
        assert_eq!(
            r.resolve_role(&[], &strings(&["other-app.SystemAdministrator"])),
            Role::Admin
        );
    }

    #[test]
    fn unrecognized_group_with_admin_scope_is_admin() {
        let r = resolver();
        assert_eq!(
            r.resolve_role(
                &strings(&["SOME-OTHER-GROUP"]),
                &strings(&["it-portal.Administrator"])
            ),
            Role::Admin
        );
    }

    #[test]
    fn nothing_recognized_is_unrecognized() {
        let r = resolver();
        assert_eq!(
            r.resolve_role(&strings(&["guests"]), &strings(&["openid", "it-portal.Read"])),
            Role::Unrecognized
        );
    }

    #[test]
    fn resolve_builds_federated_identity() {
        let r = resolver();
        let identity = r.resolve(
            FederatedIdentity {
                subject_id: "uuid-1".to_owned(),
                user_id: Some("E1".to_owned()),
                email: Some("e1@example.com".to_owned()),
                given_name: None,
                family_name: None,
                company_code: None,
                groups: strings(&["ADMIN-GROUP"]),
                scopes: Vec::new(),
                expires_at: None,
            },
            "raw",
        );

        assert!(identity.is_admin());
        assert_eq!(identity.user_id(), "E1");
        assert_eq!(identity.company_code(), DEFAULT_COMPANY_CODE);
        assert_eq!(identity.source(), IdentitySource::Federated);
    }
}
