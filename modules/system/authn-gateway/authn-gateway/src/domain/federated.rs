//! Validation of credentials issued by the federated identity broker.

use std::sync::Arc;

use async_trait::async_trait;
use authn_gateway_sdk::AuthError;
use chrono::{DateTime, Utc};
use portal_security::{Clock, Identity};
use serde_json::Value;

use super::claims::{Claims, string_list};
use super::idp::IdentityProvider;
use super::roles::RoleResolver;
use super::validator::TokenValidator;
use crate::config::FederatedConfig;

const SUBJECT_ATTRIBUTES: &[&str] = &["user_uuid", "sub", "user_name"];
const EMPLOYEE_ID_ATTRIBUTES: &[&str] = &["user_id", "employee_id", "user_name"];
const SYSTEM_ATTRIBUTES: &str = "xs.system.attributes";
const ROLE_COLLECTIONS: &str = "xs.rolecollections";
const AUDIENCE_ATTRIBUTES: &[&str] = &["aud", "azp", "client_id", "cid"];

/// Federated identity before role resolution: the admin flag is still undetermined.
#[derive(Debug, Clone)]
pub struct FederatedIdentity {
    pub subject_id: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub company_code: Option<String>,
    pub groups: Vec<String>,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Validates broker-issued credentials.
///
/// Structural parsing is tried first (no network). If the credential cannot be
/// parsed, the identity provider's own security-context routine is asked instead.
pub struct FederatedTokenValidator {
    config: FederatedConfig,
    provider: Arc<dyn IdentityProvider>,
    roles: RoleResolver,
    clock: Arc<dyn Clock>,
}

impl FederatedTokenValidator {
    #[must_use]
    pub fn new(
        config: FederatedConfig,
        provider: Arc<dyn IdentityProvider>,
        roles: RoleResolver,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            provider,
            roles,
            clock,
        }
    }

    /// Validate without resolving the role.
    ///
    /// # Errors
    ///
    /// `ExpiredCredential` for past expiry, `VerificationFailed` when a parsed
    /// credential names neither the broker as issuer nor this client as
    /// audience, when the claims carry no subject, or when the provider rejects
    /// the credential. `ProviderUnavailable` when the provider cannot be reached.
    pub async fn validate_claims(&self, credential: &str) -> Result<FederatedIdentity, AuthError> {
        match Claims::decode(credential) {
            Ok(claims) => {
                if !issued_by_broker(&claims, &self.config) {
                    return Err(AuthError::verification(
                        "credential was not issued by the federated broker for this client",
                    ));
                }
                self.identity_from_claims(&claims)
            }
            Err(decode_err) => {
                tracing::debug!(
                    error = %decode_err,
                    "federated credential is not parseable, asking identity provider"
                );
                let claims = self
                    .provider
                    .create_security_context(credential, &self.config)
                    .await
                    .map_err(AuthError::from)?;
                self.identity_from_claims(&claims)
            }
        }
    }

    fn identity_from_claims(&self, claims: &Claims) -> Result<FederatedIdentity, AuthError> {
        if claims.is_expired(self.clock.now())? {
            return Err(AuthError::ExpiredCredential);
        }

        let subject_id = claims
            .find_first_string(SUBJECT_ATTRIBUTES)
            .ok_or_else(|| AuthError::verification("credential carries no subject"))?;

        Ok(FederatedIdentity {
            subject_id,
            user_id: claims.find_first_string(EMPLOYEE_ID_ATTRIBUTES),
            email: claims.find_string("email"),
            given_name: claims.find_string("given_name"),
            family_name: claims.find_string("family_name"),
            company_code: claims.find_string("company_code"),
            groups: group_claims(claims),
            scopes: scope_claims(claims),
            expires_at: claims.expiry()?,
        })
    }
}

/// `iss` at or below `issuer_url`, or `client_id` among the audience claims.
///
/// Audience entries of the form `<client_id>.<scope>` count as the client.
fn issued_by_broker(claims: &Claims, config: &FederatedConfig) -> bool {
    let issuer = config.issuer_url.trim().trim_end_matches('/');
    let from_issuer = claims
        .get("iss")
        .and_then(Value::as_str)
        .map(|iss| iss.trim().trim_end_matches('/'))
        .is_some_and(|iss| {
            iss == issuer
                || iss
                    .strip_prefix(issuer)
                    .is_some_and(|rest| rest.starts_with('/'))
        });

    let client_id = config.client_id.trim();
    let for_client = AUDIENCE_ATTRIBUTES
        .iter()
        .filter_map(|name| claims.get(name))
        .flat_map(string_list)
        .any(|aud| {
            aud == client_id
                || aud
                    .strip_prefix(client_id)
                    .is_some_and(|rest| rest.starts_with('.'))
        });

    from_issuer || for_client
}

/// Provider-specific role collections first, then a `groups` attribute anywhere.
fn group_claims(claims: &Claims) -> Vec<String> {
    claims
        .get(SYSTEM_ATTRIBUTES)
        .and_then(|attrs| attrs.get(ROLE_COLLECTIONS))
        .filter(|v| !string_list(v).is_empty())
        .or_else(|| claims.find_attribute("groups"))
        .map(string_list)
        .unwrap_or_default()
}

/// Legacy scopes: `scope` (array or space-delimited), else `scp`.
fn scope_claims(claims: &Claims) -> Vec<String> {
    claims
        .get("scope")
        .or_else(|| claims.get("scp"))
        .map(string_list)
        .unwrap_or_default()
}

#[async_trait]
impl TokenValidator for FederatedTokenValidator {
    fn name(&self) -> &'static str {
        "federated"
    }

    async fn validate(&self, credential: &str) -> Result<Identity, AuthError> {
        let federated = self.validate_claims(credential).await?;
        Ok(self.roles.resolve(federated, credential))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Duration;
    use portal_security::{ManualClock, Role};
    use serde_json::{Value, json};

    use super::*;
    use crate::config::RoleConfig;
    use crate::domain::idp::IdpError;
    use crate::test_support::unsigned_token;

    fn object(value: &Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    struct FakeProvider {
        result: Result<Value, IdpError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn create_security_context(
            &self,
            _credential: &str,
            _config: &FederatedConfig,
        ) -> Result<Claims, IdpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map(|v| Claims::from_map(object(&v)))
        }
    }

    fn config() -> FederatedConfig {
        serde_json::from_value(json!({
            "issuer_url": "https://idp.example.com",
            "client_id": "portal"
        }))
        .unwrap()
    }

    fn validator(provider: Arc<FakeProvider>, clock: &ManualClock) -> FederatedTokenValidator {
        FederatedTokenValidator::new(
            config(),
            provider,
            RoleResolver::new(&RoleConfig::default()).unwrap(),
            Arc::new(clock.clone()),
        )
    }

    fn provider(result: Result<Value, IdpError>) -> Arc<FakeProvider> {
        Arc::new(FakeProvider {
            result,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn parses_groups_scopes_and_profile() {
        let clock = ManualClock::starting_now();
        let exp = clock.now() + Duration::hours(1);
        let token = unsigned_token(&json!({
            "user_uuid": "7d0c-uuid",
            "iss": "https://idp.example.com/oauth/token",
            "exp": exp.timestamp(),
            "email": "jane@example.com",
            "xs.user.attributes": { "employee_id": ["E100"], "company_code": ["2000"] },
            "ext_attr": { "given_name": "Jane" },
            "family_name": "Doe",
            "xs.system.attributes": { "xs.rolecollections": ["USER_GROUP"] },
            "scope": ["openid", "it-portal.Read"]
        }));
        let fake = provider(Err(IdpError::Unavailable("unused".to_owned())));
        let v = validator(fake.clone(), &clock);

        let identity = v.validate(&token).await.unwrap();

        assert_eq!(identity.subject_id(), "7d0c-uuid");
        assert_eq!(identity.user_id(), "E100");
        assert_eq!(identity.company_code(), "2000");
        assert_eq!(identity.given_name(), Some("Jane"));
        assert_eq!(identity.family_name(), Some("Doe"));
        assert_eq!(identity.groups(), &["USER_GROUP"]);
        assert_eq!(identity.scopes(), &["openid", "it-portal.Read"]);
        assert_eq!(identity.role(), Role::User);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn groups_attribute_is_used_when_role_collections_absent() {
        let clock = ManualClock::starting_now();
        let token = unsigned_token(&json!({
            "sub": "s-1",
            "aud": ["portal", "openid"],
            "custom_attributes": { "groups": ["admin-group"] }
        }));
        let v = validator(provider(Err(IdpError::Rejected("unused".to_owned()))), &clock);

        let identity = v.validate(&token).await.unwrap();

        assert!(identity.is_admin());
    }

    #[tokio::test]
    async fn expired_credential_is_rejected() {
        let clock = ManualClock::starting_now();
        let token = unsigned_token(&json!({
            "sub": "s-1",
            "client_id": "portal",
            "exp": (clock.now() - Duration::seconds(1)).timestamp()
        }));
        let v = validator(provider(Err(IdpError::Rejected("unused".to_owned()))), &clock);

        assert_eq!(v.validate(&token).await.unwrap_err(), AuthError::ExpiredCredential);
    }

    #[tokio::test]
    async fn missing_subject_fails_verification() {
        let clock = ManualClock::starting_now();
        let token = unsigned_token(&json!({ "azp": "portal", "email": "x@example.com" }));
        let v = validator(provider(Err(IdpError::Rejected("unused".to_owned()))), &clock);

        assert!(matches!(
            v.validate(&token).await,
            Err(AuthError::VerificationFailed(_))
        ));
    }

    #[tokio::test]
    async fn parsed_credential_from_another_issuer_is_not_federated() {
        let clock = ManualClock::starting_now();
        let fake = provider(Err(IdpError::Rejected("unused".to_owned())));
        let v = validator(fake.clone(), &clock);
        let exp = (clock.now() + Duration::hours(1)).timestamp();

        for payload in [
            json!({ "sub": "s-1", "iss": "it-portal", "is_admin": true, "exp": exp }),
            json!({ "sub": "s-1", "iss": "https://idp.example.com.evil", "exp": exp }),
            json!({ "sub": "s-1", "aud": "portal-other", "exp": exp }),
            json!({ "sub": "s-1", "exp": exp }),
        ] {
            assert!(matches!(
                v.validate(&unsigned_token(&payload)).await,
                Err(AuthError::VerificationFailed(_))
            ));
        }
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn scoped_audience_entry_names_the_client() {
        let clock = ManualClock::starting_now();
        let token = unsigned_token(&json!({
            "sub": "s-1",
            "aud": ["portal.Read", "openid"],
            "groups": ["USER-GROUP"]
        }));
        let v = validator(provider(Err(IdpError::Rejected("unused".to_owned()))), &clock);

        let identity = v.validate(&token).await.unwrap();

        assert_eq!(identity.role(), Role::User);
    }

    #[tokio::test]
    async fn opaque_credential_goes_to_identity_provider() {
        let clock = ManualClock::starting_now();
        let fake = provider(Ok(json!({
            "active": true,
            "sub": "opaque-user",
            "groups": ["ADMIN-GROUP"],
            "exp": (clock.now() + Duration::minutes(5)).timestamp()
        })));
        let v = validator(fake.clone(), &clock);

        let identity = v.validate("opaque-reference-token").await.unwrap();

        assert_eq!(identity.subject_id(), "opaque-user");
        assert!(identity.is_admin());
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_token_info_is_checked_for_expiry() {
        let clock = ManualClock::starting_now();
        let fake = provider(Ok(json!({
            "sub": "opaque-user",
            "exp": (clock.now() - Duration::minutes(5)).timestamp()
        })));
        let v = validator(fake, &clock);

        assert_eq!(
            v.validate("opaque-reference-token").await.unwrap_err(),
            AuthError::ExpiredCredential
        );
    }

    #[tokio::test]
    async fn provider_errors_map_to_auth_errors() {
        let clock = ManualClock::starting_now();

        let v = validator(provider(Err(IdpError::Rejected("inactive".to_owned()))), &clock);
        assert!(matches!(
            v.validate("opaque").await,
            Err(AuthError::VerificationFailed(_))
        ));

        let v = validator(provider(Err(IdpError::Unavailable("timeout".to_owned()))), &clock);
        assert!(matches!(
            v.validate("opaque").await,
            Err(AuthError::ProviderUnavailable(_))
        ));
    }
}
