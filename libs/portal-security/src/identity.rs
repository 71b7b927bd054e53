use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_COMPANY_CODE;

/// Which trust source vouched for the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Issued by the external identity broker.
    Federated,
    /// Self-issued session token signed with the local secret.
    Local,
}

/// Role derived from group/scope claims (federated) or embedded at issuance (local).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    /// Confirmed member of a recognized user group, without admin rights.
    User,
    /// Authenticated, but no recognized group or admin scope was found.
    Unrecognized,
}

/// `Identity` is the canonical result of a successful credential validation.
///
/// Built exactly once by the authenticator and attached to the request; it is
/// never mutated afterwards and never outlives the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Unique user id (federated `user_uuid`/`sub`, local `sub`).
    subject_id: String,
    /// Employee id used by the business systems.
    user_id: String,
    email: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    company_code: String,
    role: Role,
    #[serde(default)]
    scopes: Vec<String>,
    #[serde(default)]
    groups: Vec<String>,
    expires_at: Option<DateTime<Utc>>,
    source: IdentitySource,
    /// Original credential. Never serialized; `Debug` redacts it.
    #[serde(skip)]
    bearer_token: Option<SecretString>,
}

impl Identity {
    #[must_use]
    pub fn builder(source: IdentitySource) -> IdentityBuilder {
        IdentityBuilder::new(source)
    }

    #[must_use]
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn given_name(&self) -> Option<&str> {
        self.given_name.as_deref()
    }

    #[must_use]
    pub fn family_name(&self) -> Option<&str> {
        self.family_name.as_deref()
    }

    #[must_use]
    pub fn company_code(&self) -> &str {
        &self.company_code
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when the caller's membership in a recognized group is confirmed.
    /// Admins are always recognized.
    #[must_use]
    pub fn is_recognized_member(&self) -> bool {
        self.role != Role::Unrecognized
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    #[must_use]
    pub fn source(&self) -> IdentitySource {
        self.source
    }

    #[must_use]
    pub fn bearer_token(&self) -> Option<&SecretString> {
        self.bearer_token.as_ref()
    }
}

pub struct IdentityBuilder {
    source: IdentitySource,
    subject_id: String,
    user_id: Option<String>,
    email: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    company_code: Option<String>,
    role: Role,
    scopes: Vec<String>,
    groups: Vec<String>,
    expires_at: Option<DateTime<Utc>>,
    bearer_token: Option<SecretString>,
}

impl IdentityBuilder {
    fn new(source: IdentitySource) -> Self {
        Self {
            source,
            subject_id: String::new(),
            user_id: None,
            email: None,
            given_name: None,
            family_name: None,
            company_code: None,
            role: Role::Unrecognized,
            scopes: Vec::new(),
            groups: Vec::new(),
            expires_at: None,
            bearer_token: None,
        }
    }

    #[must_use]
    pub fn subject_id(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = subject_id.into();
        self
    }

    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    #[must_use]
    pub fn email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    #[must_use]
    pub fn given_name(mut self, given_name: Option<String>) -> Self {
        self.given_name = given_name;
        self
    }

    #[must_use]
    pub fn family_name(mut self, family_name: Option<String>) -> Self {
        self.family_name = family_name;
        self
    }

    #[must_use]
    pub fn company_code(mut self, company_code: Option<String>) -> Self {
        self.company_code = company_code.filter(|c| !c.is_empty());
        self
    }

    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    #[must_use]
    pub fn expires_at(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<SecretString>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Finish the identity. A missing employee id falls back to the subject id
    /// and a missing company code to [`DEFAULT_COMPANY_CODE`].
    #[must_use]
    pub fn build(self) -> Identity {
        let user_id = self.user_id.unwrap_or_else(|| self.subject_id.clone());
        Identity {
            subject_id: self.subject_id,
            user_id,
            email: self.email,
            given_name: self.given_name,
            family_name: self.family_name,
            company_code: self
                .company_code
                .unwrap_or_else(|| DEFAULT_COMPANY_CODE.to_owned()),
            role: self.role,
            scopes: self.scopes,
            groups: self.groups,
            expires_at: self.expires_at,
            source: self.source,
            bearer_token: self.bearer_token,
        }
    }
}
