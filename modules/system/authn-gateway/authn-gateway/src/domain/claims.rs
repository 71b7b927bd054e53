//! Unverified claim extraction.
//!
//! Decoding here only *reads* attributes; trust is established by the
//! validator that consumes the claims.

use authn_gateway_sdk::AuthError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

type Object = Map<String, Value>;
type ContainerAccessor = fn(&Object) -> Option<&Object>;

fn nested<'a>(root: &'a Object, key: &str) -> Option<&'a Object> {
    root.get(key).and_then(Value::as_object)
}

fn user_attributes(root: &Object) -> Option<&Object> {
    nested(root, "user_attributes")
}

fn xs_user_attributes(root: &Object) -> Option<&Object> {
    nested(root, "xs.user.attributes")
}

fn ext_attr(root: &Object) -> Option<&Object> {
    nested(root, "ext_attr")
}

fn custom_attributes(root: &Object) -> Option<&Object> {
    nested(root, "custom_attributes")
}

fn top_level(root: &Object) -> Option<&Object> {
    Some(root)
}

/// Where an attribute may live, in lookup priority order. First non-empty hit wins.
const ATTRIBUTE_CONTAINERS: [ContainerAccessor; 5] = [
    user_attributes,
    xs_user_attributes,
    ext_attr,
    custom_attributes,
    top_level,
];

/// Whether a claim value counts as a hit.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => items.iter().any(is_present),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Claims decoded from a credential's payload segment.
#[derive(Debug, Clone)]
pub struct Claims {
    inner: Object,
}

impl Claims {
    /// Decode the payload of a compact JWS (`header.payload.signature`)
    /// without verifying the signature.
    ///
    /// # Errors
    ///
    /// `MalformedCredential` if the credential does not have three segments,
    /// the payload is not base64url, or it is not a JSON object.
    pub fn decode(credential: &str) -> Result<Self, AuthError> {
        let segments: Vec<&str> = credential.split('.').collect();
        let [_, payload, _] = segments.as_slice() else {
            return Err(AuthError::malformed(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::malformed(format!("payload is not base64url: {e}")))?;

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(inner)) => Ok(Self { inner }),
            Ok(_) => Err(AuthError::malformed("payload is not a JSON object")),
            Err(e) => Err(AuthError::malformed(format!("payload is not JSON: {e}"))),
        }
    }

    /// Wrap an already-structured claims object (e.g. identity provider token info).
    #[must_use]
    pub fn from_map(inner: Object) -> Self {
        Self { inner }
    }

    /// Raw top-level claim.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key).filter(|v| is_present(v))
    }

    /// Look up a logical attribute wherever it is stored.
    ///
    /// Containers are checked in [`ATTRIBUTE_CONTAINERS`] order, then the
    /// top level; callers must not assume which one holds the value.
    #[must_use]
    pub fn find_attribute(&self, name: &str) -> Option<&Value> {
        ATTRIBUTE_CONTAINERS
            .iter()
            .filter_map(|container| container(&self.inner))
            .filter_map(|object| object.get(name))
            .find(|value| is_present(value))
    }

    /// Attribute as a single string; arrays yield their first non-empty string.
    #[must_use]
    pub fn find_string(&self, name: &str) -> Option<String> {
        self.find_attribute(name).and_then(first_string)
    }

    /// First of several attribute names that resolves to a string.
    #[must_use]
    pub fn find_first_string(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.find_string(name))
    }

    /// The `exp` claim, if any.
    ///
    /// # Errors
    ///
    /// `MalformedCredential` if `exp` is present but not a unix timestamp.
    pub fn expiry(&self) -> Result<Option<DateTime<Utc>>, AuthError> {
        let Some(exp) = self.get("exp") else {
            return Ok(None);
        };
        let seconds = match exp {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(truncate_seconds)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
        .ok_or_else(|| AuthError::malformed("exp is not a unix timestamp"))?;

        DateTime::from_timestamp(seconds, 0)
            .map(Some)
            .ok_or_else(|| AuthError::malformed("exp is out of range"))
    }

    /// True when an expiry claim exists and is not after `now`.
    ///
    /// # Errors
    ///
    /// See [`Claims::expiry`].
    pub fn is_expired(&self, now: DateTime<Utc>) -> Result<bool, AuthError> {
        Ok(self.expiry()?.is_some_and(|exp| exp <= now))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn truncate_seconds(value: f64) -> i64 {
    value.trunc() as i64
}

fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(first_string),
        _ => None,
    }
}

/// Flatten a claim into a list of strings.
///
/// Arrays keep their non-empty string members; a plain string is split on
/// whitespace (the OAuth `scope` convention).
#[must_use]
pub fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        Value::String(s) => s.split_whitespace().map(str::to_owned).collect(),
        _ => Vec::new(),
    }
}
