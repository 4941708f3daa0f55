use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub photo_url: Option<String>,
    pub provider_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    pub creation_time: Option<DateTime<Utc>>,
    pub last_sign_in_time: Option<DateTime<Utc>>,
}

/// An authenticated account as reported by the auth backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    info: UserInfo,
    email_verified: bool,
    is_anonymous: bool,
    metadata: UserMetadata,
}

impl User {
    pub fn new(info: UserInfo) -> Self {
        Self {
            info,
            email_verified: false,
            is_anonymous: false,
            metadata: UserMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: UserMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns the stable UID for the user.
    pub fn uid(&self) -> &str {
        &self.info.uid
    }

    pub fn email(&self) -> Option<&str> {
        self.info.email.as_deref()
    }

    pub fn provider_id(&self) -> &str {
        &self.info.provider_id
    }

    pub fn email_verified(&self) -> bool {
        self.email_verified
    }

    pub fn set_email_verified(&mut self, verified: bool) {
        self.email_verified = verified;
    }

    pub fn is_anonymous(&self) -> bool {
        self.is_anonymous
    }

    pub fn info(&self) -> &UserInfo {
        &self.info
    }

    pub fn metadata(&self) -> &UserMetadata {
        &self.metadata
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut UserMetadata {
        &mut self.metadata
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationType {
    SignIn,
    Link,
    Reauthenticate,
}

/// Outcome of a sign-in call.
///
/// `user` is optional because a backend may complete the call without
/// producing an account; the helpers turn that into an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserCredential {
    pub user: Option<User>,
    pub provider_id: Option<String>,
    pub operation_type: Option<OperationType>,
}

impl UserCredential {
    pub fn sign_in(user: User, provider_id: Option<String>) -> Self {
        Self {
            user: Some(user),
            provider_id,
            operation_type: Some(OperationType::SignIn),
        }
    }
}

/// Configuration of a federated identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthProvider {
    provider_id: String,
    scopes: Vec<String>,
    custom_parameters: BTreeMap<String, String>,
}

impl OAuthProvider {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            scopes: Vec::new(),
            custom_parameters: BTreeMap::new(),
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn add_scope(&mut self, scope: impl Into<String>) {
        let scope = scope.into();
        if !self.scopes.contains(&scope) {
            self.scopes.push(scope);
        }
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn set_custom_parameter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom_parameters.insert(key.into(), value.into());
    }

    pub fn custom_parameters(&self) -> &BTreeMap<String, String> {
        &self.custom_parameters
    }
}

/// Token material handed to `sign_in_with_credential`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthCredential {
    pub provider_id: String,
    pub id_token: Option<String>,
    pub access_token: Option<String>,
}

pub struct GoogleAuthProvider;

impl GoogleAuthProvider {
    pub const PROVIDER_ID: &'static str = "google.com";

    /// Google provider with the default `profile`/`email` scopes.
    pub fn provider() -> OAuthProvider {
        let mut provider = OAuthProvider::new(Self::PROVIDER_ID);
        provider.add_scope("profile");
        provider.add_scope("email");
        provider.set_custom_parameter("prompt", "select_account");
        provider
    }

    /// Wraps a Google ID token obtained natively (e.g. on mobile).
    pub fn credential(id_token: impl Into<String>) -> OAuthCredential {
        OAuthCredential {
            provider_id: Self::PROVIDER_ID.to_string(),
            id_token: Some(id_token.into()),
            access_token: None,
        }
    }
}

pub struct EmailAuthProvider;

impl EmailAuthProvider {
    pub const PROVIDER_ID: &'static str = "password";
}
