use std::fmt;
use std::sync::Arc;

use futures::StreamExt;

use crate::auth::backend::AuthBackend;
use crate::auth::error::{AuthError, AuthResult};
use crate::auth::memory::InMemoryAuthBackend;
use crate::auth::model::{GoogleAuthProvider, User, UserCredential};
use crate::util::Subscription;

/// Convenience client over an injected [`AuthBackend`].
///
/// Sign-in helpers return the signed-in user's uid and turn a missing user
/// into [`AuthError::SignInFailed`].
#[derive(Clone)]
pub struct Auth {
    backend: Arc<dyn AuthBackend>,
}

impl Auth {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self { backend }
    }

    /// Returns a client backed by [`InMemoryAuthBackend`].
    pub fn with_in_memory() -> Self {
        Self::new(Arc::new(InMemoryAuthBackend::new()))
    }

    pub fn backend(&self) -> &Arc<dyn AuthBackend> {
        &self.backend
    }

    pub fn current_user(&self) -> Option<User> {
        self.backend.current_user()
    }

    /// Streams the signed-in user (or `None`), starting with the current state.
    pub fn on_auth_state_changed(&self) -> Subscription<Option<User>, AuthError> {
        let backend = Arc::clone(&self.backend);
        Subscription::new("auth-state", move || {
            let backend = Arc::clone(&backend);
            async move {
                let receiver = backend.auth_state_changes().await?;
                Ok::<_, AuthError>(receiver.map(Ok::<Option<User>, AuthError>).boxed())
            }
        })
    }

    /// Signs in with email and password, returning the user's uid.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<String> {
        let credential = self
            .backend
            .sign_in_with_email_and_password(email, password)
            .await?;
        signed_in_uid(credential, "Login failed: user sign in unsuccessful")
    }

    /// Creates an email/password account and returns its uid.
    pub async fn register(&self, email: &str, password: &str) -> AuthResult<String> {
        let credential = self
            .backend
            .create_user_with_email_and_password(email, password)
            .await?;
        signed_in_uid(credential, "Registration failed: user creation unsuccessful")
    }

    pub async fn logout(&self) -> AuthResult<()> {
        self.backend.sign_out().await
    }

    pub async fn send_reset_password_email(&self, email: &str) -> AuthResult<()> {
        self.backend.send_password_reset_email(email).await
    }

    /// Signs in through the Google redirect flow and returns the uid.
    ///
    /// # Errors
    /// [`AuthError::RedirectCancelled`] when the redirect produced no result.
    pub async fn sign_in_with_google(&self) -> AuthResult<String> {
        let provider = GoogleAuthProvider::provider();
        self.backend.sign_in_with_redirect(&provider).await?;
        let credential = self
            .backend
            .get_redirect_result()
            .await?
            .ok_or(AuthError::RedirectCancelled)?;
        signed_in_uid(credential, "Login failed: user sign in unsuccessful")
    }

    /// Signs in with a Google ID token obtained outside the redirect flow.
    pub async fn mobile_sign_in_with_google(&self, id_token: &str) -> AuthResult<String> {
        let credential = self
            .backend
            .sign_in_with_credential(GoogleAuthProvider::credential(id_token))
            .await?;
        signed_in_uid(credential, "Login failed: user sign in unsuccessful")
    }

    /// Deletes the signed-in account.
    ///
    /// Returns `false` when nobody is signed in.
    pub async fn delete_auth_user(&self) -> AuthResult<bool> {
        let Some(user) = self.backend.current_user() else {
            return Ok(false);
        };
        self.backend.delete_user(&user).await?;
        Ok(true)
    }
}

fn signed_in_uid(credential: UserCredential, failure: &str) -> AuthResult<String> {
    credential
        .user
        .map(|user| user.uid().to_string())
        .ok_or_else(|| AuthError::SignInFailed(failure.to_string()))
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("current_user", &self.current_user().map(|user| user.uid().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::model::UserInfo;

    fn auth() -> (Auth, InMemoryAuthBackend) {
        let backend = InMemoryAuthBackend::new();
        (Auth::new(Arc::new(backend.clone())), backend)
    }

    #[tokio::test]
    async fn login_returns_uid() {
        let (auth, _) = auth();
        let uid = auth.register("ada@example.com", "secret1").await.unwrap();
        auth.logout().await.unwrap();
        assert!(auth.current_user().is_none());
        assert_eq!(auth.login("ada@example.com", "secret1").await.unwrap(), uid);
    }

    #[tokio::test]
    async fn google_redirect_outcomes() {
        let (auth, backend) = auth();
        assert_eq!(auth.sign_in_with_google().await.unwrap_err(), AuthError::RedirectCancelled);

        backend.stage_redirect_without_user();
        let err = auth.sign_in_with_google().await.unwrap_err();
        assert_eq!(err.to_string(), "Login failed: user sign in unsuccessful");

        backend.stage_redirect_user(UserInfo {
            uid: "google-123".into(),
            email: Some("ada@gmail.com".into()),
            ..Default::default()
        });
        let uid = auth.sign_in_with_google().await.unwrap();
        let current = auth.current_user().unwrap();
        assert_eq!(current.uid(), uid);
        assert_eq!(current.provider_id(), "google.com");
    }

    #[tokio::test]
    async fn delete_without_user_is_false() {
        let (auth, _) = auth();
        assert!(!auth.delete_auth_user().await.unwrap());

        auth.register("ada@example.com", "secret1").await.unwrap();
        assert!(auth.delete_auth_user().await.unwrap());
        assert!(auth.current_user().is_none());
        let err = auth.login("ada@example.com", "secret1").await.unwrap_err();
        assert_eq!(err.code(), "auth/user-not-found");
    }

    #[tokio::test]
    async fn auth_state_stream_follows_sign_in() {
        let (auth, _) = auth();
        let mut states = auth.on_auth_state_changed();
        assert_eq!(states.next().await.unwrap().unwrap(), None);

        let uid = auth.mobile_sign_in_with_google("id-token").await.unwrap();
        let user = states.next().await.unwrap().unwrap().unwrap();
        assert_eq!(user.uid(), uid);

        states.cancel();
        assert!(states.next().await.is_none());
    }
}
