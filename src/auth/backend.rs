use async_trait::async_trait;

use crate::auth::error::AuthResult;
use crate::auth::model::{OAuthCredential, OAuthProvider, User, UserCredential};

/// The authentication service the helpers delegate to.
///
/// Implementations own credential verification, token management and
/// session persistence.
#[async_trait]
pub trait AuthBackend: Send + Sync + 'static {
    async fn sign_in_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<UserCredential>;

    async fn create_user_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<UserCredential>;

    async fn sign_out(&self) -> AuthResult<()>;

    async fn send_password_reset_email(&self, email: &str) -> AuthResult<()>;

    /// Starts a redirect-based federated sign-in.
    async fn sign_in_with_redirect(&self, provider: &OAuthProvider) -> AuthResult<()>;

    /// Returns the outcome of the last redirect, or `None` when there is none.
    async fn get_redirect_result(&self) -> AuthResult<Option<UserCredential>>;

    async fn sign_in_with_credential(&self, credential: OAuthCredential) -> AuthResult<UserCredential>;

    fn current_user(&self) -> Option<User>;

    async fn delete_user(&self, user: &User) -> AuthResult<()>;

    /// Registers an auth-state listener. The current user is delivered first,
    /// then every sign-in and sign-out.
    async fn auth_state_changes(&self) -> AuthResult<async_channel::Receiver<Option<User>>>;
}
