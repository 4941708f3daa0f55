use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_channel::Sender;
use async_trait::async_trait;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::auth::backend::AuthBackend;
use crate::auth::error::{AuthError, AuthResult};
use crate::auth::model::{
    EmailAuthProvider, OAuthCredential, OAuthProvider, User, UserCredential, UserInfo, UserMetadata,
};

const MIN_PASSWORD_LENGTH: usize = 6;
const UID_LENGTH: usize = 28;

/// Auth backend that keeps accounts in process memory.
///
/// Redirect sign-in never leaves the process: tests decide the outcome with
/// [`stage_redirect_user`](Self::stage_redirect_user) and friends before the
/// redirect result is read.
#[derive(Clone, Default)]
pub struct InMemoryAuthBackend {
    state: Arc<Mutex<AuthState>>,
}

#[derive(Default)]
struct AuthState {
    accounts: BTreeMap<String, Account>,
    federated: BTreeMap<String, User>,
    current: Option<User>,
    listeners: Vec<Sender<Option<User>>>,
    password_resets: Vec<String>,
    pending_redirect: Option<String>,
    staged_redirect: Option<RedirectOutcome>,
}

struct Account {
    user: User,
    password: String,
}

enum RedirectOutcome {
    User(UserInfo),
    NoUser,
}

impl InMemoryAuthBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next redirect result signs in a user with `info`.
    pub fn stage_redirect_user(&self, info: UserInfo) {
        if let Ok(mut state) = self.state.lock() {
            state.staged_redirect = Some(RedirectOutcome::User(info));
        }
    }

    /// The next redirect result completes without a user.
    pub fn stage_redirect_without_user(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.staged_redirect = Some(RedirectOutcome::NoUser);
        }
    }

    /// Provider id of the redirect currently in flight, if any.
    pub fn pending_redirect(&self) -> Option<String> {
        self.state.lock().ok().and_then(|state| state.pending_redirect.clone())
    }

    /// Emails that password reset messages were sent to, oldest first.
    pub fn sent_password_resets(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.password_resets.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> AuthResult<MutexGuard<'_, AuthState>> {
        self.state
            .lock()
            .map_err(|_| AuthError::Internal("auth state lock poisoned".into()))
    }
}

impl AuthState {
    fn set_current(&mut self, user: Option<User>) {
        if self.current == user {
            return;
        }
        self.current = user;
        let current = self.current.clone();
        self.listeners
            .retain(|listener| listener.try_send(current.clone()).is_ok());
    }

    fn sign_in(&mut self, mut user: User) -> User {
        user.metadata_mut().last_sign_in_time = Some(Utc::now());
        self.set_current(Some(user.clone()));
        user
    }
}

fn generate_uid() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(UID_LENGTH)
        .collect()
}

fn validate_email(email: &str) -> AuthResult<()> {
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && !domain.is_empty())
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(AuthError::InvalidEmail(email.to_string()))
    }
}

fn new_user(info: UserInfo) -> User {
    let now = Utc::now();
    User::new(info).with_metadata(UserMetadata {
        creation_time: Some(now),
        last_sign_in_time: Some(now),
    })
}

#[async_trait]
impl AuthBackend for InMemoryAuthBackend {
    async fn sign_in_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<UserCredential> {
        validate_email(email)?;
        let mut state = self.lock()?;
        let account = state
            .accounts
            .get_mut(email)
            .ok_or_else(|| AuthError::UserNotFound(email.to_string()))?;
        if account.password != password {
            return Err(AuthError::WrongPassword);
        }
        let user = account.user.clone();
        let user = state.sign_in(user);
        if let Some(account) = state.accounts.get_mut(email) {
            account.user = user.clone();
        }
        Ok(UserCredential::sign_in(
            user,
            Some(EmailAuthProvider::PROVIDER_ID.to_string()),
        ))
    }

    async fn create_user_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<UserCredential> {
        validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword);
        }
        let mut state = self.lock()?;
        if state.accounts.contains_key(email) {
            return Err(AuthError::EmailAlreadyInUse(email.to_string()));
        }
        let user = new_user(UserInfo {
            uid: generate_uid(),
            email: Some(email.to_string()),
            provider_id: EmailAuthProvider::PROVIDER_ID.to_string(),
            ..Default::default()
        });
        state.accounts.insert(
            email.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        state.set_current(Some(user.clone()));
        Ok(UserCredential::sign_in(
            user,
            Some(EmailAuthProvider::PROVIDER_ID.to_string()),
        ))
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.lock()?.set_current(None);
        Ok(())
    }

    async fn send_password_reset_email(&self, email: &str) -> AuthResult<()> {
        validate_email(email)?;
        let mut state = self.lock()?;
        if !state.accounts.contains_key(email) {
            return Err(AuthError::UserNotFound(email.to_string()));
        }
        state.password_resets.push(email.to_string());
        Ok(())
    }

    async fn sign_in_with_redirect(&self, provider: &OAuthProvider) -> AuthResult<()> {
        self.lock()?.pending_redirect = Some(provider.provider_id().to_string());
        Ok(())
    }

    async fn get_redirect_result(&self) -> AuthResult<Option<UserCredential>> {
        let mut state = self.lock()?;
        let Some(provider_id) = state.pending_redirect.take() else {
            return Ok(None);
        };
        match state.staged_redirect.take() {
            None => Ok(None),
            Some(RedirectOutcome::NoUser) => Ok(Some(UserCredential {
                user: None,
                provider_id: Some(provider_id),
                operation_type: None,
            })),
            Some(RedirectOutcome::User(mut info)) => {
                info.provider_id = provider_id.clone();
                let key = format!("{provider_id}:{}", info.uid);
                let user = state
                    .federated
                    .entry(key.clone())
                    .or_insert_with(|| new_user(info))
                    .clone();
                let user = state.sign_in(user);
                state.federated.insert(key, user.clone());
                Ok(Some(UserCredential::sign_in(user, Some(provider_id))))
            }
        }
    }

    async fn sign_in_with_credential(&self, credential: OAuthCredential) -> AuthResult<UserCredential> {
        let token = credential
            .id_token
            .as_deref()
            .or(credential.access_token.as_deref())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AuthError::InvalidCredential("credential carries no token".into()))?;
        let key = format!("{}:{token}", credential.provider_id);
        let mut state = self.lock()?;
        let provider_id = credential.provider_id.clone();
        let user = state
            .federated
            .entry(key.clone())
            .or_insert_with(|| {
                new_user(UserInfo {
                    uid: generate_uid(),
                    provider_id: provider_id.clone(),
                    ..Default::default()
                })
            })
            .clone();
        let user = state.sign_in(user);
        state.federated.insert(key, user.clone());
        Ok(UserCredential::sign_in(user, Some(provider_id)))
    }

    fn current_user(&self) -> Option<User> {
        self.state.lock().ok().and_then(|state| state.current.clone())
    }

    async fn delete_user(&self, user: &User) -> AuthResult<()> {
        let mut state = self.lock()?;
        let before = state.accounts.len() + state.federated.len();
        state.accounts.retain(|_, account| account.user.uid() != user.uid());
        state.federated.retain(|_, existing| existing.uid() != user.uid());
        if state.accounts.len() + state.federated.len() == before {
            return Err(AuthError::UserNotFound(user.uid().to_string()));
        }
        if state.current.as_ref().map(User::uid) == Some(user.uid()) {
            state.set_current(None);
        }
        Ok(())
    }

    async fn auth_state_changes(&self) -> AuthResult<async_channel::Receiver<Option<User>>> {
        let mut state = self.lock()?;
        let (sender, receiver) = async_channel::unbounded();
        // unbounded, so this only fails if the receiver is gone
        let _ = sender.try_send(state.current.clone());
        state.listeners.push(sender);
        Ok(receiver)
    }
}
