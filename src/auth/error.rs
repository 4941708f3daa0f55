use std::fmt;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidEmail(String),
    WeakPassword,
    EmailAlreadyInUse(String),
    UserNotFound(String),
    WrongPassword,
    InvalidCredential(String),
    /// The backend completed the call but produced no user.
    SignInFailed(String),
    RedirectCancelled,
    Network(String),
    Internal(String),
}

impl AuthError {
    /// Stable `auth/<code>` identifier for the error.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidEmail(_) => "auth/invalid-email",
            AuthError::WeakPassword => "auth/weak-password",
            AuthError::EmailAlreadyInUse(_) => "auth/email-already-in-use",
            AuthError::UserNotFound(_) => "auth/user-not-found",
            AuthError::WrongPassword => "auth/wrong-password",
            AuthError::InvalidCredential(_) => "auth/invalid-credential",
            AuthError::SignInFailed(_) => "auth/sign-in-failed",
            AuthError::RedirectCancelled => "auth/redirect-cancelled-by-user",
            AuthError::Network(_) => "auth/network-request-failed",
            AuthError::Internal(_) => "auth/internal-error",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidEmail(email) => write!(f, "Invalid email address: {email}"),
            AuthError::WeakPassword => write!(f, "Password should be at least 6 characters"),
            AuthError::EmailAlreadyInUse(email) => write!(f, "Email already in use: {email}"),
            AuthError::UserNotFound(who) => write!(f, "No user record for {who}"),
            AuthError::WrongPassword => write!(f, "The password is invalid"),
            AuthError::InvalidCredential(message) => write!(f, "Invalid credential: {message}"),
            AuthError::SignInFailed(message) => f.write_str(message),
            AuthError::RedirectCancelled => write!(f, "User cancelled redirect sign in"),
            AuthError::Network(message) => write!(f, "Network error: {message}"),
            AuthError::Internal(message) => write!(f, "Internal error: {message}"),
        }
    }
}

impl std::error::Error for AuthError {}
