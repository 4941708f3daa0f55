//! Authentication helpers.
//!
//! [`Auth`] wraps an injected [`AuthBackend`] and reduces the common flows
//! (email/password, Google redirect, Google ID token, sign-out, account
//! deletion) to calls that return the signed-in uid.

mod api;
mod backend;
mod error;
mod memory;
mod model;

#[doc(inline)]
pub use api::Auth;

#[doc(inline)]
pub use backend::AuthBackend;

#[doc(inline)]
pub use error::{AuthError, AuthResult};

#[doc(inline)]
pub use memory::InMemoryAuthBackend;

#[doc(inline)]
pub use model::{
    EmailAuthProvider, GoogleAuthProvider, OAuthCredential, OAuthProvider, OperationType, User,
    UserCredential, UserInfo, UserMetadata,
};
