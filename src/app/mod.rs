//! App configuration and the explicit app registry.
//!
//! A [`FirebaseApp`] bundles project options with the document store and auth
//! backend its clients talk to. Apps are passed around explicitly or kept in
//! an [`AppRegistry`]; there is no process-wide default.
mod errors;
mod registry;
mod types;

#[doc(inline)]
pub use errors::{AppError, AppResult};

#[doc(inline)]
pub use registry::AppRegistry;

#[doc(inline)]
pub use types::{FirebaseApp, FirebaseAppBuilder, FirebaseAppSettings, FirebaseOptions, DEFAULT_APP_NAME};
