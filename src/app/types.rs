use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::app::errors::{AppError, AppResult};
use crate::auth::{Auth, AuthBackend, InMemoryAuthBackend};
use crate::firestore::{DocumentStore, Firestore, InMemoryDocumentStore};

pub const DEFAULT_APP_NAME: &str = "[DEFAULT]";

/// Project configuration in the shape of the standard web config object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseOptions {
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    #[serde(rename = "databaseURL")]
    pub database_url: Option<String>,
    pub project_id: Option<String>,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub app_id: Option<String>,
    pub measurement_id: Option<String>,
}

impl FirebaseOptions {
    /// Parses a config object such as `{"apiKey": "...", "projectId": "..."}`.
    /// Unknown keys are ignored.
    pub fn from_json(json: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirebaseAppSettings {
    pub name: String,
}

impl Default for FirebaseAppSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_APP_NAME.to_string(),
        }
    }
}

/// A configured project together with the collaborators its clients use.
#[derive(Clone)]
pub struct FirebaseApp {
    inner: Arc<FirebaseAppInner>,
}

struct FirebaseAppInner {
    settings: FirebaseAppSettings,
    options: FirebaseOptions,
    store: Arc<dyn DocumentStore>,
    auth_backend: Arc<dyn AuthBackend>,
}

impl FirebaseApp {
    pub fn builder(options: FirebaseOptions) -> FirebaseAppBuilder {
        FirebaseAppBuilder {
            options,
            settings: FirebaseAppSettings::default(),
            store: None,
            auth_backend: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.settings.name
    }

    pub fn options(&self) -> &FirebaseOptions {
        &self.inner.options
    }

    /// Returns the project id; `build` guarantees one is present.
    pub fn project_id(&self) -> &str {
        self.inner.options.project_id.as_deref().unwrap_or_default()
    }

    pub fn firestore(&self) -> Firestore {
        Firestore::new(Arc::clone(&self.inner.store))
    }

    pub fn auth(&self) -> Auth {
        Auth::new(Arc::clone(&self.inner.auth_backend))
    }

    /// Whether two handles refer to the same app instance.
    pub fn ptr_eq(&self, other: &FirebaseApp) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for FirebaseApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirebaseApp")
            .field("name", &self.name())
            .field("options", &self.inner.options)
            .finish()
    }
}

pub struct FirebaseAppBuilder {
    options: FirebaseOptions,
    settings: FirebaseAppSettings,
    store: Option<Arc<dyn DocumentStore>>,
    auth_backend: Option<Arc<dyn AuthBackend>>,
}

impl FirebaseAppBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.settings.name = name.into();
        self
    }

    pub fn document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn auth_backend(mut self, backend: Arc<dyn AuthBackend>) -> Self {
        self.auth_backend = Some(backend);
        self
    }

    /// Builds the app, falling back to in-memory collaborators.
    ///
    /// # Errors
    /// [`AppError::MissingProjectId`] when the options carry no project id.
    pub fn build(self) -> AppResult<FirebaseApp> {
        let has_project = self
            .options
            .project_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        if !has_project {
            return Err(AppError::MissingProjectId);
        }
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryDocumentStore::new()));
        let auth_backend = self
            .auth_backend
            .unwrap_or_else(|| Arc::new(InMemoryAuthBackend::new()));
        Ok(FirebaseApp {
            inner: Arc::new(FirebaseAppInner {
                settings: self.settings,
                options: self.options,
                store,
                auth_backend,
            }),
        })
    }
}
