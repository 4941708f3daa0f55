use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

use crate::app::errors::{AppError, AppResult};
use crate::app::types::{FirebaseApp, DEFAULT_APP_NAME};

/// Named apps shared by the parts of a program that were handed this registry.
///
/// Cloning yields another handle to the same set of apps.
#[derive(Clone, Debug, Default)]
pub struct AppRegistry {
    apps: Arc<Mutex<BTreeMap<String, FirebaseApp>>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, BTreeMap<String, FirebaseApp>> {
        self.apps.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Registers `app` when no app has been registered yet.
    ///
    /// Returns `true` when `app` was registered and `false` when the registry
    /// already held an app, in which case `app` is discarded.
    pub fn init_database(&self, app: FirebaseApp) -> bool {
        let mut apps = self.guard();
        if !apps.is_empty() {
            debug!("app registry already initialised; keeping existing apps");
            return false;
        }
        debug!("registering Firebase app '{}'", app.name());
        apps.insert(app.name().to_string(), app);
        true
    }

    /// Registers `app` under its name.
    ///
    /// # Errors
    /// [`AppError::DuplicateApp`] when the name is taken.
    pub fn register(&self, app: FirebaseApp) -> AppResult<()> {
        let mut apps = self.guard();
        if apps.contains_key(app.name()) {
            return Err(AppError::DuplicateApp {
                app_name: app.name().to_string(),
            });
        }
        debug!("registering Firebase app '{}'", app.name());
        apps.insert(app.name().to_string(), app);
        Ok(())
    }

    /// Looks up an app by name; `None` selects the default app.
    pub fn get_app(&self, name: Option<&str>) -> AppResult<FirebaseApp> {
        let name = name.unwrap_or(DEFAULT_APP_NAME);
        self.guard()
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NoApp {
                app_name: name.to_string(),
            })
    }

    pub fn apps(&self) -> Vec<FirebaseApp> {
        self.guard().values().cloned().collect()
    }

    /// Removes the named app, returning it.
    pub fn delete_app(&self, name: &str) -> AppResult<FirebaseApp> {
        let removed = self.guard().remove(name);
        match removed {
            Some(app) => {
                debug!("deleted Firebase app '{name}'");
                Ok(app)
            }
            None => Err(AppError::NoApp {
                app_name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::types::FirebaseOptions;

    fn app(name: &str) -> FirebaseApp {
        FirebaseApp::builder(FirebaseOptions {
            project_id: Some("demo".into()),
            ..Default::default()
        })
        .name(name)
        .build()
        .unwrap()
    }

    #[test]
    fn init_database_registers_once() {
        let registry = AppRegistry::new();
        let first = app(DEFAULT_APP_NAME);
        assert!(registry.init_database(first.clone()));
        assert!(!registry.init_database(app("other")));
        assert_eq!(registry.apps().len(), 1);
        assert!(registry.get_app(None).unwrap().ptr_eq(&first));
    }

    #[test]
    fn register_rejects_duplicate_names() {
        let registry = AppRegistry::new();
        registry.register(app("a")).unwrap();
        let err = registry.register(app("a")).unwrap_err();
        assert_eq!(err.code(), "app/duplicate-app");
    }

    #[test]
    fn missing_apps_report_no_app() {
        let registry = AppRegistry::new();
        assert_eq!(
            registry.get_app(None).unwrap_err(),
            AppError::NoApp {
                app_name: DEFAULT_APP_NAME.into()
            }
        );
        registry.register(app("a")).unwrap();
        registry.delete_app("a").unwrap();
        assert!(registry.apps().is_empty());
        assert!(registry.delete_app("a").is_err());
    }
}
