use std::sync::Arc;

use crate::fixtures::Fixtures;
use crate::services::{Accounts, Catalog, EnrollmentStore};
use crate::storage::LocalStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LocalStore>,
    pub enrollments: Arc<EnrollmentStore>,
    pub catalog: Arc<Catalog>,
    pub accounts: Arc<Accounts>,
}

impl AppState {
    pub fn new(store: Arc<dyn LocalStore>, fixtures: Fixtures) -> Self {
        let enrollments = Arc::new(EnrollmentStore::new(store.clone(), fixtures.clone()));
        let catalog = Arc::new(Catalog::new(store.clone(), fixtures.clone(), enrollments.clone()));
        let accounts = Arc::new(Accounts::new(
            store.clone(),
            fixtures,
            enrollments.clone(),
            catalog.clone(),
        ));

        Self {
            store,
            enrollments,
            catalog,
            accounts,
        }
    }
}
