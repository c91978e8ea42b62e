use std::sync::Arc;

use crate::config;
use crate::db::Store;
use crate::i18n::Localizer;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub env: config::Config,
    pub localizer: Arc<Localizer>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, env: config::Config, localizer: Arc<Localizer>) -> Self {
        Self {
            store,
            env,
            localizer,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
