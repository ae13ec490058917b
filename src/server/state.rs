//! Shared application state

use std::sync::Arc;

use crate::config::Settings;
use crate::core::processor::Converter;
use crate::processors::ImageCodec;
use crate::storage::TempStore;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub converter: Arc<Converter>,
}

impl AppState {
    pub fn new(settings: Arc<Settings>, store: TempStore) -> Self {
        let converter = Converter::new(&settings, store);
        Self {
            settings,
            converter: Arc::new(converter),
        }
    }

    /// State with a caller-supplied codec in place of libheif.
    pub fn with_codec(settings: Arc<Settings>, store: TempStore, codec: Arc<dyn ImageCodec>) -> Self {
        let converter = Converter::with_codec(&settings, store, codec);
        Self {
            settings,
            converter: Arc::new(converter),
        }
    }

    pub fn store(&self) -> &TempStore {
        self.converter.store()
    }
}
