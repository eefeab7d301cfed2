//! In-Memory Show Store
//!
//! A [`ShowStore`] backed by a [`ShowLibrary`] held in memory. The library
//! is plain serde data, so a whole library can be loaded from one JSON
//! document.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::collaborators::ShowStore;
use crate::ids::{CategoryId, OverlayId, ShowId, StyleId, TemplateId};
use crate::model::Overlay;
use crate::show::{Category, Show, Template};
use crate::style::Style;

/// Everything the output core reads from the show store
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowLibrary {
    /// Shows
    pub shows: HashMap<ShowId, Show>,
    /// Overlays
    pub overlays: HashMap<OverlayId, Overlay>,
    /// Output styles
    pub styles: HashMap<StyleId, Style>,
    /// Templates
    pub templates: HashMap<TemplateId, Template>,
    /// Show categories
    pub categories: HashMap<CategoryId, Category>,
}

impl ShowLibrary {
    /// Parse a library from JSON
    ///
    /// # Errors
    ///
    /// Returns the parse error when the document is not a valid library.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Show store over an in-memory library
#[derive(Default)]
pub struct InMemoryShowStore {
    library: RwLock<ShowLibrary>,
}

impl InMemoryShowStore {
    /// Create a store from a library
    #[must_use]
    pub fn new(library: ShowLibrary) -> Self {
        Self {
            library: RwLock::new(library),
        }
    }

    /// Modify the library in place
    pub fn update<R>(&self, f: impl FnOnce(&mut ShowLibrary) -> R) -> R {
        f(&mut self.library.write())
    }

    /// Copy of the whole library
    #[must_use]
    pub fn snapshot(&self) -> ShowLibrary {
        self.library.read().clone()
    }
}

impl ShowStore for InMemoryShowStore {
    fn show(&self, id: &ShowId) -> Option<Show> {
        self.library.read().shows.get(id).cloned()
    }

    fn overlay(&self, id: &OverlayId) -> Option<Overlay> {
        self.library.read().overlays.get(id).cloned()
    }

    fn style(&self, id: &StyleId) -> Option<Style> {
        self.library.read().styles.get(id).cloned()
    }

    fn template(&self, id: &TemplateId) -> Option<Template> {
        self.library.read().templates.get(id).cloned()
    }

    fn category(&self, id: &CategoryId) -> Option<Category> {
        self.library.read().categories.get(id).cloned()
    }
}

impl fmt::Debug for InMemoryShowStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let library = self.library.read();
        f.debug_struct("InMemoryShowStore")
            .field("shows", &library.shows.len())
            .field("overlays", &library.overlays.len())
            .field("styles", &library.styles.len())
            .field("templates", &library.templates.len())
            .finish()
    }
}
