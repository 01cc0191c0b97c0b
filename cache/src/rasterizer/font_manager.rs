use std::sync::Arc;

use cosmic_text::{
    Font, FontSystem,
    fontdb::{self, Source},
};
use derive_more::Deref;
use parking_lot::Mutex;

pub use cosmic_text::Weight as FontWeight;
pub use fontdb::ID as FontId;

/// The fonts a [`SwashRasterizer`](super::SwashRasterizer) renders from.
///
/// Cloning shares the underlying font system, so a layout engine and the rasterizer can look at
/// the same faces.
#[derive(Debug, Clone, Deref)]
pub struct FontManager(Arc<Mutex<FontSystem>>);

impl From<FontSystem> for FontManager {
    fn from(font_system: FontSystem) -> Self {
        FontManager(Mutex::new(font_system).into())
    }
}

impl Default for FontManager {
    fn default() -> Self {
        Self::system()
    }
}

impl FontManager {
    /// A font manager without any fonts.
    pub fn bare(locale: impl Into<String>) -> Self {
        FontSystem::new_with_locale_and_db(locale.into(), fontdb::Database::new()).into()
    }

    /// A font manager with the system fonts loaded.
    pub fn system() -> Self {
        FontSystem::new().into()
    }

    pub fn with_font(self, font_data: impl AsRef<[u8]> + Sync + Send + 'static) -> Self {
        self.load_font(font_data);
        self
    }

    /// Adds the faces of a font file and returns their ids.
    pub fn load_font(&self, font_data: impl AsRef<[u8]> + Sync + Send + 'static) -> Vec<FontId> {
        self.lock()
            .db_mut()
            .load_font_source(Source::Binary(Arc::new(font_data)))
            .to_vec()
    }

    pub fn get_font(&self, id: FontId, weight: FontWeight) -> Option<Arc<Font>> {
        self.lock().get_font(id, weight)
    }

    /// The number of faces available.
    pub fn face_count(&self) -> usize {
        self.lock().db().len()
    }
}
