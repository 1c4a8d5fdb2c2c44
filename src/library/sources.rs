//! Building a library from icon files on disk.

use crate::image::io::load_rgba_image;
use crate::library::{TemplateGeometry, TemplateLibrary, TemplateMeta};
use std::path::PathBuf;

/// Metadata plus the icon file it should be normalized from.
#[derive(Clone, Debug)]
pub struct TemplateSource {
    pub meta: TemplateMeta,
    pub path: PathBuf,
}

impl TemplateLibrary {
    /// Loads every source, skipping unreadable or degenerate icons.
    ///
    /// Skipped entries are listed in [`TemplateLibrary::skipped`].
    pub fn load_from_sources(geometry: TemplateGeometry, sources: &[TemplateSource]) -> Self {
        let mut builder = TemplateLibrary::builder(geometry);
        for source in sources {
            match load_rgba_image(&source.path) {
                Ok(icon) => {
                    let _ = builder.add_icon(source.meta.clone(), icon.view());
                }
                Err(err) => builder.record_failure(source.meta.id.clone(), err),
            }
        }
        builder.build()
    }
}
