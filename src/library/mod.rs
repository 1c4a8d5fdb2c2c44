//! Reference icon templates.
//!
//! Templates are normalized once, when the library is built: the icon is
//! center-cropped by the library's margin, area-resampled to the fixed
//! working size and reduced to grayscale. The matcher applies the identical
//! preprocessing to slots, so a slot holding the source icon reproduces the
//! template exactly. A built [`TemplateLibrary`] is immutable; hot reloading
//! goes through [`SharedLibrary`], which swaps whole snapshots.

use crate::image::resample::{gray_center_crop, resize_area};
use crate::image::RgbaView;
use crate::kernel::NccPlan;
use crate::trace::{trace_event, trace_warn};
use crate::util::{IconMatchError, IconMatchResult};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[cfg(feature = "image-io")]
mod sources;
mod rarity;

#[cfg(feature = "image-io")]
pub use sources::TemplateSource;
pub use rarity::{ColorRange, RarityPalette, RarityTier};

/// Broad item class used by cross-validation predicates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemCategory {
    Weapon,
    Tome,
    Item,
}

impl ItemCategory {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "weapon" => Some(Self::Weapon),
            "tome" => Some(Self::Tome),
            "item" => Some(Self::Item),
            _ => None,
        }
    }
}

/// Identity and metadata of a reference icon.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateMeta {
    pub id: String,
    pub display_name: String,
    pub rarity: Option<RarityTier>,
    pub category: Option<ItemCategory>,
}

impl TemplateMeta {
    /// Metadata with only an id; the display name defaults to the id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            rarity: None,
            category: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_rarity(mut self, rarity: RarityTier) -> Self {
        self.rarity = Some(rarity);
        self
    }

    pub fn with_category(mut self, category: ItemCategory) -> Self {
        self.category = Some(category);
        self
    }
}

/// Working size and crop applied to templates and slots alike.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TemplateGeometry {
    /// Side of the square working buffer in pixels.
    pub size: usize,
    /// Fraction trimmed from every edge before resampling.
    pub crop_margin: f32,
}

impl Default for TemplateGeometry {
    fn default() -> Self {
        Self {
            size: 32,
            crop_margin: 0.12,
        }
    }
}

impl TemplateGeometry {
    pub fn validate(&self) -> IconMatchResult<()> {
        if self.size < 4 {
            return Err(IconMatchError::config("template size must be at least 4"));
        }
        if !(0.0..0.5).contains(&self.crop_margin) {
            return Err(IconMatchError::config("crop margin must lie in [0, 0.5)"));
        }
        Ok(())
    }
}

/// Normalized reference icon.
#[derive(Clone, Debug)]
pub struct Template {
    meta: TemplateMeta,
    plan: NccPlan,
}

impl Template {
    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn meta(&self) -> &TemplateMeta {
        &self.meta
    }

    pub fn rarity(&self) -> Option<RarityTier> {
        self.meta.rarity
    }

    pub fn category(&self) -> Option<ItemCategory> {
        self.meta.category
    }

    /// Correlation plan over the normalized grayscale pixels.
    pub fn plan(&self) -> &NccPlan {
        &self.plan
    }
}

/// Entry that was left out of a library build.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedTemplate {
    pub id: String,
    pub error: IconMatchError,
}

/// Immutable set of templates shared read-only by all matches.
#[derive(Debug)]
pub struct TemplateLibrary {
    geometry: TemplateGeometry,
    templates: Vec<Template>,
    index: HashMap<String, usize>,
    skipped: Vec<SkippedTemplate>,
}

impl TemplateLibrary {
    pub fn builder(geometry: TemplateGeometry) -> TemplateLibraryBuilder {
        TemplateLibraryBuilder::new(geometry)
    }

    pub fn geometry(&self) -> TemplateGeometry {
        self.geometry
    }

    /// Templates in insertion order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.index.get(id).map(|&idx| &self.templates[idx])
    }

    /// Entries that failed to load or normalize.
    pub fn skipped(&self) -> &[SkippedTemplate] {
        &self.skipped
    }
}

/// Incremental library construction with silent degradation.
///
/// Failed entries are recorded in [`TemplateLibrary::skipped`] instead of
/// aborting the build.
pub struct TemplateLibraryBuilder {
    geometry: TemplateGeometry,
    templates: Vec<Template>,
    index: HashMap<String, usize>,
    skipped: Vec<SkippedTemplate>,
    crop: Vec<f32>,
    tmp: Vec<f32>,
    resized: Vec<f32>,
}

impl TemplateLibraryBuilder {
    pub fn new(geometry: TemplateGeometry) -> Self {
        Self {
            geometry,
            templates: Vec::new(),
            index: HashMap::new(),
            skipped: Vec::new(),
            crop: Vec::new(),
            tmp: Vec::new(),
            resized: Vec::new(),
        }
    }

    /// Normalizes and adds an RGBA icon.
    ///
    /// Returns the error when the entry is skipped; the builder stays usable.
    pub fn add_icon(&mut self, meta: TemplateMeta, icon: RgbaView<'_>) -> IconMatchResult<()> {
        if self.index.contains_key(&meta.id) {
            return self.skip(meta.id.clone(), IconMatchError::DuplicateTemplate { id: meta.id });
        }

        let size = self.geometry.size;
        let (cw, ch) = gray_center_crop(icon, self.geometry.crop_margin, &mut self.crop);
        resize_area(&self.crop, cw, ch, &mut self.resized, size, size, &mut self.tmp);
        let plan = match NccPlan::from_gray(&self.resized, size, size) {
            Ok(plan) => plan,
            Err(error) => return self.skip(meta.id, error),
        };
        if plan.is_degenerate() {
            return self.skip(meta.id.clone(), IconMatchError::DegenerateTemplate { id: meta.id });
        }

        self.index.insert(meta.id.clone(), self.templates.len());
        self.templates.push(Template { meta, plan });
        Ok(())
    }

    /// Records an entry that could not be produced at all (e.g. unreadable file).
    pub fn record_failure(&mut self, id: impl Into<String>, error: IconMatchError) {
        let _ = self.skip(id.into(), error);
    }

    fn skip(&mut self, id: String, error: IconMatchError) -> IconMatchResult<()> {
        trace_warn!("template_skipped", id = id.as_str(), reason = error.to_string().as_str());
        self.skipped.push(SkippedTemplate {
            id,
            error: error.clone(),
        });
        Err(error)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn build(self) -> TemplateLibrary {
        trace_event!(
            "template_library_built",
            loaded = self.templates.len(),
            skipped = self.skipped.len()
        );
        TemplateLibrary {
            geometry: self.geometry,
            templates: self.templates,
            index: self.index,
            skipped: self.skipped,
        }
    }
}

/// Hot-swappable handle to the current library.
///
/// Readers take an `Arc` snapshot that stays valid for the whole recognition
/// pass; `replace` publishes a new snapshot without touching the old one.
pub struct SharedLibrary {
    current: RwLock<Arc<TemplateLibrary>>,
}

impl SharedLibrary {
    pub fn new(library: TemplateLibrary) -> Self {
        Self {
            current: RwLock::new(Arc::new(library)),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<TemplateLibrary> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Publishes `library`, returning the previous snapshot.
    pub fn replace(&self, library: TemplateLibrary) -> Arc<TemplateLibrary> {
        let next = Arc::new(library);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}
