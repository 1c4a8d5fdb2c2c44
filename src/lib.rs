//! IconMatch recognizes inventory items in game screenshots.
//!
//! A recognition pass locates candidate icon slots from the frame geometry
//! (optionally measuring the real icon pitch from rarity border colors),
//! discards empty slots using texture statistics, ranks every occupied slot
//! against a [`TemplateLibrary`] with normalized cross-correlation, adjusts
//! confidences with whole-frame cross-validation signals and finally counts
//! items per template id.
//!
//! The library is built once and only read afterwards; frames can be
//! processed in parallel with the `rayon` feature.

pub mod aggregate;
pub mod calibrate;
pub mod candidate;
pub mod classify;
pub mod config;
pub mod context;
pub mod grid;
pub mod image;
pub mod kernel;
pub mod library;
pub mod lowlevel;
pub mod matcher;
pub mod pipeline;
mod trace;
pub mod util;

#[cfg(feature = "image-io")]
pub use crate::image::io;

pub use aggregate::{AggregateConfig, Detection};
pub use calibrate::{CalibrationConfig, CrossValidationSignal, Predicate};
pub use candidate::MatchCandidate;
pub use classify::{ClassifierConfig, EmptySlotThresholds, SlotState, SlotStats};
pub use config::RecognitionConfig;
pub use context::{Biome, FrameContext};
pub use grid::{GridConfig, GridMode, LayoutSource, Slot};
pub use crate::image::{RgbaImageBuf, RgbaView};
pub use library::{
    ItemCategory, RarityPalette, RarityTier, SharedLibrary, Template, TemplateGeometry,
    TemplateLibrary, TemplateMeta,
};
pub use matcher::{AcceptanceThresholds, MatcherConfig, PrecisionMode, Rejection};
pub use pipeline::{Frame, FrameReport, Recognizer, SlotReport};
pub use util::{IconMatchError, IconMatchResult};
