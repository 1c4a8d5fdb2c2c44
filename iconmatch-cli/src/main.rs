use clap::Parser;
use iconmatch::io::load_rgba_image;
use iconmatch::grid::AdaptiveGridConfig;
use iconmatch::library::{ColorRange, TemplateSource};
use iconmatch::{
    AcceptanceThresholds, Biome, CrossValidationSignal, Detection, EmptySlotThresholds, Frame,
    FrameContext, FrameReport, GridMode, IconMatchError, ItemCategory, PrecisionMode, Predicate,
    RarityPalette, RarityTier, RecognitionConfig, Recognizer, RgbaImageBuf, TemplateGeometry,
    TemplateLibrary, TemplateMeta,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Inventory icon recognizer (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum GridModeConfig {
    #[default]
    Fixed,
    Adaptive,
}

impl From<GridModeConfig> for GridMode {
    fn from(value: GridModeConfig) -> Self {
        match value {
            GridModeConfig::Fixed => GridMode::Fixed,
            GridModeConfig::Adaptive => GridMode::Adaptive,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GridConfigJson {
    mode: GridModeConfig,
    reference_height: f32,
    icon_size: f32,
    spacing: f32,
    bottom_margin: f32,
    row_pitch: f32,
    max_rows: usize,
    min_y_fraction: f32,
    side_margin_fraction: f32,
    adaptive: AdaptiveConfigJson,
}

impl Default for GridConfigJson {
    fn default() -> Self {
        let cfg = RecognitionConfig::default().grid;
        Self {
            mode: GridModeConfig::Fixed,
            reference_height: cfg.reference_height,
            icon_size: cfg.icon_size,
            spacing: cfg.spacing,
            bottom_margin: cfg.bottom_margin,
            row_pitch: cfg.row_pitch,
            max_rows: cfg.max_rows,
            min_y_fraction: cfg.min_y_fraction,
            side_margin_fraction: cfg.side_margin_fraction,
            adaptive: AdaptiveConfigJson::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct AdaptiveConfigJson {
    search_top_fraction: f32,
    sample_columns: usize,
    brightness_weight: f32,
    variance_weight: f32,
    saturation_weight: f32,
    min_band_score: f32,
    scan_lines: usize,
    min_run: f32,
    max_run: f32,
    merge_distance: f32,
    min_pitch_ratio: f32,
    max_pitch_ratio: f32,
}

impl Default for AdaptiveConfigJson {
    fn default() -> Self {
        let cfg = AdaptiveGridConfig::default();
        Self {
            search_top_fraction: cfg.search_top_fraction,
            sample_columns: cfg.sample_columns,
            brightness_weight: cfg.brightness_weight,
            variance_weight: cfg.variance_weight,
            saturation_weight: cfg.saturation_weight,
            min_band_score: cfg.min_band_score,
            scan_lines: cfg.scan_lines,
            min_run: cfg.min_run,
            max_run: cfg.max_run,
            merge_distance: cfg.merge_distance,
            min_pitch_ratio: cfg.min_pitch_ratio,
            max_pitch_ratio: cfg.max_pitch_ratio,
        }
    }
}

impl From<&AdaptiveConfigJson> for AdaptiveGridConfig {
    fn from(value: &AdaptiveConfigJson) -> Self {
        Self {
            search_top_fraction: value.search_top_fraction,
            sample_columns: value.sample_columns,
            brightness_weight: value.brightness_weight,
            variance_weight: value.variance_weight,
            saturation_weight: value.saturation_weight,
            min_band_score: value.min_band_score,
            scan_lines: value.scan_lines,
            min_run: value.min_run,
            max_run: value.max_run,
            merge_distance: value.merge_distance,
            min_pitch_ratio: value.min_pitch_ratio,
            max_pitch_ratio: value.max_pitch_ratio,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ClassifierConfigJson {
    min_variance: f32,
    min_mean: f32,
    hell_min_variance: Option<f32>,
    edge_refinement: bool,
}

impl Default for ClassifierConfigJson {
    fn default() -> Self {
        let cfg = RecognitionConfig::default().classifier;
        Self {
            min_variance: cfg.thresholds.min_variance,
            min_mean: cfg.thresholds.min_mean,
            hell_min_variance: cfg
                .biome_overrides
                .get(&Biome::Hell)
                .map(|t| t.min_variance),
            edge_refinement: cfg.edge_refinement,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MatcherConfigJson {
    global_threshold: f32,
    per_item_thresholds: HashMap<String, f32>,
    min_gap: Option<f32>,
    rarity_shortlist: bool,
    rarity_boost: f32,
    rarity_ring_fraction: f32,
    rarity_min_fraction: f32,
    review_top_k: usize,
}

impl Default for MatcherConfigJson {
    fn default() -> Self {
        let cfg = RecognitionConfig::default().matcher;
        Self {
            global_threshold: cfg.acceptance.global,
            per_item_thresholds: HashMap::new(),
            min_gap: None,
            rarity_shortlist: cfg.rarity_shortlist,
            rarity_boost: cfg.rarity_boost,
            rarity_ring_fraction: cfg.rarity_ring_fraction,
            rarity_min_fraction: cfg.rarity_min_fraction,
            review_top_k: cfg.review_top_k,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct AggregateConfigJson {
    count_floor: f32,
    overlap_iou: f32,
}

impl Default for AggregateConfigJson {
    fn default() -> Self {
        let cfg = RecognitionConfig::default().aggregate;
        Self {
            count_floor: cfg.count_floor,
            overlap_iou: cfg.overlap_iou,
        }
    }
}

/// Border color box for one tier; `None` palette keeps the built-in one.
#[derive(Debug, Deserialize)]
struct TierColorJson {
    tier: String,
    min: [u8; 3],
    max: [u8; 3],
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum PredicateJson {
    CountInRange {
        #[serde(default)]
        category: Option<String>,
        min: usize,
        max: usize,
    },
    BiomeMinItems {
        biome: String,
        min: usize,
    },
    BiomeMaxItems {
        biome: String,
        max: usize,
    },
    BiomeConfidenceAtLeast {
        floor: f32,
    },
}

impl PredicateJson {
    fn to_predicate(&self) -> Result<Predicate, IconMatchError> {
        Ok(match self {
            PredicateJson::CountInRange { category, min, max } => Predicate::CountInRange {
                category: category.as_deref().map(parse_category).transpose()?,
                min: *min,
                max: *max,
            },
            PredicateJson::BiomeMinItems { biome, min } => Predicate::BiomeMinItems {
                biome: Biome::parse(biome),
                min: *min,
            },
            PredicateJson::BiomeMaxItems { biome, max } => Predicate::BiomeMaxItems {
                biome: Biome::parse(biome),
                max: *max,
            },
            PredicateJson::BiomeConfidenceAtLeast { floor } => {
                Predicate::BiomeConfidenceAtLeast { floor: *floor }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct SignalJson {
    name: String,
    weight: f32,
    predicate: PredicateJson,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CalibrationConfigJson {
    /// Replaces the built-in signal set when present.
    signals: Option<Vec<SignalJson>>,
    min_floor: f32,
    max_ceiling: f32,
}

impl Default for CalibrationConfigJson {
    fn default() -> Self {
        let cfg = RecognitionConfig::default().calibration;
        Self {
            signals: None,
            min_floor: cfg.min_floor,
            max_ceiling: cfg.max_ceiling,
        }
    }
}

fn invalid(reason: String) -> IconMatchError {
    IconMatchError::InvalidConfig { reason }
}

fn parse_category(name: &str) -> Result<ItemCategory, IconMatchError> {
    ItemCategory::parse(name).ok_or_else(|| invalid(format!("unknown item category {name:?}")))
}

fn parse_tier(name: &str) -> Result<RarityTier, IconMatchError> {
    RarityTier::parse(name).ok_or_else(|| invalid(format!("unknown rarity tier {name:?}")))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    image_paths: Vec<String>,
    manifest_path: String,
    output_path: Option<String>,
    biome: Option<String>,
    biome_confidence: Option<f32>,
    grid: GridConfigJson,
    classifier: ClassifierConfigJson,
    matcher: MatcherConfigJson,
    palette: Option<Vec<TierColorJson>>,
    calibration: CalibrationConfigJson,
    aggregate: AggregateConfigJson,
}

impl Config {
    fn recognition(&self) -> Result<RecognitionConfig, IconMatchError> {
        let mut cfg = RecognitionConfig::default();

        let g = &self.grid;
        cfg.grid.mode = g.mode.into();
        cfg.grid.reference_height = g.reference_height;
        cfg.grid.icon_size = g.icon_size;
        cfg.grid.spacing = g.spacing;
        cfg.grid.bottom_margin = g.bottom_margin;
        cfg.grid.row_pitch = g.row_pitch;
        cfg.grid.max_rows = g.max_rows;
        cfg.grid.min_y_fraction = g.min_y_fraction;
        cfg.grid.side_margin_fraction = g.side_margin_fraction;
        cfg.grid.adaptive = AdaptiveGridConfig::from(&g.adaptive);

        let c = &self.classifier;
        cfg.classifier.thresholds = EmptySlotThresholds {
            min_variance: c.min_variance,
            min_mean: c.min_mean,
        };
        cfg.classifier.biome_overrides.clear();
        if let Some(min_variance) = c.hell_min_variance {
            cfg.classifier.biome_overrides.insert(
                Biome::Hell,
                EmptySlotThresholds {
                    min_variance,
                    min_mean: c.min_mean,
                },
            );
        }
        cfg.classifier.edge_refinement = c.edge_refinement;

        let m = &self.matcher;
        cfg.matcher.acceptance = AcceptanceThresholds {
            global: m.global_threshold,
            per_item: m.per_item_thresholds.clone(),
        };
        cfg.matcher.precision = match m.min_gap {
            Some(min_gap) => PrecisionMode::HighPrecision { min_gap },
            None => PrecisionMode::Standard,
        };
        cfg.matcher.rarity_shortlist = m.rarity_shortlist;
        cfg.matcher.rarity_boost = m.rarity_boost;
        cfg.matcher.rarity_ring_fraction = m.rarity_ring_fraction;
        cfg.matcher.rarity_min_fraction = m.rarity_min_fraction;
        cfg.matcher.review_top_k = m.review_top_k;

        if let Some(ranges) = &self.palette {
            cfg.palette = RarityPalette {
                ranges: ranges
                    .iter()
                    .map(|r| -> Result<_, IconMatchError> {
                        Ok((parse_tier(&r.tier)?, ColorRange::new(r.min, r.max)))
                    })
                    .collect::<Result<_, _>>()?,
            };
        }

        let cal = &self.calibration;
        if let Some(signals) = &cal.signals {
            cfg.calibration.signals = signals
                .iter()
                .map(|s| -> Result<_, IconMatchError> {
                    Ok(CrossValidationSignal::new(
                        s.name.clone(),
                        s.weight,
                        s.predicate.to_predicate()?,
                    ))
                })
                .collect::<Result<_, _>>()?;
        }
        cfg.calibration.min_floor = cal.min_floor;
        cfg.calibration.max_ceiling = cal.max_ceiling;

        cfg.aggregate.count_floor = self.aggregate.count_floor;
        cfg.aggregate.overlap_iou = self.aggregate.overlap_iou;
        Ok(cfg)
    }

    fn context(&self) -> FrameContext {
        FrameContext {
            biome: self.biome.as_deref().map(Biome::parse),
            biome_confidence: self.biome_confidence,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ManifestItem {
    id: String,
    name: Option<String>,
    rarity: Option<String>,
    category: Option<String>,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    template_size: Option<usize>,
    #[serde(default)]
    crop_margin: Option<f32>,
    items: Vec<ManifestItem>,
}

fn load_library(manifest_path: &Path) -> Result<TemplateLibrary, Box<dyn std::error::Error>> {
    let manifest: Manifest = serde_json::from_str(&fs::read_to_string(manifest_path)?)?;
    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let defaults = TemplateGeometry::default();
    let geometry = TemplateGeometry {
        size: manifest.template_size.unwrap_or(defaults.size),
        crop_margin: manifest.crop_margin.unwrap_or(defaults.crop_margin),
    };
    geometry.validate()?;

    let sources: Vec<TemplateSource> = manifest
        .items
        .into_iter()
        .map(|item| {
            let mut meta = TemplateMeta::new(item.id);
            if let Some(name) = item.name {
                meta = meta.with_name(name);
            }
            if let Some(rarity) = item.rarity.as_deref().and_then(RarityTier::parse) {
                meta = meta.with_rarity(rarity);
            }
            if let Some(category) = item.category.as_deref().and_then(ItemCategory::parse) {
                meta = meta.with_category(category);
            }
            TemplateSource {
                meta,
                path: base.join(item.icon),
            }
        })
        .collect();

    let library = TemplateLibrary::load_from_sources(geometry, &sources);
    for skipped in library.skipped() {
        warn!("skipped template {}: {}", skipped.id, skipped.error);
    }
    if library.is_empty() {
        return Err(IconMatchError::EmptyLibrary.into());
    }
    info!("loaded {} templates", library.len());
    Ok(library)
}

#[derive(Debug, Serialize)]
struct SlotRecord {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    row: usize,
    col: usize,
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    item_id: String,
    confidence: f32,
    raw_score: f32,
    rarity: Option<&'static str>,
    slot: SlotRecord,
}

impl From<&Detection> for DetectionRecord {
    fn from(value: &Detection) -> Self {
        Self {
            item_id: value.template_id.clone(),
            confidence: value.confidence,
            raw_score: value.raw_score,
            rarity: value.rarity.map(RarityTier::as_str),
            slot: SlotRecord {
                x: value.slot.x,
                y: value.slot.y,
                width: value.slot.width,
                height: value.slot.height,
                row: value.slot.row,
                col: value.slot.col,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ImageRecord {
    image: String,
    error: Option<String>,
    slots: usize,
    occupied: usize,
    validation_score: Option<f32>,
    detections: Vec<DetectionRecord>,
    counts: BTreeMap<String, usize>,
}

impl ImageRecord {
    fn failed(image: &str, err: IconMatchError) -> Self {
        Self {
            image: image.to_owned(),
            error: Some(err.to_string()),
            slots: 0,
            occupied: 0,
            validation_score: None,
            detections: Vec::new(),
            counts: BTreeMap::new(),
        }
    }

    fn from_report(image: &str, report: &FrameReport) -> Self {
        Self {
            image: image.to_owned(),
            error: None,
            slots: report.slots.len(),
            occupied: report.occupied_slots(),
            validation_score: Some(report.validation.score),
            detections: report.detections.iter().map(DetectionRecord::from).collect(),
            counts: report.counts.clone(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("iconmatch=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.image_paths.is_empty() || config.manifest_path.is_empty() {
        return Err("image_paths and manifest_path must be set in the config".into());
    }

    let library = load_library(Path::new(&config.manifest_path))?;
    let recognizer = Recognizer::new(&library, config.recognition()?)?;
    let context = config.context();

    // Undecodable screenshots are reported individually; the rest still run.
    let decoded: Vec<(&String, Result<RgbaImageBuf, IconMatchError>)> = config
        .image_paths
        .iter()
        .map(|path| (path, load_rgba_image(path)))
        .collect();
    let frames: Vec<Frame<'_>> = decoded
        .iter()
        .filter_map(|(_, img)| img.as_ref().ok())
        .map(|img| Frame {
            image: img.view(),
            context: &context,
        })
        .collect();
    let mut reports = recognizer.recognize_batch(&frames).into_iter();

    let mut records = Vec::with_capacity(decoded.len());
    for (path, img) in decoded {
        match img {
            Ok(_) => {
                if let Some(report) = reports.next() {
                    records.push(ImageRecord::from_report(path, &report));
                }
            }
            Err(err) => {
                warn!("skipping {path}: {err}");
                records.push(ImageRecord::failed(path, err));
            }
        }
    }

    let json = serde_json::to_string_pretty(&records)?;
    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
