//! Per-frame auxiliary information supplied by the caller.

/// Map/biome the frame was captured in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Biome {
    Forest,
    Desert,
    Hell,
    Snow,
    Unknown,
}

impl Biome {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "forest" => Biome::Forest,
            "desert" => Biome::Desert,
            "hell" => Biome::Hell,
            "snow" => Biome::Snow,
            _ => Biome::Unknown,
        }
    }
}

/// Cross-validation inputs derived outside the recognizer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameContext {
    pub biome: Option<Biome>,
    /// Confidence of the external biome classification, in `[0, 1]`.
    pub biome_confidence: Option<f32>,
}

impl FrameContext {
    pub fn with_biome(biome: Biome, confidence: f32) -> Self {
        Self {
            biome: Some(biome),
            biome_confidence: Some(confidence),
        }
    }
}
