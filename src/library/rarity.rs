//! Rarity tiers and their icon border colors.

use crate::image::RgbaView;

/// Game-defined item quality category.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RarityTier {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl RarityTier {
    pub const ALL: [RarityTier; 5] = [
        RarityTier::Common,
        RarityTier::Uncommon,
        RarityTier::Rare,
        RarityTier::Epic,
        RarityTier::Legendary,
    ];

    /// Lower-case name as used in item manifests.
    pub fn as_str(self) -> &'static str {
        match self {
            RarityTier::Common => "common",
            RarityTier::Uncommon => "uncommon",
            RarityTier::Rare => "rare",
            RarityTier::Epic => "epic",
            RarityTier::Legendary => "legendary",
        }
    }

    /// Parses a manifest name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

/// Inclusive per-channel RGB box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColorRange {
    pub min: [u8; 3],
    pub max: [u8; 3],
}

impl ColorRange {
    pub const fn new(min: [u8; 3], max: [u8; 3]) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, px: [u8; 4]) -> bool {
        (0..3).all(|c| px[c] >= self.min[c] && px[c] <= self.max[c])
    }
}

/// Border color range for every rarity tier.
#[derive(Clone, Debug, PartialEq)]
pub struct RarityPalette {
    pub ranges: Vec<(RarityTier, ColorRange)>,
}

impl Default for RarityPalette {
    fn default() -> Self {
        Self {
            ranges: vec![
                (
                    RarityTier::Common,
                    ColorRange::new([140, 140, 140], [210, 210, 210]),
                ),
                (
                    RarityTier::Uncommon,
                    ColorRange::new([40, 150, 40], [120, 255, 120]),
                ),
                (
                    RarityTier::Rare,
                    ColorRange::new([30, 90, 180], [110, 170, 255]),
                ),
                (
                    RarityTier::Epic,
                    ColorRange::new([130, 40, 170], [210, 120, 255]),
                ),
                (
                    RarityTier::Legendary,
                    ColorRange::new([200, 120, 0], [255, 200, 80]),
                ),
            ],
        }
    }
}

impl RarityPalette {
    /// First tier whose range contains `px`.
    #[inline]
    pub fn classify(&self, px: [u8; 4]) -> Option<RarityTier> {
        self.ranges
            .iter()
            .find(|(_, range)| range.contains(px))
            .map(|(tier, _)| *tier)
    }

    /// Dominant tier along the outer ring of a slot.
    ///
    /// The ring is `ring_fraction` of the slot's smaller side thick. Returns
    /// the tier and its share of ring pixels when that share reaches
    /// `min_fraction`.
    pub fn dominant_border_tier(
        &self,
        slot: RgbaView<'_>,
        ring_fraction: f32,
        min_fraction: f32,
    ) -> Option<(RarityTier, f32)> {
        let w = slot.width();
        let h = slot.height();
        let ring = ((w.min(h) as f32 * ring_fraction).round() as usize).clamp(1, w.min(h).div_ceil(2));

        let mut counts = [0usize; RarityTier::ALL.len()];
        let mut total = 0usize;
        for y in 0..h {
            let in_band_y = y < ring || y >= h - ring;
            for x in 0..w {
                if !in_band_y && x >= ring && x < w - ring {
                    continue;
                }
                total += 1;
                if let Some(tier) = slot.get(x, y).and_then(|px| self.classify(px)) {
                    counts[tier as usize] += 1;
                }
            }
        }
        if total == 0 {
            return None;
        }

        let (idx, count) = counts
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))?;
        let share = count as f32 / total as f32;
        if count > 0 && share >= min_fraction {
            Some((RarityTier::ALL[idx], share))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RarityPalette, RarityTier};
    use crate::image::RgbaImageBuf;

    #[test]
    fn parse_round_trips_names() {
        for tier in RarityTier::ALL {
            assert_eq!(RarityTier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(RarityTier::parse("EPIC"), Some(RarityTier::Epic));
        assert_eq!(RarityTier::parse("mythic"), None);
    }

    #[test]
    fn ring_of_border_color_is_detected() {
        let mut img = RgbaImageBuf::filled(20, 20, [10, 10, 10, 255]).unwrap();
        for i in 0..20 {
            for t in 0..2 {
                img.put(i, t, [80, 200, 80, 255]);
                img.put(i, 19 - t, [80, 200, 80, 255]);
                img.put(t, i, [80, 200, 80, 255]);
                img.put(19 - t, i, [80, 200, 80, 255]);
            }
        }
        let palette = RarityPalette::default();
        let (tier, share) = palette
            .dominant_border_tier(img.view(), 0.1, 0.5)
            .unwrap();
        assert_eq!(tier, RarityTier::Uncommon);
        assert!(share > 0.99);
    }

    #[test]
    fn plain_slot_has_no_tier() {
        let img = RgbaImageBuf::filled(16, 16, [10, 10, 10, 255]).unwrap();
        let palette = RarityPalette::default();
        assert!(palette.dominant_border_tier(img.view(), 0.1, 0.3).is_none());
    }
}
