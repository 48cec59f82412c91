//! Palette Extractor
//!
//! Full pixel decode followed by modified median cut quantization (MMCQ) and
//! assignment of the resulting swatches to perceptual slots (vibrant/muted and their
//! dark/light variants).
//!
//! # Quantization
//! - Pixels are sampled every `sample_stride` pixels
//! - Translucent (alpha < 125) and near-white (all channels > 250) pixels are skipped
//! - Colors are bucketed at 5 significant bits per channel
//! - Boxes are split by population for the first 75% of the color budget, then by
//!   population x volume, up to 64 boxes
//!
//! # Slot selection
//! Each slot has a luma and saturation window plus a target for each. Among swatches
//! inside the window, the one with the highest weighted score wins (saturation 3,
//! luma 6.5, relative population 0.5). A swatch fills at most one slot and a slot
//! with no candidate is left out of the result.

use tracing::debug;

use crate::error::AnalysisError;
use crate::types::{AnalysisStage, ColorSwatch, PaletteExtractor, PaletteResult, PaletteSlot};

/// Default pixel sampling stride
pub const DEFAULT_SAMPLE_STRIDE: usize = 5;

/// Upper bound on quantized colors
const MAX_COLORS: usize = 64;

const SIGBITS: u32 = 5;
const RSHIFT: u32 = 8 - SIGBITS;
const CELLS_PER_AXIS: usize = 1 << SIGBITS;
const HISTOGRAM_SIZE: usize = 1 << (3 * SIGBITS);
const FRACT_BY_POPULATION: f64 = 0.75;

const MIN_ALPHA: u8 = 125;
const WHITE_CUTOFF: u8 = 250;

const TARGET_DARK_LUMA: f64 = 0.26;
const MAX_DARK_LUMA: f64 = 0.45;
const MIN_LIGHT_LUMA: f64 = 0.55;
const TARGET_LIGHT_LUMA: f64 = 0.74;
const MIN_NORMAL_LUMA: f64 = 0.3;
const TARGET_NORMAL_LUMA: f64 = 0.5;
const MAX_NORMAL_LUMA: f64 = 0.7;
const TARGET_MUTED_SATURATION: f64 = 0.3;
const MAX_MUTED_SATURATION: f64 = 0.4;
const TARGET_VIBRANT_SATURATION: f64 = 1.0;
const MIN_VIBRANT_SATURATION: f64 = 0.35;

const WEIGHT_SATURATION: f64 = 3.0;
const WEIGHT_LUMA: f64 = 6.5;
const WEIGHT_POPULATION: f64 = 0.5;

/// Vibrant-style palette extractor
#[derive(Debug, Clone)]
pub struct VibrantPaletteExtractor {
    sample_stride: usize,
}

impl VibrantPaletteExtractor {
    pub fn new() -> Self {
        Self {
            sample_stride: DEFAULT_SAMPLE_STRIDE,
        }
    }

    /// Sample every `stride` pixels (values below 1 are treated as 1)
    pub fn with_sample_stride(mut self, stride: usize) -> Self {
        self.sample_stride = stride.max(1);
        self
    }

    fn build_histogram(&self, image: &[u8]) -> Result<Histogram, AnalysisError> {
        let rgba = image::load_from_memory(image)
            .map_err(|e| AnalysisError::decode(AnalysisStage::Palette, e.to_string()))?
            .to_rgba8();

        let mut histogram = Histogram::new();
        for pixel in rgba.pixels().step_by(self.sample_stride) {
            let [r, g, b, a] = pixel.0;
            if a < MIN_ALPHA || (r > WHITE_CUTOFF && g > WHITE_CUTOFF && b > WHITE_CUTOFF) {
                continue;
            }
            histogram.add(r, g, b);
        }
        Ok(histogram)
    }
}

impl Default for VibrantPaletteExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PaletteExtractor for VibrantPaletteExtractor {
    fn extract_palette(&self, image: &[u8]) -> Result<PaletteResult, AnalysisError> {
        let histogram = self.build_histogram(image)?;
        let swatches = quantize(&histogram, MAX_COLORS);
        let palette = select_slots(&swatches);

        debug!(
            swatches = swatches.len(),
            resolved_slots = palette.len(),
            "Palette extracted"
        );

        Ok(palette)
    }
}

// ============================================================================
// Quantization
// ============================================================================

struct Histogram {
    counts: Vec<u32>,
}

impl Histogram {
    fn new() -> Self {
        Self {
            counts: vec![0; HISTOGRAM_SIZE],
        }
    }

    fn index(cell: [usize; 3]) -> usize {
        (cell[0] << (2 * SIGBITS)) + (cell[1] << SIGBITS) + cell[2]
    }

    fn add(&mut self, r: u8, g: u8, b: u8) {
        let cell = [
            (r >> RSHIFT) as usize,
            (g >> RSHIFT) as usize,
            (b >> RSHIFT) as usize,
        ];
        self.counts[Self::index(cell)] += 1;
    }

    fn count(&self, cell: [usize; 3]) -> u32 {
        self.counts[Self::index(cell)]
    }
}

/// Axis-aligned box in quantized color space, always fitted tightly to its pixels
#[derive(Debug, Clone, Copy)]
struct ColorBox {
    lo: [usize; 3],
    hi: [usize; 3],
    count: u32,
}

impl ColorBox {
    /// Tight box around all populated cells within `lo..=hi`; `None` when empty
    fn fit(histogram: &Histogram, lo: [usize; 3], hi: [usize; 3]) -> Option<Self> {
        let mut min = [usize::MAX; 3];
        let mut max = [0usize; 3];
        let mut count = 0u32;

        for cell in cells(lo, hi) {
            let n = histogram.count(cell);
            if n == 0 {
                continue;
            }
            count += n;
            for axis in 0..3 {
                min[axis] = min[axis].min(cell[axis]);
                max[axis] = max[axis].max(cell[axis]);
            }
        }

        (count > 0).then_some(Self {
            lo: min,
            hi: max,
            count,
        })
    }

    fn volume(&self) -> u64 {
        (0..3)
            .map(|axis| (self.hi[axis] - self.lo[axis] + 1) as u64)
            .product()
    }

    /// Population-weighted mean color, mapped back to 8 bits per channel
    fn average(&self, histogram: &Histogram) -> [u8; 3] {
        let mult = (1usize << RSHIFT) as f64;
        let mut sums = [0f64; 3];
        let mut total = 0f64;

        for cell in cells(self.lo, self.hi) {
            let n = histogram.count(cell) as f64;
            if n == 0.0 {
                continue;
            }
            total += n;
            for axis in 0..3 {
                sums[axis] += n * (cell[axis] as f64 + 0.5) * mult;
            }
        }

        let mut rgb = [0u8; 3];
        for axis in 0..3 {
            rgb[axis] = (sums[axis] / total).floor().min(255.0) as u8;
        }
        rgb
    }

    /// Median cut along the widest axis
    fn split(&self, histogram: &Histogram) -> Option<(ColorBox, ColorBox)> {
        let widths = [
            self.hi[0] - self.lo[0],
            self.hi[1] - self.lo[1],
            self.hi[2] - self.lo[2],
        ];
        let axis = (0..3).fold(0, |best, a| if widths[a] > widths[best] { a } else { best });
        let span = widths[axis];
        if span == 0 || self.count < 2 {
            return None;
        }

        // Cumulative population along the axis, relative to lo
        let mut partial = Vec::with_capacity(span + 1);
        let mut running = 0u32;
        for offset in 0..=span {
            let mut slice_lo = self.lo;
            let mut slice_hi = self.hi;
            slice_lo[axis] = self.lo[axis] + offset;
            slice_hi[axis] = self.lo[axis] + offset;
            running += cells(slice_lo, slice_hi)
                .map(|cell| histogram.count(cell))
                .sum::<u32>();
            partial.push(running);
        }

        let half = self.count as f64 / 2.0;
        let median = partial.iter().position(|&p| p as f64 > half)?;

        // Cut towards the side with more room, never on the last slice
        let left = median;
        let right = span - median;
        let cut = if left <= right {
            (span - 1).min(median + right / 2)
        } else {
            (median as isize - 1 - (left / 2) as isize).max(0) as usize
        };

        let mut first_hi = self.hi;
        first_hi[axis] = self.lo[axis] + cut;
        let mut second_lo = self.lo;
        second_lo[axis] = self.lo[axis] + cut + 1;

        let first = ColorBox::fit(histogram, self.lo, first_hi)?;
        let second = ColorBox::fit(histogram, second_lo, self.hi)?;
        Some((first, second))
    }
}

/// Every cell coordinate in the inclusive range `lo..=hi`
fn cells(lo: [usize; 3], hi: [usize; 3]) -> impl Iterator<Item = [usize; 3]> {
    (lo[0]..=hi[0]).flat_map(move |r| {
        (lo[1]..=hi[1]).flat_map(move |g| (lo[2]..=hi[2]).map(move |b| [r, g, b]))
    })
}

/// Quantized color with its pixel population
#[derive(Debug, Clone, Copy)]
struct Swatch {
    rgb: [u8; 3],
    population: u32,
}

impl Swatch {
    /// (hue, saturation, lightness), saturation and lightness in 0.0-1.0
    fn hsl(&self) -> (f64, f64, f64) {
        rgb_to_hsl(self.rgb)
    }
}

fn quantize(histogram: &Histogram, max_colors: usize) -> Vec<Swatch> {
    let top = CELLS_PER_AXIS - 1;
    let Some(initial) = ColorBox::fit(histogram, [0; 3], [top; 3]) else {
        return Vec::new();
    };

    let mut boxes = vec![initial];
    let population_target = (FRACT_BY_POPULATION * max_colors as f64).ceil() as usize;
    split_boxes(&mut boxes, histogram, population_target, |b| b.count as u64);
    split_boxes(&mut boxes, histogram, max_colors, |b| {
        b.count as u64 * b.volume()
    });

    boxes
        .iter()
        .map(|b| Swatch {
            rgb: b.average(histogram),
            population: b.count,
        })
        .collect()
}

/// Repeatedly split the highest-priority box until `target` boxes exist
/// or nothing splittable remains
fn split_boxes<F>(boxes: &mut Vec<ColorBox>, histogram: &Histogram, target: usize, priority: F)
where
    F: Fn(&ColorBox) -> u64,
{
    let mut unsplittable = Vec::new();

    while boxes.len() + unsplittable.len() < target {
        let Some(idx) = boxes
            .iter()
            .enumerate()
            .max_by_key(|(_, b)| priority(b))
            .map(|(i, _)| i)
        else {
            break;
        };

        let candidate = boxes.swap_remove(idx);
        match candidate.split(histogram) {
            Some((first, second)) => {
                boxes.push(first);
                boxes.push(second);
            }
            None => unsplittable.push(candidate),
        }
    }

    boxes.extend(unsplittable);
}

// ============================================================================
// Slot Selection
// ============================================================================

struct SlotTarget {
    target_luma: f64,
    min_luma: f64,
    max_luma: f64,
    target_saturation: f64,
    min_saturation: f64,
    max_saturation: f64,
}

fn slot_target(slot: PaletteSlot) -> SlotTarget {
    let (target_luma, min_luma, max_luma) = match slot {
        PaletteSlot::Vibrant | PaletteSlot::Muted => {
            (TARGET_NORMAL_LUMA, MIN_NORMAL_LUMA, MAX_NORMAL_LUMA)
        }
        PaletteSlot::LightVibrant | PaletteSlot::LightMuted => {
            (TARGET_LIGHT_LUMA, MIN_LIGHT_LUMA, 1.0)
        }
        PaletteSlot::DarkVibrant | PaletteSlot::DarkMuted => (TARGET_DARK_LUMA, 0.0, MAX_DARK_LUMA),
    };

    let (target_saturation, min_saturation, max_saturation) = match slot {
        PaletteSlot::Vibrant | PaletteSlot::LightVibrant | PaletteSlot::DarkVibrant => {
            (TARGET_VIBRANT_SATURATION, MIN_VIBRANT_SATURATION, 1.0)
        }
        PaletteSlot::Muted | PaletteSlot::LightMuted | PaletteSlot::DarkMuted => {
            (TARGET_MUTED_SATURATION, 0.0, MAX_MUTED_SATURATION)
        }
    };

    SlotTarget {
        target_luma,
        min_luma,
        max_luma,
        target_saturation,
        min_saturation,
        max_saturation,
    }
}

fn select_slots(swatches: &[Swatch]) -> PaletteResult {
    let max_population = swatches.iter().map(|s| s.population).max().unwrap_or(0);
    let mut taken = vec![false; swatches.len()];
    let mut palette = Vec::new();

    for slot in PaletteSlot::ALL {
        let target = slot_target(slot);
        let best = swatches
            .iter()
            .enumerate()
            .filter(|(i, _)| !taken[*i])
            .filter_map(|(i, swatch)| {
                let (_, saturation, luma) = swatch.hsl();
                let in_window = saturation >= target.min_saturation
                    && saturation <= target.max_saturation
                    && luma >= target.min_luma
                    && luma <= target.max_luma;
                in_window.then(|| {
                    let value = score(&target, saturation, luma, swatch.population, max_population);
                    (i, value)
                })
            })
            .max_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((i, _)) = best {
            taken[i] = true;
            let [r, g, b] = swatches[i].rgb;
            palette.push(ColorSwatch::from_rgb(r, g, b));
        }
    }

    palette
}

fn score(target: &SlotTarget, saturation: f64, luma: f64, population: u32, max_population: u32) -> f64 {
    let relative_population = if max_population == 0 {
        0.0
    } else {
        population as f64 / max_population as f64
    };

    let weighted = invert_diff(saturation, target.target_saturation) * WEIGHT_SATURATION
        + invert_diff(luma, target.target_luma) * WEIGHT_LUMA
        + relative_population * WEIGHT_POPULATION;

    weighted / (WEIGHT_SATURATION + WEIGHT_LUMA + WEIGHT_POPULATION)
}

fn invert_diff(value: f64, target: f64) -> f64 {
    1.0 - (value - target).abs()
}

fn rgb_to_hsl([r, g, b]: [u8; 3]) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let lightness = (max + min) / 2.0;

    if max == min {
        return (0.0, 0.0, lightness);
    }

    let delta = max - min;
    let saturation = if lightness > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };

    let hue = if max == r {
        (g - b) / delta + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    (hue / 6.0, saturation, lightness)
}
