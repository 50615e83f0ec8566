use pixelbox_core::models::image::CHANNELS;

use crate::common::{ColorTable, PALETTE_SIZE, Rgb};

// see https://en.wikipedia.org/wiki/Median_cut

const SAMPLING_THRESHOLD: usize = 100_000;
const SAMPLING_TARGET: usize = 50_000;
const MEDIAN_CUT_DEPTH: u32 = 8;

const BLACK: Rgb = (0, 0, 0);

#[derive(Clone, Copy, Debug, PartialEq)]
enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {

    fn value(&self, color: &Rgb) -> u8 {
        match self {
            Channel::Red => color.0,
            Channel::Green => color.1,
            Channel::Blue => color.2,
        }
    }
}

/// Reduces packed RGBA pixels to a 256 color table and one table index per pixel.
/// Alpha is ignored.
pub fn quantize(pixels: &[u8]) -> (ColorTable, Vec<u8>) {
    let pixel_count = pixels.len() / CHANNELS;
    let step = sample_step(pixel_count);

    let mut samples: Vec<Rgb> = pixels.chunks_exact(CHANNELS)
        .step_by(step)
        .map(|v| (v[0], v[1], v[2]))
        .collect();
    debug!("using {} samples out of {} pixels (step {})", samples.len(), pixel_count, step);

    let mut colors = median_cut(&mut samples, MEDIAN_CUT_DEPTH);
    trace!("median cut produced {} colors", colors.len());
    colors.resize(PALETTE_SIZE, BLACK);

    let color_table = ColorTable::from_rgb(&colors);
    let indices = assign_indices(pixels, &colors);

    (color_table, indices)
}

pub fn sample_step(pixel_count: usize) -> usize {
    if pixel_count > SAMPLING_THRESHOLD {
        pixel_count / SAMPLING_TARGET
    } else {
        1
    }
}

/// Splits `colors` along the widest channel until `depth` is exhausted, one color per bucket.
pub fn median_cut(colors: &mut [Rgb], depth: u32) -> Vec<Rgb> {
    if depth == 0 || colors.is_empty() {
        return vec![average_color(colors)];
    }

    let channel = widest_channel(colors);
    colors.sort_by_key(|v| channel.value(v));

    let middle = colors.len() / 2;
    let (lower, upper) = colors.split_at_mut(middle);

    let mut result = median_cut(lower, depth - 1);
    result.append(&mut median_cut(upper, depth - 1));
    result
}

// ties go to red, then green
fn widest_channel(colors: &[Rgb]) -> Channel {
    let range = |channel: Channel| {
        let (min, max) = colors.iter()
            .map(|v| channel.value(v))
            .fold((u8::MAX, u8::MIN), |(min, max), v| (min.min(v), max.max(v)));
        max.saturating_sub(min)
    };

    let mut widest = Channel::Red;
    let mut widest_range = range(Channel::Red);

    for &channel in &[Channel::Green, Channel::Blue] {
        let channel_range = range(channel);
        if channel_range > widest_range {
            widest = channel;
            widest_range = channel_range;
        }
    }

    widest
}

/// Per-channel mean, rounded half up. Black for an empty bucket.
pub fn average_color(colors: &[Rgb]) -> Rgb {
    if colors.is_empty() {
        return BLACK;
    }

    let total = colors.len() as u64;
    let sum = colors.iter().fold((0u64, 0u64, 0u64), |acc, v| {
        (acc.0 + v.0 as u64, acc.1 + v.1 as u64, acc.2 + v.2 as u64)
    });

    let round = |sum: u64| ((2 * sum + total) / (2 * total)) as u8;
    (round(sum.0), round(sum.1), round(sum.2))
}

/// Index of the closest palette color by squared distance, lowest index on ties.
pub fn nearest_color_index(palette: &[Rgb], color: &Rgb) -> u8 {
    let mut closest = 0;
    let mut closest_distance = u32::MAX;

    for (index, candidate) in palette.iter().enumerate() {
        let distance = squared_distance(candidate, color);
        if distance < closest_distance {
            closest_distance = distance;
            closest = index;
        }
    }

    closest as u8
}

fn assign_indices(pixels: &[u8], palette: &[Rgb]) -> Vec<u8> {
    let mut indices = Vec::with_capacity(pixels.len() / CHANNELS);
    let mut previous: Option<(Rgb, u8)> = None;

    for pixel in pixels.chunks_exact(CHANNELS) {
        let color = (pixel[0], pixel[1], pixel[2]);

        // matches previous pixel?
        let index = match previous {
            Some((previous_color, previous_index)) if previous_color == color => previous_index,
            _ => nearest_color_index(palette, &color),
        };

        previous = Some((color, index));
        indices.push(index);
    }

    indices
}

fn squared_distance(a: &Rgb, b: &Rgb) -> u32 {
    let dr = a.0 as i32 - b.0 as i32;
    let dg = a.1 as i32 - b.1 as i32;
    let db = a.2 as i32 - b.2 as i32;

    (dr * dr + dg * dg + db * db) as u32
}
