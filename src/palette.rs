//! Deterministic RM colors and probability-proportional marker sizes.

use std::collections::HashSet;

pub const MIN_MARKER: f64 = 10.0;
pub const MAX_MARKER: f64 = 20.0;
/// Used for every RM when the palette cannot cover the set.
pub const DEFAULT_RM_COLOR: &str = "#FF6F00";

const SAFE: [&str; 11] = [
    "rgb(136, 204, 238)",
    "rgb(204, 102, 119)",
    "rgb(221, 204, 119)",
    "rgb(17, 119, 51)",
    "rgb(51, 34, 136)",
    "rgb(170, 68, 153)",
    "rgb(68, 170, 153)",
    "rgb(153, 153, 51)",
    "rgb(136, 34, 85)",
    "rgb(102, 17, 0)",
    "rgb(136, 136, 136)",
];

const PLOTLY: [&str; 10] = [
    "#636EFA", "#EF553B", "#00CC96", "#AB63FA", "#FFA15A", "#19D3F3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

const SET2: [&str; 8] = [
    "rgb(102,194,165)",
    "rgb(252,141,98)",
    "rgb(141,160,203)",
    "rgb(231,138,195)",
    "rgb(166,216,84)",
    "rgb(255,217,47)",
    "rgb(229,196,148)",
    "rgb(179,179,179)",
];

const DARK2: [&str; 8] = [
    "rgb(27,158,119)",
    "rgb(217,95,2)",
    "rgb(117,112,179)",
    "rgb(231,41,138)",
    "rgb(102,166,30)",
    "rgb(230,171,2)",
    "rgb(166,118,29)",
    "rgb(102,102,102)",
];

/// Safe, Plotly, Set2 and Dark2 concatenated in that order, first occurrence
/// of each color kept.
pub fn palette() -> Vec<&'static str> {
    let mut seen = HashSet::new();
    SAFE.iter()
        .chain(PLOTLY.iter())
        .chain(SET2.iter())
        .chain(DARK2.iter())
        .copied()
        .filter(|c| seen.insert(*c))
        .collect()
}

/// Color per RM, in the order given. Colors follow the ascending sort of the
/// identifiers, so the same id always gets the same color regardless of where
/// it appears. An empty result means the set is larger than the palette and
/// every RM should use `DEFAULT_RM_COLOR`.
pub fn colors_for(rms: &[i64]) -> Vec<String> {
    let colors = palette();
    if rms.len() > colors.len() {
        return Vec::new();
    }
    let mut sorted = rms.to_vec();
    sorted.sort_unstable();
    rms.iter()
        .map(|id| {
            // position of the first occurrence keeps duplicates on one color
            let rank = sorted.partition_point(|v| v < id);
            colors[rank].to_string()
        })
        .collect()
}

/// Color for the i-th RM of a `colors_for` result.
pub fn color_or_default(colors: &[String], i: usize) -> String {
    colors
        .get(i)
        .cloned()
        .unwrap_or_else(|| DEFAULT_RM_COLOR.to_string())
}

/// Linear map of each probability onto `[MIN_MARKER, MAX_MARKER]` relative to
/// the min/max of the set. Equal probabilities all get `MIN_MARKER`.
pub fn marker_sizes(probs: &[f64]) -> Vec<f64> {
    let min = probs.iter().copied().fold(f64::INFINITY, f64::min);
    let max = probs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    probs
        .iter()
        .map(|&p| {
            if max == min {
                MIN_MARKER
            } else {
                MIN_MARKER + (p - min) * (MAX_MARKER - MIN_MARKER) / (max - min)
            }
        })
        .collect()
}
