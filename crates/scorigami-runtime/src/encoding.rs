//! Visual encoding: node size and color, edge color and width, borders.
//!
//! Pure functions. The only per-dataset state is [`DepthScales`], which is
//! fit once after assembly and passed in for gradient coloring.

use scorigami_core::tier::{LayoutTier, TierParams};
use scorigami_core::types::{GraphDataset, Node};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Size of the root node.
pub const ROOT_SIZE: f64 = 14.0;

pub const ROOT_COLOR: &str = "#FF3B30";
pub const NEVER_OCCURRED_COLOR: &str = "#dc2626";
pub const FALLBACK_COLOR: &str = "#666666";

/// Category palette indexed by depth. Slot 0 is the root's red, so
/// played depth-1 nodes start at orange.
pub const DEPTH_COLORS: [&str; 6] = ["#FF3B30", "#FF9500", "#FFD60A", "#30D158", "#5AC8FA", "#BF5AF2"];

const GRADIENT_HUE: f64 = 220.0;
const GRADIENT_SATURATION: f64 = 80.0;
const GRADIENT_FLOOR: f64 = 0.2;
const GRADIENT_LIGHTEST: f64 = 90.0;
const GRADIENT_SPAN: f64 = 60.0;

/// How non-root, played nodes are colored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeColorMode {
    #[default]
    Category,
    Gradient,
}

impl NodeColorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Gradient => "gradient",
        }
    }
}

impl fmt::Display for NodeColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "category" => Ok(Self::Category),
            "gradient" => Ok(Self::Gradient),
            other => Err(format!("color mode must be category|gradient, got '{}'", other)),
        }
    }
}

/// Occurrence range of one depth band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    pub min: u64,
    pub max: u64,
}

impl ScaleParams {
    /// Position of `occurrences` in the band, mapped into `[0.2, 1]`.
    /// A band with a single value maps everything to the midpoint.
    pub fn intensity(&self, occurrences: u64) -> f64 {
        let unit = if self.max > self.min {
            let span = (self.max - self.min) as f64;
            ((occurrences as f64 - self.min as f64) / span).clamp(0.0, 1.0)
        } else {
            0.5
        };
        GRADIENT_FLOOR + unit * (1.0 - GRADIENT_FLOOR)
    }
}

/// Per-depth occurrence scales, rebuilt whenever the dataset changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthScales {
    scales: BTreeMap<u32, ScaleParams>,
}

impl DepthScales {
    /// Fit one scale per depth over the played, non-root nodes.
    pub fn fit(dataset: &GraphDataset) -> Self {
        let mut scales: BTreeMap<u32, ScaleParams> = BTreeMap::new();
        for node in dataset.nodes.iter().filter(|n| !n.is_root() && !n.is_scorigami()) {
            scales
                .entry(node.depth)
                .and_modify(|s| {
                    s.min = s.min.min(node.occurrences);
                    s.max = s.max.max(node.occurrences);
                })
                .or_insert(ScaleParams {
                    min: node.occurrences,
                    max: node.occurrences,
                });
        }
        Self { scales }
    }

    pub fn get(&self, depth: u32) -> Option<&ScaleParams> {
        self.scales.get(&depth)
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }
}

/// Draw size of a node.
pub fn node_size(node: &Node, tier: LayoutTier) -> f64 {
    if node.is_root() {
        return ROOT_SIZE;
    }
    let min = TierParams::for_tier(tier).min_node_size;
    let base = (node.norm * 60.0).max(2.0);
    let bonus = ((node.occurrences as f64) + 1.0).ln() * 1.5;
    (base + bonus).max(min)
}

/// Fill color of a node as `#rrggbb`.
pub fn node_color(node: &Node, mode: NodeColorMode, scales: &DepthScales) -> String {
    if node.is_root() {
        return ROOT_COLOR.to_string();
    }
    if node.is_scorigami() {
        return NEVER_OCCURRED_COLOR.to_string();
    }
    match mode {
        NodeColorMode::Category => depth_color(node.depth).to_string(),
        NodeColorMode::Gradient => {
            let t = scales
                .get(node.depth)
                .map_or(GRADIENT_FLOOR, |s| s.intensity(node.occurrences));
            hsl_to_hex(GRADIENT_HUE, GRADIENT_SATURATION, GRADIENT_LIGHTEST - GRADIENT_SPAN * t)
        }
    }
}

/// Category palette lookup.
pub fn depth_color(depth: u32) -> &'static str {
    DEPTH_COLORS
        .get(depth as usize)
        .copied()
        .unwrap_or(FALLBACK_COLOR)
}

/// Border width and color of a node.
pub fn node_border(node: &Node) -> (f64, &'static str) {
    if node.is_root() {
        (3.0, "#ffffff")
    } else if node.is_scorigami() {
        (2.0, "#ffffff")
    } else {
        (1.0, "#000000")
    }
}

/// Depth that drives an edge's encoding.
pub fn edge_depth(from: &Node, to: &Node) -> u32 {
    from.depth.max(to.depth)
}

pub fn edge_color(depth: u32) -> String {
    let lightness = (40.0 + 10.0 * depth as f64).min(100.0);
    format!("hsla(200, 60%, {}%, 0.8)", lightness)
}

pub fn edge_width(depth: u32) -> f64 {
    1.0 + 0.3 * depth as f64
}

/// `h` in degrees, `s` and `l` in percent.
pub fn hsl_to_hex(h: f64, s: f64, l: f64) -> String {
    let s = (s / 100.0).clamp(0.0, 1.0);
    let l = (l / 100.0).clamp(0.0, 1.0);
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorigami_core::types::Edge;

    fn node(id: u32, depth: u32, occurrences: u64, norm: f64) -> Node {
        Node {
            id,
            slug: format!("n{}", id),
            depth,
            played: occurrences > 0,
            occurrences,
            norm,
        }
    }

    #[test]
    fn root_size_is_fixed() {
        for tier in [LayoutTier::Small, LayoutTier::Massive] {
            assert_eq!(node_size(&Node::root(), tier), ROOT_SIZE);
        }
    }

    #[test]
    fn size_grows_with_norm_and_occurrences() {
        let big = node(1, 1, 1_000, 1.0);
        let expected = 60.0 + (1_001f64).ln() * 1.5;
        assert!((node_size(&big, LayoutTier::Small) - expected).abs() < 1e-9);

        let small = node(2, 3, 1, 0.001);
        assert!(node_size(&small, LayoutTier::Small) < node_size(&big, LayoutTier::Small));
    }

    #[test]
    fn size_floor_rises_with_tier() {
        let tiny = node(3, 4, 0, 0.0);
        assert_eq!(node_size(&tiny, LayoutTier::Small), 5.0);
        assert_eq!(node_size(&tiny, LayoutTier::Extreme), 6.0);
        assert_eq!(node_size(&tiny, LayoutTier::Massive), 7.0);
    }

    #[test]
    fn never_occurred_wins_in_both_modes() {
        let ds = GraphDataset::new(vec![node(1, 2, 9, 1.0)], vec![]);
        let scales = DepthScales::fit(&ds);
        let mut unplayed = node(5, 2, 40, 0.5);
        unplayed.played = false;
        let zero = node(6, 2, 0, 0.0);
        for mode in [NodeColorMode::Category, NodeColorMode::Gradient] {
            assert_eq!(node_color(&unplayed, mode, &scales), NEVER_OCCURRED_COLOR);
            assert_eq!(node_color(&zero, mode, &scales), NEVER_OCCURRED_COLOR);
            assert_eq!(node_color(&Node::root(), mode, &scales), ROOT_COLOR);
        }
    }

    #[test]
    fn category_palette_with_fallback() {
        let scales = DepthScales::default();
        let first = node_color(&node(1, 1, 3, 0.1), NodeColorMode::Category, &scales);
        assert_eq!(first, "#FF9500");
        assert_ne!(first, ROOT_COLOR);
        assert_eq!(node_color(&node(2, 2, 3, 0.1), NodeColorMode::Category, &scales), "#FFD60A");
        assert_eq!(node_color(&node(3, 5, 3, 0.1), NodeColorMode::Category, &scales), "#BF5AF2");
        assert_eq!(node_color(&node(4, 6, 3, 0.1), NodeColorMode::Category, &scales), FALLBACK_COLOR);
        assert_eq!(node_color(&node(5, 9, 3, 0.1), NodeColorMode::Category, &scales), FALLBACK_COLOR);
    }

    #[test]
    fn gradient_scales_are_per_depth() {
        // depth 1 counts dwarf depth 3 counts; each band still spans the full range
        let ds = GraphDataset::new(
            vec![
                Node::root(),
                node(1, 1, 10_000, 1.0),
                node(2, 1, 100_000, 1.0),
                node(3, 3, 1, 0.0),
                node(4, 3, 10, 0.0),
            ],
            vec![Edge::new(0, 1)],
        );
        let scales = DepthScales::fit(&ds);
        assert_eq!(scales.len(), 2);
        assert_eq!(scales.get(1), Some(&ScaleParams { min: 10_000, max: 100_000 }));

        let top_of_d1 = node_color(&ds.nodes[2], NodeColorMode::Gradient, &scales);
        let top_of_d3 = node_color(&ds.nodes[4], NodeColorMode::Gradient, &scales);
        assert_eq!(top_of_d1, top_of_d3);
        assert_eq!(top_of_d1, hsl_to_hex(220.0, 80.0, 30.0));

        let bottom_of_d3 = node_color(&ds.nodes[3], NodeColorMode::Gradient, &scales);
        assert_eq!(bottom_of_d3, hsl_to_hex(220.0, 80.0, 78.0));
    }

    #[test]
    fn single_value_band_uses_midpoint() {
        let s = ScaleParams { min: 7, max: 7 };
        assert!((s.intensity(7) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn edge_weight_increases_with_depth() {
        let a = node(1, 1, 1, 0.0);
        let b = node(2, 4, 1, 0.0);
        assert_eq!(edge_depth(&a, &b), 4);
        assert_eq!(edge_color(1), "hsla(200, 60%, 50%, 0.8)");
        assert_eq!(edge_color(9), "hsla(200, 60%, 100%, 0.8)");
        assert!(edge_width(5) > edge_width(1));
        assert!((edge_width(0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn hsl_conversion() {
        assert_eq!(hsl_to_hex(0.0, 100.0, 50.0), "#ff0000");
        assert_eq!(hsl_to_hex(120.0, 100.0, 50.0), "#00ff00");
        assert_eq!(hsl_to_hex(220.0, 0.0, 100.0), "#ffffff");
        assert_eq!(hsl_to_hex(220.0, 80.0, 0.0), "#000000");
    }

    #[test]
    fn borders() {
        assert_eq!(node_border(&Node::root()), (3.0, "#ffffff"));
        assert_eq!(node_border(&node(1, 1, 0, 0.0)), (2.0, "#ffffff"));
        assert_eq!(node_border(&node(2, 1, 5, 0.1)), (1.0, "#000000"));
    }

    #[test]
    fn color_mode_parses() {
        assert_eq!("Gradient".parse::<NodeColorMode>(), Ok(NodeColorMode::Gradient));
        assert!("rainbow".parse::<NodeColorMode>().is_err());
    }
}
