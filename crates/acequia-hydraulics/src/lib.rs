//! Manning's-equation flow calculator for open channels.
//!
//! # Purpose
//! Converts a water depth measurement plus channel geometry into flow rate,
//! velocity, cross-sectional area, wetted perimeter, and hydraulic radius:
//!
//! `Q = (u / n) * A * R^(2/3) * S^(1/2)`
//!
//! where `u` is the unit factor (1 for SI, 1.49 for US customary), `n` is
//! Manning's roughness coefficient, `A` the flow area, `R = A / P` the
//! hydraulic radius, `P` the wetted perimeter, and `S` the bed slope.
//!
//! # Notes
//! The calculator is a pure function: no state, no I/O. Inputs that make no
//! flow computable (zero depth, missing slope/roughness, degenerate geometry)
//! yield the all-zero result rather than an error, because downstream
//! consumers treat "no flow" as a valid reading. Outputs are rounded to six
//! decimal places so repeated computations are bit-identical.
use serde::{Deserialize, Serialize};

/// Channel cross-section shape with its shape-specific dimensions (meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CrossSection {
    Trapezoid {
        bottom_width: f64,
        /// Side slope as horizontal run per unit of rise (H:V).
        side_slope: f64,
    },
    Rectangle {
        bottom_width: f64,
    },
    Circle {
        diameter: f64,
    },
}

/// Manning's parameters for one channel, owned by channel metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(flatten)]
    pub cross_section: CrossSection,
    /// Bed slope (dimensionless).
    pub slope: f64,
    /// Manning's roughness coefficient `n`.
    pub roughness: f64,
    /// Unit factor `u`: 1.0 for SI, 1.49 for US customary.
    #[serde(default = "default_unit_factor")]
    pub unit_factor: f64,
    /// Optional sensor calibration ceiling (m). Measured depths above it
    /// are treated as sensor noise and clamped before computing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<f64>,
}

fn default_unit_factor() -> f64 {
    1.0
}

/// Result of one Manning's computation. All fields rounded to 6 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowComputation {
    /// Flow rate `Q` (m³/s).
    pub flow_rate: f64,
    /// Cross-sectional flow area `A` (m²).
    pub area: f64,
    /// Wetted perimeter `P` (m).
    pub wetted_perimeter: f64,
    /// Hydraulic radius `R = A / P` (m).
    pub hydraulic_radius: f64,
    /// Mean velocity `V` (m/s).
    pub velocity: f64,
}

impl FlowComputation {
    /// The "no flow computable" result: every field zero.
    pub const ZERO: Self = Self {
        flow_rate: 0.0,
        area: 0.0,
        wetted_perimeter: 0.0,
        hydraulic_radius: 0.0,
        velocity: 0.0,
    };
}

/// Compute flow metrics for a water depth (meters) and channel geometry.
///
/// Depth is clamped to `max_depth` when the geometry carries one.
/// Returns [`FlowComputation::ZERO`] when depth is non-positive, slope or
/// roughness is non-positive, a circular section has a non-positive
/// diameter, or the computed area/perimeter is non-positive. Never returns
/// NaN, negative, or infinite values for physically valid geometry.
pub fn compute(depth: f64, geometry: &Geometry) -> FlowComputation {
    if depth <= 0.0 || geometry.slope <= 0.0 || geometry.roughness <= 0.0 {
        return FlowComputation::ZERO;
    }
    let depth = match geometry.max_depth {
        Some(ceiling) if ceiling > 0.0 => depth.min(ceiling),
        _ => depth,
    };

    let (area, wetted_perimeter) = match geometry.cross_section {
        CrossSection::Trapezoid {
            bottom_width,
            side_slope,
        } => {
            // A = (b + z*y) * y ; P = b + 2*y*sqrt(1 + z^2)
            let area = (bottom_width + side_slope * depth) * depth;
            let perimeter = bottom_width + 2.0 * depth * (1.0 + side_slope * side_slope).sqrt();
            (area, perimeter)
        }
        CrossSection::Rectangle { bottom_width } => {
            (bottom_width * depth, bottom_width + 2.0 * depth)
        }
        CrossSection::Circle { diameter } => {
            if diameter <= 0.0 {
                return FlowComputation::ZERO;
            }
            // Partially-full pipe; depth clamped to a full pipe.
            let ratio = (depth / diameter).min(1.0);
            let theta = 2.0 * (1.0 - 2.0 * ratio).acos();
            let area = diameter * diameter / 8.0 * (theta - theta.sin());
            let perimeter = diameter / 2.0 * theta;
            (area, perimeter)
        }
    };

    if area <= 0.0 || wetted_perimeter <= 0.0 {
        return FlowComputation::ZERO;
    }

    let hydraulic_radius = area / wetted_perimeter;
    let velocity = geometry.unit_factor / geometry.roughness
        * hydraulic_radius.powf(2.0 / 3.0)
        * geometry.slope.sqrt();
    let flow_rate = velocity * area;

    FlowComputation {
        flow_rate: round6(flow_rate),
        area: round6(area),
        wetted_perimeter: round6(wetted_perimeter),
        hydraulic_radius: round6(hydraulic_radius),
        velocity: round6(velocity),
    }
}

// Fixed rounding keeps results reproducible across repeated computations.
fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
