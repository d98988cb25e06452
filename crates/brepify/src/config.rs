//! Conversion settings.
//!
//! Every field has a default, so a TOML file only needs the keys it
//! changes:
//!
//! ```toml
//! angle_threshold = 15.0
//! plane_tolerance = 0.005
//! parallel = false
//!
//! [heuristics.fit]
//! min_elongation = 1.5
//! ```
//!
//! Angles are in degrees; lengths are in model units (millimetres for
//! typical STL input).

use std::path::Path;

use brepify_kernel::KernelSettings;
use brepify_math::Tolerance;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How fitted primitives are turned into faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveReplacementStrategy {
    /// Keep every triangle.
    None,
    /// Build analytic faces trimmed by the region's own mesh boundary.
    #[default]
    BoundaryTrimmed,
    /// Cut the region out and fuse an ideal primitive in its place.
    /// Not supported; rejected by [`ConversionConfig::validate`].
    BooleanCutFuse,
}

/// Named constants steering primitive fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitHeuristics {
    /// Point-cloud elongation (ratio of the two largest principal spreads)
    /// above which the long axis is also tried as a cylinder or cone axis.
    pub min_elongation: f64,
    /// Largest allowed relative standard deviation of cylinder radii.
    pub max_radius_rel_std: f64,
    /// Smallest cylinder or cone height.
    pub min_height: f64,
    /// Smallest curved-surface radius.
    pub min_radius: f64,
    /// Largest curved-surface radius.
    pub max_radius: f64,
    /// Largest radius as a multiple of the region's bounding diagonal.
    pub max_radius_to_extent: f64,
    /// Smallest normal spread (`1 - |mean normal|`) for curved kinds.
    pub min_normal_spread: f64,
    /// Largest mean angle between triangle normals and the fitted
    /// surface's normals (degrees).
    pub max_normal_deviation: f64,
    /// Fits whose errors differ by less than this fraction of the larger
    /// tolerance are tied; ties keep the kind tried first.
    pub error_tie_fraction: f64,
    /// Axis re-estimation rounds for cones.
    pub cone_iterations: u32,
    /// Cones flatter than this degenerate to cylinders (degrees).
    pub min_cone_half_angle: f64,
    /// Cones wider than this degenerate to planes (degrees).
    pub max_cone_half_angle: f64,
    /// A plane with error below this fraction of its tolerance ends the search.
    pub plane_early_exit: f64,
    /// Gauss-Newton iterations for cylinder refinement.
    pub refine_iterations: u32,
}

impl Default for FitHeuristics {
    fn default() -> Self {
        Self {
            min_elongation: 1.3,
            max_radius_rel_std: 0.3,
            min_height: 1e-3,
            min_radius: 1e-3,
            max_radius: 1e4,
            max_radius_to_extent: 10.0,
            min_normal_spread: 1e-3,
            max_normal_deviation: 10.0,
            error_tie_fraction: 0.01,
            cone_iterations: 5,
            min_cone_half_angle: 2.0,
            max_cone_half_angle: 80.0,
            plane_early_exit: 0.01,
            refine_iterations: 10,
        }
    }
}

/// Named constants steering face unification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifyHeuristics {
    /// Tolerance factor while any curved face is present.
    pub curved_tolerance_scale: f64,
    /// Tolerance factor when only planar faces remain.
    pub planar_tolerance_scale: f64,
}

impl Default for UnifyHeuristics {
    fn default() -> Self {
        Self {
            curved_tolerance_scale: 0.5,
            planar_tolerance_scale: 2.0,
        }
    }
}

/// Grouped heuristic constants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    /// Fitting constants.
    pub fit: FitHeuristics,
    /// Unification constants.
    pub unify: UnifyHeuristics,
}

/// Settings for one [`ConversionPipeline`](crate::ConversionPipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Growth-phase normal deviation limit (degrees).
    pub angle_threshold: f64,
    /// Coplanar-phase normal deviation limit (degrees).
    pub coplanar_angle: f64,
    /// Flat patch size at which a region stops following curvature.
    pub flat_lock_faces: usize,
    /// Regions with fewer triangles are not fitted.
    pub min_region_faces: usize,
    /// RMS tolerance for planes.
    pub plane_tolerance: f64,
    /// RMS tolerance for cylinders.
    pub cylinder_tolerance: f64,
    /// RMS tolerance for spheres.
    pub sphere_tolerance: f64,
    /// RMS tolerance for cones.
    pub cone_tolerance: f64,
    /// Required fraction of points within tolerance.
    pub min_inlier_ratio: f64,
    /// First sewing tolerance.
    pub sewing_tolerance: f64,
    /// Last sewing tolerance; the ladder doubles up to here.
    pub max_sewing_tolerance: f64,
    /// Sewing stops once free edges are at most this fraction of the face count.
    pub acceptable_free_edge_ratio: f64,
    /// Plane offset / axis distance / radius tolerance for unification.
    pub unify_linear_tolerance: f64,
    /// Direction tolerance for unification (degrees).
    pub unify_angular_tolerance: f64,
    /// Replace fitted regions with analytic faces.
    pub enable_analytic_replacement: bool,
    /// How replacement is performed.
    pub replacement_strategy: PrimitiveReplacementStrategy,
    /// Vertex deduplication grid.
    pub vertex_precision: f64,
    /// Largest distance of a trim vertex from its analytic surface.
    pub max_trim_deviation: f64,
    /// Refine accepted cylinders with Gauss-Newton.
    pub refine_cylinders: bool,
    /// Run face unification after assembly.
    pub optimize: bool,
    /// Fit regions on the rayon pool.
    pub parallel: bool,
    /// Heuristic constants.
    pub heuristics: Heuristics,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            angle_threshold: 12.0,
            coplanar_angle: 1.0,
            flat_lock_faces: 4,
            min_region_faces: 2,
            plane_tolerance: 0.01,
            cylinder_tolerance: 0.02,
            sphere_tolerance: 0.02,
            cone_tolerance: 0.02,
            min_inlier_ratio: 0.85,
            sewing_tolerance: 1e-6,
            max_sewing_tolerance: 1e-3,
            acceptable_free_edge_ratio: 0.01,
            unify_linear_tolerance: 1e-4,
            unify_angular_tolerance: 0.1,
            enable_analytic_replacement: true,
            replacement_strategy: PrimitiveReplacementStrategy::BoundaryTrimmed,
            vertex_precision: 1e-4,
            max_trim_deviation: 0.05,
            refine_cylinders: true,
            optimize: true,
            parallel: true,
            heuristics: Heuristics::default(),
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be positive, got {value}")))
    }
}

impl ConversionConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// A configuration that keeps every triangle.
    pub fn triangulated() -> Self {
        Self {
            enable_analytic_replacement: false,
            ..Self::default()
        }
    }

    /// True when fitting and analytic faces are enabled.
    pub fn analytic_replacement(&self) -> bool {
        self.enable_analytic_replacement
            && self.replacement_strategy != PrimitiveReplacementStrategy::None
    }

    /// Unification tolerance before adaptive scaling.
    pub fn unify_tolerance(&self) -> Tolerance {
        Tolerance::from_degrees(self.unify_linear_tolerance, self.unify_angular_tolerance)
    }

    /// Kernel settings matching this configuration.
    pub fn kernel_settings(&self) -> KernelSettings {
        KernelSettings {
            max_trim_deviation: self.max_trim_deviation,
            ..KernelSettings::default()
        }
    }

    /// Check ranges and reject unsupported combinations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.angle_threshold > 0.0 && self.angle_threshold <= 90.0) {
            return Err(invalid("angle_threshold must be in (0, 90] degrees"));
        }
        if !(self.coplanar_angle > 0.0 && self.coplanar_angle <= self.angle_threshold) {
            return Err(invalid("coplanar_angle must be in (0, angle_threshold]"));
        }
        if self.flat_lock_faces == 0 || self.min_region_faces == 0 {
            return Err(invalid("flat_lock_faces and min_region_faces must be at least 1"));
        }
        positive("plane_tolerance", self.plane_tolerance)?;
        positive("cylinder_tolerance", self.cylinder_tolerance)?;
        positive("sphere_tolerance", self.sphere_tolerance)?;
        positive("cone_tolerance", self.cone_tolerance)?;
        if !(self.min_inlier_ratio > 0.0 && self.min_inlier_ratio <= 1.0) {
            return Err(invalid("min_inlier_ratio must be in (0, 1]"));
        }
        positive("sewing_tolerance", self.sewing_tolerance)?;
        if self.max_sewing_tolerance < self.sewing_tolerance {
            return Err(invalid("max_sewing_tolerance must not be below sewing_tolerance"));
        }
        if !(0.0..=1.0).contains(&self.acceptable_free_edge_ratio) {
            return Err(invalid("acceptable_free_edge_ratio must be in [0, 1]"));
        }
        positive("unify_linear_tolerance", self.unify_linear_tolerance)?;
        positive("unify_angular_tolerance", self.unify_angular_tolerance)?;
        positive("vertex_precision", self.vertex_precision)?;
        positive("max_trim_deviation", self.max_trim_deviation)?;
        if self.replacement_strategy == PrimitiveReplacementStrategy::BooleanCutFuse {
            return Err(invalid("replacement_strategy boolean_cut_fuse is not supported"));
        }

        let fit = &self.heuristics.fit;
        if fit.min_elongation < 1.0 {
            return Err(invalid("heuristics.fit.min_elongation must be at least 1"));
        }
        positive("heuristics.fit.max_radius_rel_std", fit.max_radius_rel_std)?;
        positive("heuristics.fit.min_radius", fit.min_radius)?;
        if fit.max_radius <= fit.min_radius {
            return Err(invalid("heuristics.fit.max_radius must exceed min_radius"));
        }
        positive("heuristics.fit.max_radius_to_extent", fit.max_radius_to_extent)?;
        positive("heuristics.fit.max_normal_deviation", fit.max_normal_deviation)?;
        if fit.error_tie_fraction < 0.0 {
            return Err(invalid("heuristics.fit.error_tie_fraction must not be negative"));
        }
        if fit.cone_iterations == 0 {
            return Err(invalid("heuristics.fit.cone_iterations must be at least 1"));
        }
        if !(fit.min_cone_half_angle > 0.0
            && fit.min_cone_half_angle < fit.max_cone_half_angle
            && fit.max_cone_half_angle < 90.0)
        {
            return Err(invalid(
                "heuristics.fit cone half-angle limits must satisfy 0 < min < max < 90",
            ));
        }
        let unify = &self.heuristics.unify;
        positive("heuristics.unify.curved_tolerance_scale", unify.curved_tolerance_scale)?;
        positive("heuristics.unify.planar_tolerance_scale", unify.planar_tolerance_scale)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ConversionConfig::default().validate().is_ok());
        assert!(ConversionConfig::triangulated().validate().is_ok());
        assert!(!ConversionConfig::triangulated().analytic_replacement());
    }

    #[test]
    fn test_partial_toml() {
        let config = ConversionConfig::from_toml_str(
            "angle_threshold = 15.0\nparallel = false\nreplacement_strategy = \"none\"\n\n[heuristics.fit]\nmin_elongation = 1.5\n",
        )
        .unwrap();
        assert_eq!(config.angle_threshold, 15.0);
        assert!(!config.parallel);
        assert_eq!(config.heuristics.fit.min_elongation, 1.5);
        assert_eq!(config.heuristics.fit.cone_iterations, 5);
        assert_eq!(config.plane_tolerance, 0.01);
        assert!(!config.analytic_replacement());
    }

    #[test]
    fn test_boolean_cut_fuse_rejected() {
        let err = ConversionConfig::from_toml_str("replacement_strategy = \"boolean_cut_fuse\"")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_values_rejected() {
        let mut config = ConversionConfig {
            coplanar_angle: 20.0,
            ..ConversionConfig::default()
        };
        assert!(config.validate().is_err());
        config.coplanar_angle = 1.0;
        config.max_sewing_tolerance = 1e-9;
        assert!(config.validate().is_err());
        assert!(matches!(
            ConversionConfig::from_toml_str("angle_threshold = \"steep\""),
            Err(ConfigError::Toml(_))
        ));
    }
}
