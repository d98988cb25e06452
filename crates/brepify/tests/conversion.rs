//! End-to-end conversion of synthetic meshes.

use approx::assert_relative_eq;
use brepify::adjacency::WeldedMesh;
use brepify::segment::segment;
use brepify::{
    ConversionConfig, ConversionPipeline, ConversionResult, ConversionStatus,
    FaceUnificationOptimizer, PrimitiveCandidate, PrimitiveFitter, RegionOutcome,
};
use brepify_kernel::{Surface, SurfaceKind, SurfaceParams};
use brepify_math::{Dir3, Transform, Vec3};
use brepify_mesh::shapes::{make_box, make_cylinder, make_frustum, make_sphere, make_tube};
use brepify_mesh::Mesh;

fn convert(mesh: &Mesh, config: ConversionConfig) -> ConversionResult {
    ConversionPipeline::new(config).unwrap().convert(mesh)
}

fn assert_success_is_closed(result: &ConversionResult) {
    if result.status == ConversionStatus::Success {
        let shape = result.shape.unwrap();
        assert_eq!(result.kernel.free_edge_count(shape), 0);
        assert_eq!(result.stats.free_edges, 0);
        assert!(result.kernel.is_valid(shape));
    }
}

#[test]
fn box_becomes_six_planes() {
    let result = convert(&make_box(10.0, 20.0, 30.0), ConversionConfig::default());
    assert_eq!(result.status, ConversionStatus::Success);
    let shape = result.shape.unwrap();
    assert!(result.kernel.is_valid(shape));
    let counts = result.surface_counts();
    assert_eq!((counts.plane, counts.total()), (6, 6));
    assert_eq!(result.stats.primitives_replaced.plane, 6);
    assert_relative_eq!(result.kernel.volume(shape), 6000.0, epsilon = 1e-6);
    assert_relative_eq!(result.kernel.area(shape), 2200.0, epsilon = 1e-6);
}

#[test]
fn unfitted_box_unifies_to_six_planes() {
    let config = ConversionConfig {
        min_region_faces: 100,
        ..Default::default()
    };
    let result = convert(&make_box(1.0, 1.0, 1.0), config);
    assert_eq!(result.status, ConversionStatus::Success);
    assert_eq!(result.stats.primitives_replaced.total(), 0);
    assert_eq!(result.stats.faces_before_optimization, 12);
    assert_eq!(result.stats.faces_after_optimization, 6);
    assert!(result.kernel.is_valid(result.shape.unwrap()));
}

#[test]
fn cylinder_radius_and_height() {
    let mesh = make_cylinder(5.0, 10.0, 64, true);
    let config = ConversionConfig::default();

    let welded = WeldedMesh::new(&mesh, config.vertex_precision);
    let regions = segment(&welded, &config).regions;
    let fits = PrimitiveFitter::new(&config).fit_all(&welded, &regions);
    let cylinder = fits
        .iter()
        .find_map(|f| match f.candidate {
            PrimitiveCandidate::Cylinder { radius, height, .. } => Some((radius, height)),
            _ => None,
        })
        .unwrap();
    assert_relative_eq!(cylinder.0, 5.0, epsilon = config.cylinder_tolerance);
    assert_relative_eq!(cylinder.1, 10.0, epsilon = config.cylinder_tolerance);

    let result = convert(&mesh, config);
    assert_eq!(result.status, ConversionStatus::Success);
    let lateral: Vec<_> = result
        .faces()
        .into_iter()
        .filter(|&f| result.kernel.face(f).surface.surface_type() == SurfaceKind::Cylinder)
        .collect();
    assert_eq!(lateral.len(), 1);
    match result.kernel.surface_type_of(lateral[0]).unwrap() {
        SurfaceParams::Cylinder { axis, radius, .. } => {
            assert_relative_eq!(radius, 5.0, epsilon = 1e-3);
            assert!(axis.z.abs() > 0.999);
        }
        other => panic!("expected cylinder, got {other:?}"),
    }
    assert_eq!(result.surface_counts().plane, 2);
}

#[test]
fn tilted_cylinder_is_still_a_cylinder() {
    let axis = Dir3::new_normalize(Vec3::new(1.0, 1.0, 0.0));
    let tilt = Transform::rotation_about_axis(&axis, 0.7);
    let mesh = make_cylinder(3.0, 8.0, 48, true).transformed(&tilt);
    let result = convert(&mesh, ConversionConfig::default());
    assert_eq!(result.status, ConversionStatus::Success);
    assert_eq!(result.surface_counts().cylinder, 1);
}

#[test]
fn frustum_gets_a_cone() {
    let result = convert(&make_frustum(2.0, 1.0, 3.0, 64), ConversionConfig::default());
    assert_eq!(result.status, ConversionStatus::Success);
    let counts = result.surface_counts();
    assert_eq!((counts.cone, counts.plane), (1, 2));
}

#[test]
fn success_means_closed_and_valid() {
    let meshes = [
        ("box", make_box(1.0, 2.0, 3.0)),
        ("cylinder", make_cylinder(2.0, 1.0, 32, true)),
        ("tube", make_tube(4.0, 3.0, 2.0, 40)),
        ("apex cone", make_frustum(2.0, 0.0, 2.0, 32)),
        ("sphere", make_sphere(3.0, 24, 12)),
    ];
    for (name, mesh) in &meshes {
        let result = convert(mesh, ConversionConfig::default());
        assert_eq!(result.status, ConversionStatus::Success, "{name}");
        assert_success_is_closed(&result);
        assert_relative_eq!(
            result.stats.area_after,
            mesh.surface_area(),
            max_relative = 1e-6
        );
    }
}

#[test]
fn sphere_faces_unify_despite_closed_cluster() {
    let mesh = make_sphere(3.0, 48, 24);
    let result = convert(&mesh, ConversionConfig::default());
    assert_eq!(result.status, ConversionStatus::Success);
    let shape = result.shape.unwrap();
    assert!(result.kernel.is_valid(shape));

    let stats = result.stats.optimization.unwrap();
    assert!(stats.faces_before.sphere > 2);
    assert!(stats.merges_applied > 0);
    assert!(result.surface_counts().sphere <= 2);
    assert_relative_eq!(stats.volume_after, stats.volume_before, max_relative = 1e-9);
}

#[test]
fn closed_region_falls_back_to_triangles() {
    let mesh = make_sphere(3.0, 24, 12);
    let config = ConversionConfig {
        angle_threshold: 40.0,
        ..Default::default()
    };
    let result = convert(&mesh, config);
    assert_eq!(result.status, ConversionStatus::Success);
    assert_eq!(result.stats.fallback_regions, 1);
    assert_eq!(result.stats.primitives_replaced.total(), 0);

    let fallback: Vec<_> = result
        .regions
        .iter()
        .filter(|r| r.outcome == RegionOutcome::Fallback)
        .collect();
    assert_eq!(fallback.len(), 1);
    assert_eq!(fallback[0].surface, Some("sphere"));
    assert!(fallback[0].reason.as_deref().is_some_and(|r| r.contains("boundary")));

    assert_success_is_closed(&result);
    assert_relative_eq!(result.stats.area_after, mesh.surface_area(), max_relative = 1e-9);
}

#[test]
fn optimizer_is_idempotent_and_conservative() {
    let config = ConversionConfig {
        min_region_faces: 100,
        ..Default::default()
    };
    let mut result = convert(&make_cylinder(2.0, 3.0, 24, true), config.clone());
    let stats = result.stats.optimization.unwrap();
    assert!(stats.faces_after.total() <= stats.faces_before.total());
    assert!(stats.merges_applied > 0);
    assert_relative_eq!(stats.area_after, stats.area_before, max_relative = 1e-9);
    assert_relative_eq!(stats.volume_after, stats.volume_before, max_relative = 1e-9);

    let shape = result.shape.unwrap();
    let (again, second) = FaceUnificationOptimizer::new(&config).optimize(&mut result.kernel, shape);
    assert_eq!(second.merges_applied, 0);
    assert_eq!(result.kernel.face_count(again), result.kernel.face_count(shape));
}

#[test]
fn disabled_replacement_matches_baseline() {
    let mesh = make_cylinder(2.0, 3.0, 16, true);
    let pipeline = ConversionPipeline::new(ConversionConfig::triangulated()).unwrap();
    let converted = pipeline.convert(&mesh);
    let baseline = pipeline.triangulated_baseline(&mesh);

    assert_eq!(converted.status, ConversionStatus::Success);
    assert_eq!(
        converted.to_step_bytes().unwrap(),
        baseline.to_step_bytes().unwrap()
    );
    let counts = converted.surface_counts();
    assert_eq!(counts.curved(), 0);
    assert_eq!(counts.plane, mesh.triangle_count());
    assert!(converted.regions.is_empty());
    assert!(converted.stats.optimization.is_none());

    // The analytic pipeline's baseline is the same triangulation.
    let analytic = ConversionPipeline::new(ConversionConfig::default()).unwrap();
    assert_eq!(
        analytic.triangulated_baseline(&mesh).to_step_bytes().unwrap(),
        baseline.to_step_bytes().unwrap()
    );
}

#[test]
fn step_output_is_deterministic() {
    let mesh = make_tube(4.0, 3.0, 2.0, 40);
    let first = convert(&mesh, ConversionConfig::default());
    let second = convert(&mesh, ConversionConfig::default());
    let bytes = first.to_step_bytes().unwrap();
    assert_eq!(bytes, second.to_step_bytes().unwrap());
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("ISO-10303-21;"));
}

#[test]
fn config_from_toml_drives_pipeline() {
    let config = ConversionConfig::from_toml_str(
        r#"
        enable_analytic_replacement = false
        parallel = false
        "#,
    )
    .unwrap();
    let result = convert(&make_box(1.0, 1.0, 1.0), config);
    assert_eq!(result.surface_counts().plane, 12);
}
