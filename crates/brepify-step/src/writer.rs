//! STEP (ISO 10303-21) writer.

use std::collections::HashMap;
use std::path::Path;

use brepify_kernel::{
    BRepKernel, EdgeId, FaceId, Orientation, Shape, SurfaceParams, VertexId, Wire,
};
use brepify_math::{orthonormal_basis, Dir3, Point3, Vec3};
use tracing::debug;

use crate::StepError;

/// Write `shape` to a STEP file at `path`.
pub fn write_step(
    kernel: &BRepKernel,
    shape: Shape,
    path: impl AsRef<Path>,
) -> Result<(), StepError> {
    let bytes = write_step_to_buffer(kernel, shape)?;
    std::fs::write(path.as_ref(), bytes)?;
    Ok(())
}

/// Serialize `shape` to STEP bytes.
pub fn write_step_to_buffer(kernel: &BRepKernel, shape: Shape) -> Result<Vec<u8>, StepError> {
    let faces = kernel.faces(shape);
    if faces.is_empty() {
        return Err(StepError::EmptyShape);
    }
    let mut w = StepWriter::new(kernel);
    w.header();

    let mut face_ids = Vec::with_capacity(faces.len());
    for &f in &faces {
        face_ids.push(w.face(f)?);
    }

    let closed = match shape {
        Shape::Solid(_) => true,
        Shape::Shell(s) => kernel.topology().shells[s].closed,
        Shape::Face(_) => false,
    };
    let refs = id_list(&face_ids);
    let (item, representation) = if closed {
        let shell = w.entity(format!("CLOSED_SHELL('',({refs}))"));
        (
            w.entity(format!("MANIFOLD_SOLID_BREP('brepify',#{shell})")),
            "ADVANCED_BREP_SHAPE_REPRESENTATION",
        )
    } else {
        let shell = w.entity(format!("OPEN_SHELL('',({refs}))"));
        (
            w.entity(format!("SHELL_BASED_SURFACE_MODEL('brepify',(#{shell}))")),
            "MANIFOLD_SURFACE_SHAPE_REPRESENTATION",
        )
    };
    w.product(item, representation);
    w.footer();
    debug!(faces = faces.len(), entities = w.next_id - 1, closed, "STEP written");
    Ok(w.out.into_bytes())
}

fn id_list(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| format!("#{id}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn real(x: f64) -> String {
    format!("{:.15E}", if x == 0.0 { 0.0 } else { x })
}

fn bool_flag(b: bool) -> &'static str {
    if b {
        ".T."
    } else {
        ".F."
    }
}

struct StepWriter<'a> {
    kernel: &'a BRepKernel,
    out: String,
    next_id: u64,
    vertices: HashMap<VertexId, u64>,
    edges: HashMap<EdgeId, u64>,
}

impl<'a> StepWriter<'a> {
    fn new(kernel: &'a BRepKernel) -> Self {
        Self {
            kernel,
            out: String::new(),
            next_id: 1,
            vertices: HashMap::new(),
            edges: HashMap::new(),
        }
    }

    fn entity(&mut self, body: String) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.out.push_str(&format!("#{id}={body};\n"));
        id
    }

    fn header(&mut self) {
        self.out.push_str("ISO-10303-21;\nHEADER;\n");
        self.out
            .push_str("FILE_DESCRIPTION(('brepify B-rep export'),'2;1');\n");
        self.out.push_str(&format!(
            "FILE_NAME('brepify.step','1970-01-01T00:00:00',(''),(''),'brepify {}','brepify','');\n",
            env!("CARGO_PKG_VERSION")
        ));
        self.out
            .push_str("FILE_SCHEMA(('AUTOMOTIVE_DESIGN { 1 0 10303 214 1 1 1 1 }'));\n");
        self.out.push_str("ENDSEC;\nDATA;\n");
    }

    fn footer(&mut self) {
        self.out.push_str("ENDSEC;\nEND-ISO-10303-21;\n");
    }

    fn point(&mut self, p: &Point3) -> u64 {
        self.entity(format!(
            "CARTESIAN_POINT('',({},{},{}))",
            real(p.x),
            real(p.y),
            real(p.z)
        ))
    }

    fn direction(&mut self, d: &Vec3) -> u64 {
        self.entity(format!(
            "DIRECTION('',({},{},{}))",
            real(d.x),
            real(d.y),
            real(d.z)
        ))
    }

    fn placement(&mut self, origin: &Point3, axis: &Dir3) -> u64 {
        let (x, _) = orthonormal_basis(axis.as_ref());
        let o = self.point(origin);
        let z = self.direction(axis.as_ref());
        let r = self.direction(&x);
        self.entity(format!("AXIS2_PLACEMENT_3D('',#{o},#{z},#{r})"))
    }

    fn vertex(&mut self, v: VertexId) -> u64 {
        if let Some(&id) = self.vertices.get(&v) {
            return id;
        }
        let p = self.kernel.topology().point(v);
        let pid = self.point(&p);
        let id = self.entity(format!("VERTEX_POINT('',#{pid})"));
        self.vertices.insert(v, id);
        id
    }

    fn edge(&mut self, e: EdgeId) -> u64 {
        if let Some(&id) = self.edges.get(&e) {
            return id;
        }
        let edge = self.kernel.topology().edges[e];
        let start = self.vertex(edge.start);
        let end = self.vertex(edge.end);
        let a = self.kernel.topology().point(edge.start);
        let b = self.kernel.topology().point(edge.end);
        let d = b - a;
        let len = d.norm();
        let pid = self.point(&a);
        let dir = self.direction(&(d / len));
        let vec = self.entity(format!("VECTOR('',#{dir},{})", real(len)));
        let line = self.entity(format!("LINE('',#{pid},#{vec})"));
        let id = self.entity(format!("EDGE_CURVE('',#{start},#{end},#{line},.T.)"));
        self.edges.insert(e, id);
        id
    }

    fn edge_loop(&mut self, wire: &Wire) -> u64 {
        let mut uses = Vec::with_capacity(wire.len());
        for oe in &wire.edges {
            let edge = self.edge(oe.edge);
            let sense = bool_flag(oe.orientation == Orientation::Forward);
            uses.push(self.entity(format!("ORIENTED_EDGE('',*,*,#{edge},{sense})")));
        }
        let list = id_list(&uses);
        self.entity(format!("EDGE_LOOP('',({list}))"))
    }

    fn surface(&mut self, params: &SurfaceParams) -> u64 {
        match *params {
            SurfaceParams::Plane { origin, normal } => {
                let a = self.placement(&origin, &normal);
                self.entity(format!("PLANE('',#{a})"))
            }
            SurfaceParams::Cylinder {
                center,
                axis,
                radius,
            } => {
                let a = self.placement(&center, &axis);
                self.entity(format!("CYLINDRICAL_SURFACE('',#{a},{})", real(radius)))
            }
            SurfaceParams::Cone {
                apex,
                axis,
                half_angle,
            } => {
                // Locate the placement one unit down the axis, where the
                // radius is tan(half_angle).
                let location = apex + axis.as_ref();
                let a = self.placement(&location, &axis);
                self.entity(format!(
                    "CONICAL_SURFACE('',#{a},{},{})",
                    real(half_angle.tan()),
                    real(half_angle)
                ))
            }
            SurfaceParams::Sphere { center, radius } => {
                let axis = Dir3::new_normalize(Vec3::z());
                let a = self.placement(&center, &axis);
                self.entity(format!("SPHERICAL_SURFACE('',#{a},{})", real(radius)))
            }
        }
    }

    fn face(&mut self, f: FaceId) -> Result<u64, StepError> {
        let kernel = self.kernel;
        let face = kernel.face(f);
        if face.loops.is_empty() {
            return Err(StepError::InvalidTopology("face without boundary".into()));
        }
        let params = kernel
            .surface_type_of(f)
            .map_err(|e| StepError::InvalidGeometry(e.to_string()))?;
        let mut bounds = Vec::with_capacity(face.loops.len());
        for (i, wire) in face.loops.iter().enumerate() {
            let lp = self.edge_loop(wire);
            let kind = if i == 0 { "FACE_OUTER_BOUND" } else { "FACE_BOUND" };
            bounds.push(self.entity(format!("{kind}('',#{lp},.T.)")));
        }
        let surface = self.surface(&params);
        let same_sense = bool_flag(face.orientation == Orientation::Forward);
        let list = id_list(&bounds);
        Ok(self.entity(format!("ADVANCED_FACE('',({list}),#{surface},{same_sense})")))
    }

    fn product(&mut self, item: u64, representation: &str) {
        let origin = self.point(&Point3::origin());
        let z = self.direction(&Vec3::z());
        let x = self.direction(&Vec3::x());
        let placement = self.entity(format!("AXIS2_PLACEMENT_3D('',#{origin},#{z},#{x})"));

        let length = self.entity("(LENGTH_UNIT()NAMED_UNIT(*)SI_UNIT(.MILLI.,.METRE.))".into());
        let angle = self.entity("(NAMED_UNIT(*)PLANE_ANGLE_UNIT()SI_UNIT($,.RADIAN.))".into());
        let solid_angle =
            self.entity("(NAMED_UNIT(*)SI_UNIT($,.STERADIAN.)SOLID_ANGLE_UNIT())".into());
        let uncertainty = self.entity(format!(
            "UNCERTAINTY_MEASURE_WITH_UNIT(LENGTH_MEASURE(1.E-07),#{length},'distance_accuracy_value','confusion accuracy')"
        ));
        let context = self.entity(format!(
            "(GEOMETRIC_REPRESENTATION_CONTEXT(3)GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT((#{uncertainty}))GLOBAL_UNIT_ASSIGNED_CONTEXT((#{length},#{angle},#{solid_angle}))REPRESENTATION_CONTEXT('Context #1','3D Context with UNIT and UNCERTAINTY'))"
        ));
        let rep = self.entity(format!(
            "{representation}('brepify',(#{placement},#{item}),#{context})"
        ));

        let app = self.entity(
            "APPLICATION_CONTEXT('core data for automotive mechanical design processes')".into(),
        );
        self.entity(format!(
            "APPLICATION_PROTOCOL_DEFINITION('international standard','automotive_design',2000,#{app})"
        ));
        let product_ctx = self.entity(format!("PRODUCT_CONTEXT('',#{app},'mechanical')"));
        let product = self.entity(format!(
            "PRODUCT('brepify','brepify','',(#{product_ctx}))"
        ));
        self.entity(format!(
            "PRODUCT_RELATED_PRODUCT_CATEGORY('part',$,(#{product}))"
        ));
        let formation = self.entity(format!(
            "PRODUCT_DEFINITION_FORMATION('','',#{product})"
        ));
        let def_ctx = self.entity(format!(
            "PRODUCT_DEFINITION_CONTEXT('part definition',#{app},'design')"
        ));
        let definition = self.entity(format!(
            "PRODUCT_DEFINITION('design','',#{formation},#{def_ctx})"
        ));
        let def_shape = self.entity(format!(
            "PRODUCT_DEFINITION_SHAPE('','',#{definition})"
        ));
        self.entity(format!(
            "SHAPE_DEFINITION_REPRESENTATION(#{def_shape},#{rep})"
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brepify_kernel::Plane;

    fn tetra(kernel: &mut BRepKernel) -> Vec<FaceId> {
        let p = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let v: Vec<_> = p.iter().map(|q| kernel.add_vertex(*q)).collect();
        let mut edges = HashMap::new();
        let tris = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        let mut out = Vec::new();
        for t in tris {
            let mut es = Vec::new();
            for k in 0..3 {
                let (a, b) = (t[k], t[(k + 1) % 3]);
                let key = (a.min(b), a.max(b));
                let e = *edges
                    .entry(key)
                    .or_insert_with(|| kernel.add_edge(v[key.0], v[key.1]).unwrap());
                es.push(e);
            }
            out.push(kernel.make_triangle_face(es[0], es[1], es[2]).unwrap());
        }
        out
    }

    #[test]
    fn test_solid_export() {
        let mut kernel = BRepKernel::new();
        let faces = tetra(&mut kernel);
        let sew = kernel.sew(&faces, 1e-6);
        let solid = kernel.shell_to_solid(sew.shell).unwrap();
        let bytes = write_step_to_buffer(&kernel, Shape::Solid(solid)).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("ISO-10303-21;"));
        assert!(text.trim_end().ends_with("END-ISO-10303-21;"));
        assert_eq!(text.matches("ADVANCED_FACE(").count(), 4);
        assert_eq!(text.matches("EDGE_CURVE(").count(), 6);
        assert_eq!(text.matches("VERTEX_POINT(").count(), 4);
        assert_eq!(text.matches("ORIENTED_EDGE(").count(), 12);
        assert!(text.contains("MANIFOLD_SOLID_BREP("));
        assert!(text.contains("CLOSED_SHELL("));
    }

    #[test]
    fn test_export_is_deterministic() {
        let mut kernel = BRepKernel::new();
        let faces = tetra(&mut kernel);
        let sew = kernel.sew(&faces, 1e-6);
        let a = write_step_to_buffer(&kernel, Shape::Shell(sew.shell)).unwrap();
        let b = write_step_to_buffer(&kernel, Shape::Shell(sew.shell)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_open_shell_export() {
        let mut kernel = BRepKernel::new();
        let faces = tetra(&mut kernel);
        let sew = kernel.sew(&faces[..3], 1e-6);
        let text = String::from_utf8(write_step_to_buffer(&kernel, Shape::Shell(sew.shell)).unwrap())
            .unwrap();
        assert!(text.contains("OPEN_SHELL("));
        assert!(text.contains("SHELL_BASED_SURFACE_MODEL("));
    }

    #[test]
    fn test_empty_shape_rejected() {
        let mut kernel = BRepKernel::new();
        let faces = tetra(&mut kernel);
        let sew = kernel.sew(&faces[..0], 1e-6);
        assert!(matches!(
            write_step_to_buffer(&kernel, Shape::Shell(sew.shell)),
            Err(StepError::EmptyShape)
        ));
    }

    #[test]
    fn test_reversed_face_sense() {
        let mut kernel = BRepKernel::new();
        let p = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        let v: Vec<_> = p.iter().map(|q| kernel.add_vertex(*q)).collect();
        let edges: Vec<_> = (0..4)
            .map(|i| {
                brepify_kernel::OrientedEdge::forward(kernel.add_edge(v[i], v[(i + 1) % 4]).unwrap())
            })
            .collect();
        let face = kernel
            .make_planar_face(Plane::xy(), vec![Wire::new(edges)], Vec::new())
            .unwrap();
        let text = String::from_utf8(write_step_to_buffer(&kernel, Shape::Face(face)).unwrap())
            .unwrap();
        let face_line = text
            .lines()
            .find(|l| l.contains("ADVANCED_FACE("))
            .unwrap();
        assert!(face_line.ends_with(",.F.);"));
        assert!(text.contains("PLANE("));
    }
}
