//! # Shapes — Gizmo Mesh Generators
//!
//! The gizmos do not render anything themselves. They hand the host a list of
//! [`HandleVisual`](super::HandleVisual)s, each naming a [`GizmoShape`] and a
//! model matrix, and the host draws the shape with its own pipeline. This
//! module generates the vertex and index data for those shapes once, so every
//! host draws the same geometry.
//!
//! ## Pivots
//!
//! Pivots sit where the gizmo needs them, not at the shape's center:
//!
//! ```text
//!   cylinder / cone          quad                  torus
//!        ▲ +Y                 ┌────┐ offset+size     ╭───╮  lies in XZ,
//!        │                    │    │                ( ·  )  centered
//!        │ height             └────┘ offset          ╰───╯
//!   ─────●───── pivot (base)  ● origin
//! ```
//!
//! A shaft cylinder placed at the origin and rotated onto an axis reaches
//! exactly `height` along it; the cone placed at the shaft's tip continues it.
//!
//! ## Winding
//!
//! Triangles are counter-clockwise seen from the front face. Quads are
//! double-sided (a second set of vertices with the flipped normal) because a
//! planar handle is seen from both sides as the camera orbits.
//!
//! ## Comparison
//!
//! - **Unity**: editor handles are drawn through `Handles.*` immediate calls;
//!   runtime gizmos usually build meshes by hand, as here.
//! - **Bevy**: `bevy_gizmos` draws lines only; solid handles come from
//!   primitive meshes such as `Cylinder`, `Cone`, and `Torus`.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};

use crate::math::Vec3;

/// Segments around the cylinder and cone.
pub const RADIAL_SEGMENTS: u32 = 16;
/// Segments around the torus ring.
pub const TORUS_SEGMENTS: u32 = 64;
/// Segments around the torus tube.
pub const TORUS_TUBE_SEGMENTS: u32 = 8;

/// One mesh vertex, laid out for direct upload (`bytemuck::cast_slice`).
///
/// ```text
/// MeshVertex (32 bytes)
/// ┌──────────────┬──────────────┬────────────┐
/// │ position     │ normal       │ uv         │
/// │ [f32; 3]     │ [f32; 3]     │ [f32; 2]   │
/// │ offset 0     │ offset 12    │ offset 24  │
/// └──────────────┴──────────────┴────────────┘
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
        }
    }
}

/// Vertex and index data for one shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn base(&self) -> u32 {
        self.vertices.len() as u32
    }
}

/// Which mesh a visual uses. Shapes with parameters carry them, so two
/// visuals with equal shapes can share one uploaded mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GizmoShape {
    /// Axis shaft, pivot at the base, along +Y.
    Cylinder { radius: f32, height: f32 },
    /// Arrow head, pivot at the base, along +Y.
    Cone { radius: f32, height: f32 },
    /// Double-sided square in XY covering `[offset, offset + size]²`.
    Quad { offset: f32, size: f32 },
    /// Rotation ring in XZ.
    Torus { radius: f32, thickness: f32 },
    /// Centered unit square in XY, scaled by the model matrix (rotation arc,
    /// resize footprint).
    Square,
    /// Unit sphere (radius 0.5), scaled by the model matrix.
    Sphere,
    /// Unit cube, scaled by the model matrix (frame lines, corner handles).
    Cube,
}

impl GizmoShape {
    /// Build the mesh for this shape.
    pub fn mesh(&self) -> Mesh {
        match *self {
            GizmoShape::Cylinder { radius, height } => cylinder(radius, height, RADIAL_SEGMENTS),
            GizmoShape::Cone { radius, height } => cone(radius, height, RADIAL_SEGMENTS),
            GizmoShape::Quad { offset, size } => quad(offset, size),
            GizmoShape::Torus { radius, thickness } => {
                torus(radius, thickness, TORUS_SEGMENTS, TORUS_TUBE_SEGMENTS)
            }
            GizmoShape::Square => square(0.5),
            GizmoShape::Sphere => sphere(16, 8),
            GizmoShape::Cube => cube(),
        }
    }
}

// ── Generators ──────────────────────────────────────────────────────────

/// Closed cylinder along +Y from `y = 0` to `y = height`.
pub fn cylinder(radius: f32, height: f32, segments: u32) -> Mesh {
    let seg = segments.max(3);
    let mut mesh = Mesh::default();

    // ── Side ──
    // seg+1 columns so the UV seam gets its own vertices.
    for i in 0..=seg {
        let u = i as f32 / seg as f32;
        let (sin, cos) = (u * TAU).sin_cos();
        let normal = Vec3::new(cos, 0.0, sin);
        let rim = normal * radius;
        mesh.vertices.push(MeshVertex::new(rim + Vec3::Y * height, normal, [u, 0.0]));
        mesh.vertices.push(MeshVertex::new(rim, normal, [u, 1.0]));
    }
    for i in 0..seg {
        let top0 = i * 2;
        let bot0 = top0 + 1;
        let top1 = top0 + 2;
        let bot1 = top0 + 3;
        mesh.indices.extend_from_slice(&[top0, top1, bot1, top0, bot1, bot0]);
    }

    cap(&mut mesh, radius, height, Vec3::Y, seg);
    cap(&mut mesh, radius, 0.0, Vec3::NEG_Y, seg);
    mesh
}

/// Cone along +Y with its base disc at `y = 0` and apex at `y = height`.
pub fn cone(radius: f32, height: f32, segments: u32) -> Mesh {
    let seg = segments.max(3);
    let mut mesh = Mesh::default();
    let apex = Vec3::Y * height;
    // Slant normal: outward and tilted up by the cone's half-angle.
    let slope = radius / height.max(f32::EPSILON);

    for i in 0..=seg {
        let u = i as f32 / seg as f32;
        let (sin, cos) = (u * TAU).sin_cos();
        let normal = Vec3::new(cos, slope, sin).normalize();
        mesh.vertices.push(MeshVertex::new(apex, normal, [u, 0.0]));
        mesh.vertices.push(MeshVertex::new(Vec3::new(cos * radius, 0.0, sin * radius), normal, [u, 1.0]));
    }
    for i in 0..seg {
        let tip = i * 2;
        let rim0 = tip + 1;
        let rim1 = tip + 3;
        mesh.indices.extend_from_slice(&[tip, rim1, rim0]);
    }

    cap(&mut mesh, radius, 0.0, Vec3::NEG_Y, seg);
    mesh
}

/// Disc of `radius` at height `y` facing `normal` (±Y), as a center fan.
fn cap(mesh: &mut Mesh, radius: f32, y: f32, normal: Vec3, seg: u32) {
    let center = mesh.base();
    mesh.vertices.push(MeshVertex::new(Vec3::Y * y, normal, [0.5, 0.5]));
    for i in 0..seg {
        let (sin, cos) = (i as f32 / seg as f32 * TAU).sin_cos();
        mesh.vertices.push(MeshVertex::new(
            Vec3::new(cos * radius, y, sin * radius),
            normal,
            [0.5 + cos * 0.5, 0.5 + sin * 0.5],
        ));
    }
    for i in 0..seg {
        let curr = center + 1 + i;
        let next = center + 1 + (i + 1) % seg;
        if normal.y > 0.0 {
            mesh.indices.extend_from_slice(&[center, next, curr]);
        } else {
            mesh.indices.extend_from_slice(&[center, curr, next]);
        }
    }
}

/// Double-sided square in the XY plane spanning `[offset, offset + size]` on
/// both axes. 8 vertices, 12 indices.
pub fn quad(offset: f32, size: f32) -> Mesh {
    let lo = offset;
    let hi = offset + size;
    double_sided([
        Vec3::new(lo, lo, 0.0),
        Vec3::new(hi, lo, 0.0),
        Vec3::new(hi, hi, 0.0),
        Vec3::new(lo, hi, 0.0),
    ])
}

/// Double-sided square in XY centered on the origin, `2 * half` wide.
pub fn square(half: f32) -> Mesh {
    double_sided([
        Vec3::new(-half, -half, 0.0),
        Vec3::new(half, -half, 0.0),
        Vec3::new(half, half, 0.0),
        Vec3::new(-half, half, 0.0),
    ])
}

/// Corners are bottom-left, bottom-right, top-right, top-left seen from +Z.
fn double_sided(corners: [Vec3; 4]) -> Mesh {
    let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
    let mut mesh = Mesh::default();
    // Front faces −Z (towards a camera looking down +Z at the handle).
    for (corner, uv) in corners.iter().zip(uvs) {
        mesh.vertices.push(MeshVertex::new(*corner, Vec3::NEG_Z, uv));
    }
    for (corner, uv) in corners.iter().zip(uvs) {
        mesh.vertices.push(MeshVertex::new(*corner, Vec3::Z, uv));
    }
    // CCW seen from −Z, then the same quad reversed for +Z.
    mesh.indices.extend_from_slice(&[0, 2, 1, 0, 3, 2]);
    mesh.indices.extend_from_slice(&[4, 5, 6, 4, 6, 7]);
    mesh
}

/// Torus lying in the XZ plane. `radius` is the ring radius, `thickness` the
/// tube radius.
pub fn torus(radius: f32, thickness: f32, segments: u32, tube_segments: u32) -> Mesh {
    let seg = segments.max(3);
    let tube = tube_segments.max(3);
    let mut mesh = Mesh::default();

    for i in 0..=seg {
        let u = i as f32 / seg as f32;
        let (sin_a, cos_a) = (u * TAU).sin_cos();
        let ring_dir = Vec3::new(cos_a, 0.0, sin_a);
        for j in 0..=tube {
            let v = j as f32 / tube as f32;
            let (sin_b, cos_b) = (v * TAU).sin_cos();
            let normal = ring_dir * cos_b + Vec3::Y * sin_b;
            let position = ring_dir * radius + normal * thickness;
            mesh.vertices.push(MeshVertex::new(position, normal, [u, v]));
        }
    }

    let stride = tube + 1;
    for i in 0..seg {
        for j in 0..tube {
            let a = i * stride + j;
            let b = a + stride;
            mesh.indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
        }
    }
    mesh
}

/// UV sphere of radius 0.5 centered at the origin.
pub fn sphere(segments: u32, rings: u32) -> Mesh {
    let seg = segments.max(3);
    let rings = rings.max(2);
    let mut mesh = Mesh::default();

    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let (sin_phi, cos_phi) = (v * std::f32::consts::PI).sin_cos();
        for s in 0..=seg {
            let u = s as f32 / seg as f32;
            let (sin_theta, cos_theta) = (u * TAU).sin_cos();
            let normal = Vec3::new(sin_phi * cos_theta, cos_phi, sin_phi * sin_theta);
            mesh.vertices.push(MeshVertex::new(normal * 0.5, normal, [u, v]));
        }
    }
    for ring in 0..rings {
        for s in 0..seg {
            let current = ring * (seg + 1) + s;
            let next = current + seg + 1;
            mesh.indices.extend_from_slice(&[current, next, current + 1]);
            mesh.indices.extend_from_slice(&[current + 1, next, next + 1]);
        }
    }
    mesh
}

/// Unit cube centered at the origin, 4 vertices per face.
pub fn cube() -> Mesh {
    let mut mesh = Mesh::default();
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];
    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

    for (normal, u_dir, v_dir) in faces {
        let base = mesh.base();
        for ((cu, cv), uv) in corners.into_iter().zip(uvs) {
            let position = (normal + u_dir * cu + v_dir * cv) * 0.5;
            mesh.vertices.push(MeshVertex::new(position, normal, uv));
        }
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_indices_in_range(mesh: &Mesh) {
        for &idx in &mesh.indices {
            assert!((idx as usize) < mesh.vertices.len(), "index {idx} out of range");
        }
        assert_eq!(mesh.indices.len() % 3, 0);
    }

    fn assert_unit_normals(mesh: &Mesh) {
        for v in &mesh.vertices {
            let len = Vec3::from_array(v.normal).length();
            assert!((len - 1.0).abs() < 1e-5, "normal should be unit length, got {len}");
        }
    }

    fn bounds(mesh: &Mesh) -> (Vec3, Vec3) {
        mesh.vertices.iter().fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), v| {
            let p = Vec3::from_array(v.position);
            (lo.min(p), hi.max(p))
        })
    }

    #[test]
    fn cylinder_pivot_is_at_base() {
        let mesh = cylinder(0.1, 2.0, 12);
        assert_indices_in_range(&mesh);
        assert_unit_normals(&mesh);
        let (lo, hi) = bounds(&mesh);
        assert!(lo.y.abs() < 1e-6);
        assert!((hi.y - 2.0).abs() < 1e-6);
        assert!((hi.x - 0.1).abs() < 1e-5);
        // side: seg*6, two caps: seg*3 each
        assert_eq!(mesh.indices.len(), 12 * 12);
    }

    #[test]
    fn cone_reaches_apex() {
        let mesh = cone(0.06, 0.2, RADIAL_SEGMENTS);
        assert_indices_in_range(&mesh);
        assert_unit_normals(&mesh);
        let (lo, hi) = bounds(&mesh);
        assert!(lo.y.abs() < 1e-6);
        assert!((hi.y - 0.2).abs() < 1e-6);
    }

    #[test]
    fn quad_is_double_sided_at_offset() {
        let mesh = quad(0.25, 0.5);
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.indices.len(), 12);
        assert_indices_in_range(&mesh);
        let (lo, hi) = bounds(&mesh);
        assert_eq!(lo, Vec3::new(0.25, 0.25, 0.0));
        assert_eq!(hi, Vec3::new(0.75, 0.75, 0.0));
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, -1.0]);
        assert_eq!(mesh.vertices[4].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn torus_lies_in_xz() {
        let mesh = torus(1.0, 0.05, TORUS_SEGMENTS, TORUS_TUBE_SEGMENTS);
        assert_indices_in_range(&mesh);
        assert_unit_normals(&mesh);
        assert_eq!(mesh.triangle_count(), (TORUS_SEGMENTS * TORUS_TUBE_SEGMENTS * 2) as usize);
        let (lo, hi) = bounds(&mesh);
        assert!((hi.y - 0.05).abs() < 1e-5);
        assert!((lo.y + 0.05).abs() < 1e-5);
        assert!((hi.x - 1.05).abs() < 1e-5);
    }

    #[test]
    fn sphere_and_cube_are_unit_sized() {
        for mesh in [sphere(8, 4), cube()] {
            assert_indices_in_range(&mesh);
            assert_unit_normals(&mesh);
            let (lo, hi) = bounds(&mesh);
            assert!((hi.x - 0.5).abs() < 1e-5 && (lo.x + 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn vertices_cast_to_bytes() {
        let mesh = GizmoShape::Quad { offset: 0.0, size: 1.0 }.mesh();
        let bytes: &[u8] = bytemuck::cast_slice(&mesh.vertices);
        assert_eq!(bytes.len(), 8 * 32);
    }
}
