use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use signage_config::GeometryConfig;

/// Vertex format shared by every mesh.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // uv
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                // normal
                wgpu::VertexAttribute {
                    offset: 20,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// A generated mesh (vertices + indices).
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

/// Build the mesh described by a scene entry.
pub fn mesh_for(geometry: &GeometryConfig) -> Mesh {
    match *geometry {
        GeometryConfig::Box {
            width,
            height,
            depth,
        } => rectangular_prism(width, height, depth),
        GeometryConfig::Plane {
            width,
            height,
            segments_w,
            segments_h,
        } => plane(width, height, segments_w, segments_h),
    }
}

/// Box centered on the origin. Each face carries its own normal and the
/// full texture.
pub fn rectangular_prism(width: f32, height: f32, depth: f32) -> Mesh {
    let half = Vec3::new(width, height, depth) / 2.0;

    // (normal, right, up) with right x up == normal, so faces wind CCW
    // when seen from outside.
    let faces = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, right, up) in faces {
        let center = normal * half;
        let r = right * half;
        let u = up * half;
        let base = vertices.len() as u32;

        let corners = [
            (center - r + u, [0.0, 0.0]),
            (center + r + u, [1.0, 0.0]),
            (center - r - u, [0.0, 1.0]),
            (center + r - u, [1.0, 1.0]),
        ];
        for (position, uv) in corners {
            vertices.push(MeshVertex {
                position: position.to_array(),
                uv,
                normal: normal.to_array(),
            });
        }

        indices.extend_from_slice(&[base, base + 2, base + 1, base + 1, base + 2, base + 3]);
    }

    Mesh { vertices, indices }
}

/// Plane in XY facing +Z, split into a `segments_w` x `segments_h` grid.
pub fn plane(width: f32, height: f32, segments_w: u32, segments_h: u32) -> Mesh {
    let segments_w = segments_w.max(1);
    let segments_h = segments_h.max(1);
    let hw = width / 2.0;
    let hh = height / 2.0;
    let cols = segments_w + 1;

    let mut vertices = Vec::with_capacity((cols * (segments_h + 1)) as usize);
    for j in 0..=segments_h {
        let v = j as f32 / segments_h as f32;
        for i in 0..=segments_w {
            let u = i as f32 / segments_w as f32;
            vertices.push(MeshVertex {
                position: [-hw + u * width, hh - v * height, 0.0],
                uv: [u, v],
                normal: [0.0, 0.0, 1.0],
            });
        }
    }

    let mut indices = Vec::with_capacity((segments_w * segments_h * 6) as usize);
    for j in 0..segments_h {
        for i in 0..segments_w {
            let tl = j * cols + i;
            let tr = tl + 1;
            let bl = tl + cols;
            let br = bl + 1;

            indices.push(tl);
            indices.push(bl);
            indices.push(tr);

            indices.push(tr);
            indices.push(bl);
            indices.push(br);
        }
    }

    Mesh { vertices, indices }
}

/// Quad covering the whole viewport, in clip space.
pub fn screen_quad() -> Mesh {
    let mut mesh = plane(2.0, 2.0, 1, 1);
    // Keep it on the far plane so everything else draws over it.
    for v in &mut mesh.vertices {
        v.position[2] = 1.0;
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winding_normal(mesh: &Mesh, tri: usize) -> Vec3 {
        let p = |k: usize| {
            let index = mesh.indices[tri * 3 + k] as usize;
            Vec3::from_array(mesh.vertices[index].position)
        };
        (p(1) - p(0)).cross(p(2) - p(0)).normalize()
    }

    #[test]
    fn prism_has_24_vertices_and_12_triangles() {
        let mesh = rectangular_prism(2.0, 1.0, 1.0);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
    }

    #[test]
    fn prism_spans_requested_extents() {
        let mesh = rectangular_prism(2.0, 1.0, 0.5);
        let max = mesh
            .vertices
            .iter()
            .fold(Vec3::splat(f32::MIN), |m, v| m.max(Vec3::from_array(v.position)));
        assert!(max.abs_diff_eq(Vec3::new(1.0, 0.5, 0.25), 1e-6));
    }

    #[test]
    fn prism_triangles_face_outward() {
        let mesh = rectangular_prism(1.0, 1.0, 1.0);
        for tri in 0..12 {
            let stored = Vec3::from_array(mesh.vertices[mesh.indices[tri * 3] as usize].normal);
            assert!(winding_normal(&mesh, tri).abs_diff_eq(stored, 1e-5), "triangle {tri}");
        }
    }

    #[test]
    fn subdivided_plane_counts() {
        let mesh = plane(5.0, 3.0, 4, 2);
        assert_eq!(mesh.vertices.len(), 15); // (4 + 1) * (2 + 1)
        assert_eq!(mesh.indices.len(), 48); // 4 * 2 * 6
    }

    #[test]
    fn plane_faces_positive_z() {
        let mesh = plane(2.0, 5.0, 1, 1);
        assert_eq!(mesh.vertices.len(), 4);
        for tri in 0..2 {
            assert!(winding_normal(&mesh, tri).abs_diff_eq(Vec3::Z, 1e-6));
        }
    }

    #[test]
    fn screen_quad_covers_clip_space() {
        let mesh = screen_quad();
        let xs: Vec<f32> = mesh.vertices.iter().map(|v| v.position[0]).collect();
        assert_eq!(xs, [-1.0, 1.0, -1.0, 1.0]);
        assert!(mesh.vertices.iter().all(|v| v.position[2] == 1.0));
    }
}
