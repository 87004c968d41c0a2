use glam::{Vec3, vec3};

use crate::{error::Error, mesh::PolyMesh};

impl PolyMesh {
    /// Makes a box with the following topology, spanning from the min point to
    /// the max point.
    ///
    ///  ```text
    ///       7-----------6
    ///      /|          /|
    ///     / |         / |
    ///    4-----------5  |
    ///    |  |        |  |
    ///    |  3--------|--2
    ///    | /         | /
    ///    |/          |/
    ///    0-----------1
    ///  ```
    pub fn quad_box(min: Vec3, max: Vec3) -> Result<Self, Error> {
        const BOX_POS: [(bool, bool, bool); 8] = [
            (false, false, false),
            (true, false, false),
            (true, true, false),
            (false, true, false),
            (false, false, true),
            (true, false, true),
            (true, true, true),
            (false, true, true),
        ];
        const BOX_IDX: [(u32, u32, u32, u32); 6] = [
            (0, 3, 2, 1),
            (0, 1, 5, 4),
            (1, 2, 6, 5),
            (2, 3, 7, 6),
            (3, 0, 4, 7),
            (4, 5, 6, 7),
        ];
        let mut qbox = Self::with_capacity(8, 12, 6);
        let pos = BOX_POS.map(|(xf, yf, zf)| {
            vec3(
                if xf { max.x } else { min.x },
                if yf { max.y } else { min.y },
                if zf { max.z } else { min.z },
            )
        });
        qbox.add_vertices(&pos)?;
        for (a, b, c, d) in BOX_IDX {
            qbox.add_quad_face(a.into(), b.into(), c.into(), d.into())?;
        }
        Ok(qbox)
    }

    /// Create a mesh representing a box with quadrilateral faces, of size 1,
    /// spanning from the origin to (1, 1, 1).
    pub fn unit_box() -> Result<Self, Error> {
        Self::quad_box(Vec3::ZERO, Vec3::ONE)
    }

    /// Create a flat grid of `nx` by `ny` quads in the XY plane, spanning
    /// from the origin to (`xsize`, `ysize`). The faces point along +Z.
    pub fn quad_grid(xsize: f32, ysize: f32, nx: u32, ny: u32) -> Result<Self, Error> {
        if nx == 0 || ny == 0 {
            return Err(Error::InvalidFaceDegree(0));
        }
        let nverts = ((nx + 1) * (ny + 1)) as usize;
        let nfaces = (nx * ny) as usize;
        let mut mesh = Self::with_capacity(nverts, nverts + nfaces, nfaces);
        let pos: Vec<Vec3> = (0..=ny)
            .flat_map(|j| {
                (0..=nx).map(move |i| {
                    vec3(
                        xsize * i as f32 / nx as f32,
                        ysize * j as f32 / ny as f32,
                        0.0,
                    )
                })
            })
            .collect();
        mesh.add_vertices(&pos)?;
        let vi = |i: u32, j: u32| j * (nx + 1) + i;
        for j in 0..ny {
            for i in 0..nx {
                mesh.add_quad_face(
                    vi(i, j).into(),
                    vi(i + 1, j).into(),
                    vi(i + 1, j + 1).into(),
                    vi(i, j + 1).into(),
                )?;
            }
        }
        Ok(mesh)
    }
}

/// Platonic solids.
impl PolyMesh {
    /// Create a tetrahedron centered at the origin. The vertices of the mesh
    /// will lie on the sphere with the given radius.
    pub fn tetrahedron(radius: f32) -> Result<Self, Error> {
        let mut mesh = Self::with_capacity(4, 6, 4);
        let a = radius * (1.0f32 / 3.0);
        let b = radius * (8.0f32 / 9.0).sqrt();
        let c = radius * (2.0f32 / 9.0).sqrt();
        let d = radius * (2.0f32 / 3.0).sqrt();
        mesh.add_vertices(&[
            vec3(0.0, 0.0, radius),
            vec3(-c, d, -a),
            vec3(-c, -d, -a),
            vec3(b, 0.0, -a),
        ])?;
        mesh.add_tri_face(0u32.into(), 1u32.into(), 2u32.into())?;
        mesh.add_tri_face(0u32.into(), 2u32.into(), 3u32.into())?;
        mesh.add_tri_face(0u32.into(), 3u32.into(), 1u32.into())?;
        mesh.add_tri_face(3u32.into(), 2u32.into(), 1u32.into())?;
        Ok(mesh)
    }

    /// Create an octahedron centered at the origin. The vertices of the mesh
    /// will lie on the sphere with the given radius.
    pub fn octahedron(radius: f32) -> Result<Self, Error> {
        let mut mesh = Self::with_capacity(6, 12, 8);
        mesh.add_vertices(&[
            vec3(radius, 0.0, 0.0),
            vec3(0.0, radius, 0.0),
            vec3(-radius, 0.0, 0.0),
            vec3(0.0, -radius, 0.0),
            vec3(0.0, 0.0, radius),
            vec3(0.0, 0.0, -radius),
        ])?;
        for [a, b, c] in [
            [0u32, 4, 3],
            [1, 4, 0],
            [2, 4, 1],
            [3, 4, 2],
            [3, 5, 0],
            [0, 5, 1],
            [1, 5, 2],
            [2, 5, 3],
        ] {
            mesh.add_tri_face(a.into(), b.into(), c.into())?;
        }
        Ok(mesh)
    }

    /// Create an icosahedron centered at the origin. The vertices of the mesh
    /// will lie on the sphere with the given radius.
    pub fn icosahedron(radius: f32) -> Result<Self, Error> {
        const A: f32 = 0.5257311121191336;
        const B: f32 = 0.8506508083520399;
        let mut mesh = Self::with_capacity(12, 30, 20);
        mesh.add_vertices(
            &[
                vec3(0.0, A, -B),
                vec3(A, B, 0.0),
                vec3(-A, B, 0.0),
                vec3(0.0, A, B),
                vec3(0.0, -A, B),
                vec3(-B, 0.0, A),
                vec3(0.0, -A, -B),
                vec3(B, 0.0, -A),
                vec3(B, 0.0, A),
                vec3(-B, 0.0, -A),
                vec3(A, -B, 0.0),
                vec3(-A, -B, 0.0),
            ]
            .map(|p| p * radius),
        )?;
        for [a, b, c] in [
            [2u32, 1, 0],
            [1, 2, 3],
            [5, 4, 3],
            [4, 8, 3],
            [7, 6, 0],
            [6, 9, 0],
            [11, 10, 4],
            [10, 11, 6],
            [9, 5, 2],
            [5, 9, 11],
            [8, 7, 1],
            [7, 8, 10],
            [2, 5, 3],
            [8, 1, 3],
            [9, 2, 0],
            [1, 7, 0],
            [11, 9, 6],
            [7, 10, 6],
            [5, 11, 4],
            [10, 8, 4],
        ] {
            mesh.add_tri_face(a.into(), b.into(), c.into())?;
        }
        Ok(mesh)
    }
}
