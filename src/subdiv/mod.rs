mod catmull;
mod loop_subd;

use glam::Vec3;
use tracing::debug;

use crate::{
    element::Handle,
    error::Error,
    iterator,
    mesh::PolyMesh,
    property::{EProperty, FProperty, VProperty},
};

/// Positions of the vertices of a quad subdivided mesh, stored on the
/// elements of the original mesh they come from. Every vertex, edge and face
/// of the original mesh becomes one vertex of the subdivided mesh.
pub struct SubdivPoints {
    pub vertex: VProperty<Vec3>,
    pub edge: EProperty<Vec3>,
    pub face: FProperty<Vec3>,
}

impl SubdivPoints {
    fn new(mesh: &mut PolyMesh) -> Self {
        SubdivPoints {
            vertex: mesh.create_vertex_prop(Vec3::ZERO),
            edge: mesh.create_edge_prop(Vec3::ZERO),
            face: mesh.create_face_prop(Vec3::ZERO),
        }
    }
}

/// Rules used to position the vertices when subdividing a mesh into quads.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SubdivScheme {
    /// Split the faces without changing the shape of the mesh.
    Linear,
    /// Smooth the mesh toward the Catmull-Clark limit surface.
    #[default]
    CatmullClark,
}

impl PolyMesh {
    /// Compute the positions for splitting every face into quads, without
    /// changing the shape of the mesh. Vertices keep their positions, edges
    /// get their midpoints, and faces get their centroids.
    pub fn linear_subdivide_positions(&mut self) -> Result<SubdivPoints, Error> {
        let mut out = SubdivPoints::new(self);
        {
            let points = self.points.try_borrow()?;
            let mut vpos = out.vertex.try_borrow_mut()?;
            vpos.copy_from_slice(&points);
            let mut epos = out.edge.try_borrow_mut()?;
            for e in self.topol.edges() {
                epos[e] = self.calc_edge_midpoint(e, &points);
            }
            let mut fpos = out.face.try_borrow_mut()?;
            for f in self.topol.faces() {
                fpos[f] = self.calc_face_centroid(f, &points);
            }
        }
        Ok(out)
    }

    /// Replace every face of degree `n` with `n` quads, one per corner, using
    /// the precomputed `positions` for the vertices of the new mesh. All
    /// handles and properties of the old mesh are invalidated.
    fn rebuild_quads(&mut self, positions: &SubdivPoints) -> Result<(), Error> {
        let vpos = positions.vertex.try_borrow()?;
        let epos = positions.edge.try_borrow()?;
        let fpos = positions.face.try_borrow()?;
        let mut pos = Vec::with_capacity(self.num_vertices() + self.num_edges() + self.num_faces());
        let mut vmap = vec![u32::MAX; self.topol.num_vertex_slots()];
        for v in self.topol.vertices() {
            vmap[v.index() as usize] = pos.len() as u32;
            pos.push(vpos[v]);
        }
        let mut emap = vec![u32::MAX; self.topol.num_edge_slots()];
        for e in self.topol.edges() {
            emap[e.index() as usize] = pos.len() as u32;
            pos.push(epos[e]);
        }
        let mut quads: Vec<[u32; 4]> = Vec::new();
        for f in self.topol.faces() {
            let fi = pos.len() as u32;
            pos.push(fpos[f]);
            for h in iterator::fh_ccw_iter(&self.topol, f) {
                let hp = self.topol.prev_halfedge(h);
                quads.push([
                    vmap[self.topol.from_vertex(h).index() as usize],
                    emap[h.edge().index() as usize],
                    fi,
                    emap[hp.edge().index() as usize],
                ]);
            }
        }
        *self = PolyMesh::from_polygons(&pos, &quads)?;
        Ok(())
    }

    /// Subdivide every face into quads, for the given number of iterations,
    /// and position the new vertices according to `scheme`.
    ///
    /// ```rust
    /// use meshedit::{PolyMesh, SubdivScheme};
    ///
    /// let mut mesh = PolyMesh::unit_box().expect("Cannot create box");
    /// assert_eq!((8, 12, 6), (mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()));
    /// mesh.subdivide(SubdivScheme::CatmullClark, 1)
    ///     .expect("Subdivision failed");
    /// assert_eq!((26, 48, 24), (mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()));
    /// mesh.check_topology().expect("Topological errors found");
    /// ```
    pub fn subdivide(&mut self, scheme: SubdivScheme, iterations: usize) -> Result<(), Error> {
        for _ in 0..iterations {
            let positions = match scheme {
                SubdivScheme::Linear => self.linear_subdivide_positions()?,
                SubdivScheme::CatmullClark => self.catmullclark_subdivide_positions()?,
            };
            self.rebuild_quads(&positions)?;
        }
        debug!(
            ?scheme,
            iterations,
            faces = self.num_faces(),
            "Subdivided mesh"
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use glam::{Vec3, vec3};

    use crate::{SubdivScheme, macros::assert_f32_eq, mesh::PolyMesh};

    #[test]
    fn t_linear_positions_grid() {
        let mut grid = PolyMesh::quad_grid(2.0, 2.0, 2, 2).expect("Cannot create grid");
        let positions = grid
            .linear_subdivide_positions()
            .expect("Cannot compute positions");
        let points = grid.points();
        let points = points.try_borrow().expect("Cannot borrow points");
        let vpos = positions.vertex.try_borrow().expect("Cannot borrow");
        for v in grid.vertices() {
            assert_eq!(points[v], vpos[v]);
        }
        let epos = positions.edge.try_borrow().expect("Cannot borrow");
        for e in grid.edges() {
            let (h, _) = e.halfedges();
            let mean = (points[h.tail(&grid)] + points[h.head(&grid)]) / 2.0;
            assert_eq!(mean, epos[e]);
        }
        let fpos = positions.face.try_borrow().expect("Cannot borrow");
        let centers: Vec<Vec3> = grid.faces().map(|f| fpos[f]).collect();
        assert_eq!(
            centers,
            vec![
                vec3(0.5, 0.5, 0.0),
                vec3(1.5, 0.5, 0.0),
                vec3(0.5, 1.5, 0.0),
                vec3(1.5, 1.5, 0.0)
            ]
        );
    }

    #[test]
    fn t_box_linear_subdivide() {
        let mut qbox = PolyMesh::unit_box().expect("Cannot create box");
        qbox.subdivide(SubdivScheme::Linear, 2)
            .expect("Cannot subdivide");
        qbox.check_topology().expect("Topological errors found");
        assert_eq!(98, qbox.num_vertices());
        assert_eq!(192, qbox.num_edges());
        assert_eq!(96, qbox.num_faces());
        assert!(qbox.faces().all(|f| qbox.face_valence(f) == 4));
        assert_f32_eq!(
            6.0,
            qbox.try_calc_area().expect("Cannot compute area"),
            1e-5
        );
    }

    #[test]
    fn t_grid_linear_subdivide() {
        let mut grid = PolyMesh::quad_grid(1.0, 1.0, 1, 1).expect("Cannot create grid");
        grid.subdivide(SubdivScheme::Linear, 1)
            .expect("Cannot subdivide");
        grid.check_topology().expect("Topological errors found");
        assert_eq!(9, grid.num_vertices());
        assert_eq!(4, grid.num_faces());
        for f in grid.faces() {
            let n = grid.try_calc_face_normal(f).expect("Cannot compute normal");
            assert_eq!(Vec3::Z, n);
        }
    }
}
