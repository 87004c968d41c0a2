use glam::Vec3;

use crate::{error::Error, iterator, mesh::PolyMesh};

use super::SubdivPoints;

impl PolyMesh {
    /// Compute the positions of the Catmull-Clark subdivision of this mesh.
    ///
    /// Face points are the centroids of the faces. Edge points average the
    /// two endpoints of the edge with the two adjacent face points. Vertex
    /// points are `(F + 2E + (n - 3)P) / n`, where `F` is the average of the
    /// adjacent face points, `E` is the average of the adjacent edge points
    /// and `n` is the valence. Meshes with boundaries are not supported.
    pub fn catmullclark_subdivide_positions(&mut self) -> Result<SubdivPoints, Error> {
        if let Some(e) = self.edges().find(|e| self.is_boundary_edge(*e)) {
            return Err(Error::BoundaryEdge(e));
        }
        let mut out = SubdivPoints::new(self);
        {
            let points = self.points.try_borrow()?;
            let mut fpos = out.face.try_borrow_mut()?;
            for f in self.topol.faces() {
                fpos[f] = self.calc_face_centroid(f, &points);
            }
            let mut epos = out.edge.try_borrow_mut()?;
            for e in self.topol.edges() {
                let (h, o) = e.halfedges();
                let (f0, f1) = match (self.topol.halfedge_face(h), self.topol.halfedge_face(o)) {
                    (Some(f0), Some(f1)) => (f0, f1),
                    _ => return Err(Error::BoundaryEdge(e)),
                };
                epos[e] = (fpos[f0]
                    + fpos[f1]
                    + points[self.topol.from_vertex(h)]
                    + points[self.topol.to_vertex(h)])
                    * 0.25;
            }
            let mut vpos = out.vertex.try_borrow_mut()?;
            for v in self.topol.vertices() {
                let (n, fsum, esum) = iterator::voh_ccw_iter(&self.topol, v).fold(
                    (0usize, Vec3::ZERO, Vec3::ZERO),
                    |(n, fsum, esum), h| {
                        let fsum = match self.topol.halfedge_face(h) {
                            Some(f) => fsum + fpos[f],
                            None => fsum,
                        };
                        (n + 1, fsum, esum + epos[h.edge()])
                    },
                );
                // Isolated.
                if n == 0 {
                    vpos[v] = points[v];
                    continue;
                }
                let nf = n as f32;
                vpos[v] = (fsum / nf + 2.0 * esum / nf + (nf - 3.0) * points[v]) / nf;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use glam::Vec3;

    use crate::{
        SubdivScheme,
        error::Error,
        macros::{assert_f32_eq, assert_vec3_eq},
        mesh::PolyMesh,
    };

    #[test]
    fn t_box_catmull_clark_positions() {
        let mut qbox = PolyMesh::unit_box().expect("Cannot create box");
        let positions = qbox
            .catmullclark_subdivide_positions()
            .expect("Cannot compute positions");
        let vpos = positions.vertex.try_borrow().expect("Cannot borrow");
        // Every corner moves the same distance toward the center.
        let center = Vec3::splat(0.5);
        let points = qbox.points();
        let points = points.try_borrow().expect("Cannot borrow points");
        for v in qbox.vertices() {
            let corner = points[v];
            let expected = corner + (center - corner) * (5.0 / 9.0);
            assert_vec3_eq!(expected, vpos[v]);
        }
        let fpos = positions.face.try_borrow().expect("Cannot borrow");
        for f in qbox.faces() {
            assert_f32_eq!(0.5, (fpos[f] - center).length(), 1e-6);
        }
        let epos = positions.edge.try_borrow().expect("Cannot borrow");
        for e in qbox.edges() {
            // Edge points sit at (0.5, 0.125, 0.125) for the edge along X at
            // the origin, and symmetrically for the others.
            assert_f32_eq!(
                0.375 * 2.0f32.sqrt(),
                (epos[e] - center).length(),
                1e-6
            );
        }
    }

    #[test]
    fn t_box_catmull_clark() {
        let mut qbox = PolyMesh::unit_box().expect("Cannot create box");
        qbox.subdivide(SubdivScheme::CatmullClark, 2)
            .expect("Cannot subdivide");
        qbox.check_topology().expect("Topological errors found");
        assert_eq!(98, qbox.num_vertices());
        assert_eq!(192, qbox.num_edges());
        assert_eq!(96, qbox.num_faces());
        let points = qbox.points();
        let points = points.try_borrow().expect("Cannot borrow points");
        let half_diagonal = 0.75f32.sqrt();
        assert!(
            points
                .iter()
                .all(|p| (*p - Vec3::splat(0.5)).length() < half_diagonal)
        );
        assert!(qbox.try_calc_area().expect("Cannot compute area") < 6.0);
    }

    #[test]
    fn t_catmull_clark_boundary() {
        let mut grid = PolyMesh::quad_grid(1.0, 1.0, 2, 2).expect("Cannot create grid");
        assert!(matches!(
            grid.subdivide(SubdivScheme::CatmullClark, 1),
            Err(Error::BoundaryEdge(_))
        ));
        assert_eq!(4, grid.num_faces());
    }

    #[test]
    fn t_catmull_clark_isolated_vertex() {
        let mut tet = PolyMesh::tetrahedron(1.0).expect("Cannot create tetrahedron");
        let v = tet
            .add_vertex(Vec3::new(5.0, 0.0, 0.0))
            .expect("Cannot add vertex");
        let positions = tet
            .catmullclark_subdivide_positions()
            .expect("Cannot compute positions");
        assert_eq!(
            Vec3::new(5.0, 0.0, 0.0),
            positions.vertex.get_cloned(v).expect("Cannot read position")
        );
    }
}
