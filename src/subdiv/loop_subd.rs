use glam::Vec3;
use tracing::{debug, trace};

use crate::{
    element::{EH, Handle, VH},
    error::Error,
    iterator,
    mesh::PolyMesh,
    topol::Topology,
};

/// Loop weight of the neighbours of an interior vertex with the given valence.
fn loop_beta(valence: usize) -> f32 {
    if valence == 3 {
        3.0 / 16.0
    } else {
        3.0 / (8.0 * valence as f32)
    }
}

fn vertex_point(topol: &Topology, v: VH, points: &[Vec3]) -> Vec3 {
    let p = points[v.index() as usize];
    let Some(h) = topol.vertex_halfedge(v) else {
        // Isolated vertex doesn't move.
        return p;
    };
    if topol.is_boundary_halfedge(h) {
        let next = points[topol.to_vertex(h).index() as usize];
        let prev = points[topol.from_vertex(topol.prev_halfedge(h)).index() as usize];
        return (p * 6.0 + next + prev) / 8.0;
    }
    let (n, sum) = iterator::vv_ccw_iter(topol, v).fold((0usize, Vec3::ZERO), |(n, sum), nv| {
        (n + 1, sum + points[nv.index() as usize])
    });
    let beta = loop_beta(n);
    p * (1.0 - n as f32 * beta) + sum * beta
}

fn edge_point(topol: &Topology, e: EH, points: &[Vec3]) -> Vec3 {
    let (h, o) = e.halfedges();
    let pos = |v: VH| points[v.index() as usize];
    let vsum = pos(topol.from_vertex(h)) + pos(topol.to_vertex(h));
    if topol.is_boundary_edge(e) {
        return vsum * 0.5;
    }
    let (v2, v3) = (
        topol.to_vertex(topol.next_halfedge(h)),
        topol.to_vertex(topol.next_halfedge(o)),
    );
    (vsum * 3.0 + pos(v2) + pos(v3)) / 8.0
}

impl PolyMesh {
    /// Subdivide a triangle mesh once according to the [Loop subdivision
    /// scheme](https://en.wikipedia.org/wiki/Loop_subdivision_surface). Each
    /// triangle is replaced by four, and the mesh is smoothed.
    ///
    /// The subdivision happens in place by splitting every edge of the mesh,
    /// then flipping the new edges that connect an old vertex to a new
    /// vertex. Handles of the existing elements remain valid.
    ///
    /// ```rust
    /// use meshedit::PolyMesh;
    ///
    /// let mut mesh = PolyMesh::icosahedron(1.0).expect("Cannot create icosahedron");
    /// mesh.loop_subdivide().expect("Subdivision failed");
    /// assert_eq!((42, 120, 80), (mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()));
    /// mesh.check_topology().expect("Topological errors found");
    /// ```
    pub fn loop_subdivide(&mut self) -> Result<(), Error> {
        if !self.topol.is_editable() {
            return Err(Error::BorrowedPropertyAccess);
        }
        if let Some(f) = self.faces().find(|f| self.face_valence(*f) != 3) {
            return Err(Error::NonTriangleFace(f));
        }
        let mut new_points = self.topol.create_vertex_prop(Vec3::ZERO);
        let old_edges: Vec<EH> = self.edges().collect();
        let edge_points: Vec<Vec3> = {
            let points = self.points.try_borrow()?;
            let mut vpos = new_points.try_borrow_mut()?;
            for v in self.topol.vertices() {
                vpos[v] = vertex_point(&self.topol, v, &points);
            }
            old_edges
                .iter()
                .map(|e| edge_point(&self.topol, *e, &points))
                .collect()
        };
        let num_old_verts = self.topol.num_vertex_slots() as u32;
        let mut new_edges: Vec<EH> = Vec::with_capacity(old_edges.len() * 2);
        for (&e, &pos) in old_edges.iter().zip(edge_points.iter()) {
            let split = self.topol.split_edge(e)?;
            new_points.set(split.vertex, pos)?;
            new_edges.extend(split.cuts.iter().flatten());
        }
        let is_old = |v: VH| v.index() < num_old_verts;
        let mut nflips = 0usize;
        for e in new_edges {
            let h = e.halfedge(false);
            if is_old(self.topol.from_vertex(h)) == is_old(self.topol.to_vertex(h)) {
                continue;
            }
            if !self.topol.check_edge_flip(e) {
                trace!(edge = %e, "Cannot flip edge after splitting");
                continue;
            }
            self.topol.flip_edge(e);
            nflips += 1;
        }
        {
            let vpos = new_points.try_borrow()?;
            let mut points = self.points.try_borrow_mut()?;
            points.copy_from_slice(&vpos);
        }
        debug!(
            splits = old_edges.len(),
            flips = nflips,
            faces = self.num_faces(),
            "Loop subdivision"
        );
        Ok(())
    }

    /// Apply Loop subdivision to a triangle mesh for the given number of
    /// `iterations`.
    pub fn loop_subdivide_n(&mut self, iterations: usize) -> Result<(), Error> {
        for _ in 0..iterations {
            self.loop_subdivide()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use glam::{Vec3, vec3};

    use crate::{
        element::{FH, Handle},
        error::Error,
        macros::assert_vec3_eq,
        mesh::PolyMesh,
    };

    fn find_non_triangle(mesh: &PolyMesh) -> Option<FH> {
        mesh.faces().find(|f| mesh.face_valence(*f) != 3)
    }

    #[test]
    fn t_triangle_loop_subdivide() {
        let mut mesh = PolyMesh::from_polygons(
            &[
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 0.0, 0.0),
                vec3(1.0, 1.0, 0.0),
            ],
            &[[0u32, 1, 2]],
        )
        .expect("Cannot create mesh");
        mesh.loop_subdivide().expect("Cannot subdivide");
        mesh.check_topology().expect("Topological errors found");
        assert_eq!(6, mesh.num_vertices());
        assert_eq!(9, mesh.num_edges());
        assert_eq!(4, mesh.num_faces());
        assert!(find_non_triangle(&mesh).is_none());
        // Boundary vertices follow the boundary curve rule.
        assert_vec3_eq!(
            vec3(2.0, 1.0, 0.0) / 8.0,
            mesh.point(0u32.into()).expect("Cannot read point")
        );
        // Boundary edges get their midpoints.
        let mids: Vec<Vec3> = (3u32..6)
            .map(|i| mesh.point(i.into()).expect("Cannot read point"))
            .collect();
        assert!(mids.contains(&vec3(0.5, 0.0, 0.0)));
        assert!(mids.contains(&vec3(1.0, 0.5, 0.0)));
        assert!(mids.contains(&vec3(0.5, 0.5, 0.0)));
        // The center triangle connects the three new vertices.
        for i in 3u32..6 {
            assert_eq!(4, mesh.vertex_valence(i.into()));
        }
    }

    #[test]
    fn t_tetrahedron_loop_subdivide() {
        let mut tet = PolyMesh::tetrahedron(1.0).expect("Cannot create tetrahedron");
        tet.loop_subdivide().expect("Cannot subdivide");
        tet.check_topology().expect("Topological errors found");
        assert_eq!(10, tet.num_vertices());
        assert_eq!(24, tet.num_edges());
        assert_eq!(16, tet.num_faces());
        // Old vertices keep valence 3, new vertices have valence 6.
        for v in tet.vertices() {
            let expected = if v.index() < 4 { 3 } else { 6 };
            assert_eq!(expected, tet.vertex_valence(v));
        }
        // The smoothed mesh shrinks inside the circumscribed sphere.
        let points = tet.points();
        let points = points.try_borrow().expect("Cannot borrow points");
        assert!(points.iter().all(|p| p.length() < 1.0));
    }

    #[test]
    fn t_icosahedron_loop_subdivide_twice() {
        let mut mesh = PolyMesh::icosahedron(1.0).expect("Cannot create icosahedron");
        mesh.loop_subdivide_n(2).expect("Cannot subdivide");
        mesh.check_topology().expect("Topological errors found");
        assert_eq!(162, mesh.num_vertices());
        assert_eq!(480, mesh.num_edges());
        assert_eq!(320, mesh.num_faces());
        let area = mesh.try_calc_area().expect("Cannot compute area");
        assert!(area > 0.0 && area < 4.0 * std::f32::consts::PI);
    }

    #[test]
    fn t_loop_subdivide_quads() {
        let mut qbox = PolyMesh::unit_box().expect("Cannot create box");
        assert!(matches!(
            qbox.loop_subdivide(),
            Err(Error::NonTriangleFace(_))
        ));
        assert_eq!(12, qbox.num_edges());
    }
}
