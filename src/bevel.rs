use glam::Vec3;
use tracing::{debug, warn};

use crate::{
    edit::commit,
    element::{EH, FH, HH, VH},
    error::Error,
    iterator,
    mesh::PolyMesh,
    topol::Topology,
};

/// Direction in which [`PolyMesh::bevel_face_positions`] extrudes the inset
/// face.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// Along the face normal.
    #[default]
    Standard,
    /// Against the face normal.
    Flipped,
}

impl Orientation {
    fn sign(self) -> f32 {
        match self {
            Orientation::Standard => 1.0,
            Orientation::Flipped => -1.0,
        }
    }
}

impl Topology {
    pub fn check_vertex_bevel(&self, v: VH) -> bool {
        self.is_valid_vertex(v) && !self.is_boundary_vertex(v) && self.vertex_valence(v) > 2
    }

    pub fn check_edge_bevel(&self, e: EH) -> bool {
        if !self.is_valid_edge(e) || self.is_boundary_edge(e) {
            return false;
        }
        let (h, o) = e.halfedges();
        let (a, b) = (self.from_vertex(h), self.to_vertex(h));
        !self.is_boundary_vertex(a)
            && !self.is_boundary_vertex(b)
            && self.halfedge_face(h) != self.halfedge_face(o)
            && self.vertex_valence(a) + self.vertex_valence(b) > 4
    }

    /// Outgoing halfedges around the edge, as if the edge were collapsed. The
    /// spokes of the tail come first, followed by the spokes of the head. The
    /// edge itself is excluded.
    fn edge_spokes(&self, e: EH) -> (Vec<HH>, usize) {
        let (h, o) = e.halfedges();
        let mut spokes: Vec<HH> = iterator::voh_ccw_iter(self, self.from_vertex(h))
            .skip_while(|s| *s != h)
            .skip(1)
            .chain(
                iterator::voh_ccw_iter(self, self.from_vertex(h)).take_while(|s| *s != h),
            )
            .collect();
        let ntail = spokes.len();
        spokes.extend(
            iterator::voh_ccw_iter(self, self.from_vertex(o))
                .skip_while(|s| *s != o)
                .skip(1)
                .chain(
                    iterator::voh_ccw_iter(self, self.from_vertex(o)).take_while(|s| *s != o),
                ),
        );
        (spokes, ntail)
    }

    /// Detach the tail of every spoke into its own new vertex, and connect the
    /// new vertices with a new face. The spokes must be consecutive in
    /// counter-clockwise order around the region being replaced.
    ///
    /// Ring halfedge `i` of the new face starts at the new tail of spoke `i`.
    fn bevel_spokes(&mut self, spokes: &[HH]) -> Result<FH, Error> {
        let n = spokes.len();
        let mut verts = Vec::with_capacity(n);
        for _ in 0..n {
            verts.push(self.add_vertex()?);
        }
        // Halfedge cutting the corner between spoke i and spoke i + 1. Its
        // opposite belongs to the new face.
        let base = self.num_edge_slots() as u32;
        let cut = |i: usize| EH::from(base + (i % n) as u32).halfedge(false);
        for i in 0..n {
            let j = (i + 1) % n;
            self.new_edge(
                verts[j],
                verts[i],
                spokes[j].opposite(),
                spokes[i],
                cut(i + n - 1).opposite(),
                cut(j).opposite(),
            )?;
        }
        for (&s, &u) in spokes.iter().zip(verts.iter()) {
            self.set_halfedge_vertex(s.opposite(), u);
            self.set_vertex_halfedge(u, s);
        }
        let fnew = self.new_face(cut(0).opposite())?;
        for (i, &s) in spokes.iter().enumerate() {
            let c = cut(i);
            self.link_halfedges(spokes[(i + 1) % n].opposite(), c);
            self.link_halfedges(c, s);
            let f = self.halfedge_face(s);
            self.set_halfedge_face(c, f);
            if let Some(f) = f {
                self.set_face_halfedge(f, c);
            }
            self.set_halfedge_face(c.opposite(), Some(fnew));
        }
        Ok(fnew)
    }

    /// Insert a ring of quads between `f` and its neighbours. `f` is kept as the
    /// inner face, bounded by new vertices.
    fn bevel_face(&mut self, f: FH) -> Result<FH, Error> {
        let hs: Vec<HH> = iterator::fh_ccw_iter(self, f).collect();
        let n = hs.len();
        let verts: Vec<VH> = hs.iter().map(|h| self.from_vertex(*h)).collect();
        let mut inner = Vec::with_capacity(n);
        for _ in 0..n {
            inner.push(self.add_vertex()?);
        }
        let base = self.num_edge_slots() as u32;
        // From the original vertex i to the inner vertex i.
        let up = |i: usize| EH::from(base + (i % n) as u32).halfedge(false);
        // From the inner vertex i to the inner vertex i + 1.
        let rim = |i: usize| EH::from(base + (n + i % n) as u32).halfedge(false);
        for i in 0..n {
            self.new_edge(
                verts[i],
                inner[i],
                hs[(i + n - 1) % n],
                rim(i + n - 1).opposite(),
                rim(i).opposite(),
                hs[i],
            )?;
        }
        for i in 0..n {
            self.new_edge(
                inner[i],
                inner[(i + 1) % n],
                rim(i + n - 1),
                rim(i + 1),
                up(i + 1),
                up(i).opposite(),
            )?;
        }
        for (i, &h) in hs.iter().enumerate() {
            let quad = self.new_face(h)?;
            self.link_halfedges(h, up(i + 1));
            self.link_halfedges(up(i).opposite(), h);
            for x in [h, up(i + 1), rim(i).opposite(), up(i).opposite()] {
                self.set_halfedge_face(x, Some(quad));
            }
            self.set_halfedge_face(rim(i), Some(f));
            self.set_vertex_halfedge(inner[i], rim(i));
        }
        self.set_face_halfedge(f, rim(0));
        Ok(f)
    }
}

/// Unit normal of a polygon from Newell's method.
fn polygon_normal(poly: &[Vec3]) -> Vec3 {
    poly.iter()
        .zip(poly.iter().cycle().skip(1))
        .fold(Vec3::ZERO, |n, (pc, pn)| {
            let (a, b) = (*pc - *pn, *pc + *pn);
            n + Vec3::new(a.y * b.z, a.z * b.x, a.x * b.y)
        })
        .normalize_or_zero()
}

impl PolyMesh {
    /// Replace an interior vertex with a new face. The face has one vertex
    /// for each edge incident on the original vertex, and all of them start
    /// at the position of the original vertex. Use
    /// [`Self::bevel_vertex_positions`] to move them.
    pub fn bevel_vertex(&mut self, v: VH) -> Option<FH> {
        if !self.can_edit("bevel_vertex") {
            return None;
        }
        if !self.topol.check_vertex_bevel(v) {
            debug!(vertex = %v, "Refusing to bevel vertex");
            return None;
        }
        commit("bevel_vertex", self.bevel_vertex_impl(v))
    }

    fn bevel_vertex_impl(&mut self, v: VH) -> Result<FH, Error> {
        let pos = self.point(v)?;
        let spokes: Vec<HH> = iterator::voh_ccw_iter(&self.topol, v).collect();
        let f = self.topol.bevel_spokes(&spokes)?;
        self.topol.clear_vertex_halfedge(v);
        self.topol.delete_vertex(v);
        let mut points = self.points.try_borrow_mut()?;
        for s in spokes {
            points[self.topol.from_vertex(s)] = pos;
        }
        Ok(f)
    }

    /// Replace an interior edge with a new face, whose vertices start at the
    /// positions of the endpoints of the edge. The faces that shared an
    /// endpoint with the edge gain a side.
    pub fn bevel_edge(&mut self, e: EH) -> Option<FH> {
        if !self.can_edit("bevel_edge") {
            return None;
        }
        if !self.topol.check_edge_bevel(e) {
            debug!(edge = %e, "Refusing to bevel edge");
            return None;
        }
        commit("bevel_edge", self.bevel_edge_impl(e))
    }

    fn bevel_edge_impl(&mut self, e: EH) -> Result<FH, Error> {
        let (h, _) = e.halfedges();
        let (a, b) = (self.topol.from_vertex(h), self.topol.to_vertex(h));
        let (pa, pb) = (self.point(a)?, self.point(b)?);
        let (spokes, ntail) = self.topol.edge_spokes(e);
        let f = self.topol.bevel_spokes(&spokes)?;
        self.topol.delete_edge(e);
        for v in [a, b] {
            self.topol.clear_vertex_halfedge(v);
            self.topol.delete_vertex(v);
        }
        let mut points = self.points.try_borrow_mut()?;
        for (i, s) in spokes.into_iter().enumerate() {
            points[self.topol.from_vertex(s)] = if i < ntail { pa } else { pb };
        }
        Ok(f)
    }

    /// Inset the face `f`, connecting it to its old boundary with a ring of
    /// quads. The face keeps its handle, and is returned. The new vertices
    /// start at the positions of the original vertices of the face.
    pub fn bevel_face(&mut self, f: FH) -> Option<FH> {
        if !self.can_edit("bevel_face") {
            return None;
        }
        if !self.topol.is_valid_face(f) {
            debug!(face = %f, "Refusing to bevel face");
            return None;
        }
        commit("bevel_face", self.bevel_face_impl(f))
    }

    fn bevel_face_impl(&mut self, f: FH) -> Result<FH, Error> {
        let f = self.topol.bevel_face(f)?;
        let mut points = self.points.try_borrow_mut()?;
        for h in iterator::fh_ccw_iter(&self.topol, f) {
            let orig = points[self.topol.to_vertex(self.topol.next_halfedge(h.opposite()))];
            points[self.topol.from_vertex(h)] = orig;
        }
        Ok(f)
    }

    fn bevel_ring(&self, face: FH) -> Result<Vec<HH>, Error> {
        if !self.topol.is_valid_face(face) {
            return Err(Error::DeletedFace(face));
        }
        Ok(iterator::fh_ccw_iter(&self.topol, face).collect())
    }

    /// Current positions of the vertices of a bevel face, in ring order. These
    /// are meant to be captured right after the bevel, and passed to the
    /// position solvers on every update.
    pub fn bevel_start_positions(&self, face: FH) -> Result<Vec<Vec3>, Error> {
        let ring = self.bevel_ring(face)?;
        let points = self.points.try_borrow()?;
        Ok(ring
            .iter()
            .map(|h| points[self.topol.from_vertex(*h)])
            .collect())
    }

    /// Slide every ring vertex from its start position toward the far end of
    /// its spoke edge by `offset`.
    fn slide_along_spokes(
        &mut self,
        op: &'static str,
        start_positions: &[Vec3],
        face: FH,
        offset: f32,
    ) -> Result<(), Error> {
        let ring = self.bevel_ring(face)?;
        if ring.len() != start_positions.len() {
            warn!(
                op,
                expected = ring.len(),
                found = start_positions.len(),
                "Ignoring start positions that don't match the bevel face"
            );
            return Ok(());
        }
        let mut points = self.points.try_borrow_mut()?;
        for (h, start) in ring.iter().zip(start_positions) {
            let far = points[self.topol.to_vertex(self.topol.next_halfedge(h.opposite()))];
            let dir = far - *start;
            let dist = offset.clamp(0.0, dir.length());
            points[self.topol.from_vertex(*h)] = *start + dir.normalize_or_zero() * dist;
        }
        Ok(())
    }

    /// Position the vertices of a face created by [`Self::bevel_vertex`].
    /// Every vertex slides along its edge away from the start position by
    /// `tangent_offset`, up to the length of the edge.
    ///
    /// ```rust
    /// use meshedit::PolyMesh;
    ///
    /// let mut qbox = PolyMesh::unit_box().expect("Cannot create box");
    /// let f = qbox.bevel_vertex(6u32.into()).expect("Cannot bevel vertex");
    /// let start = qbox.bevel_start_positions(f).expect("Cannot read positions");
    /// qbox.bevel_vertex_positions(&start, f, 0.25)
    ///     .expect("Cannot update positions");
    /// let area = qbox.try_calc_area().expect("Cannot compute area");
    /// assert!(area < 6.0);
    /// ```
    pub fn bevel_vertex_positions(
        &mut self,
        start_positions: &[Vec3],
        face: FH,
        tangent_offset: f32,
    ) -> Result<(), Error> {
        self.slide_along_spokes("bevel_vertex_positions", start_positions, face, tangent_offset)
    }

    /// Position the vertices of a face created by [`Self::bevel_edge`], the
    /// same way as [`Self::bevel_vertex_positions`].
    pub fn bevel_edge_positions(
        &mut self,
        start_positions: &[Vec3],
        face: FH,
        tangent_offset: f32,
    ) -> Result<(), Error> {
        self.slide_along_spokes("bevel_edge_positions", start_positions, face, tangent_offset)
    }

    /// Position the vertices of a face created by [`Self::bevel_face`].
    ///
    /// The edges of the face are moved inward by `tangent_offset`, staying
    /// parallel to the original edges, and the whole face is moved along the
    /// normal of the original face by `normal_offset`. The positions are
    /// always computed from `start_positions`, so this can be called
    /// repeatedly with different offsets.
    pub fn bevel_face_positions(
        &mut self,
        start_positions: &[Vec3],
        face: FH,
        tangent_offset: f32,
        normal_offset: f32,
        orientation: Orientation,
    ) -> Result<(), Error> {
        let ring = self.bevel_ring(face)?;
        let n = ring.len();
        if n != start_positions.len() {
            warn!(
                expected = n,
                found = start_positions.len(),
                "Ignoring start positions that don't match the bevel face"
            );
            return Ok(());
        }
        let normal = polygon_normal(start_positions);
        let lift = normal * normal_offset * orientation.sign();
        let mut points = self.points.try_borrow_mut()?;
        for (i, h) in ring.iter().enumerate() {
            let p = start_positions[i];
            let prev = start_positions[(i + n - 1) % n];
            let next = start_positions[(i + 1) % n];
            let n0 = normal.cross(p - prev).normalize_or_zero();
            let n1 = normal.cross(next - p).normalize_or_zero();
            let denom = 1.0 + n0.dot(n1);
            let inset = if denom < 1e-4 {
                n0 * tangent_offset
            } else {
                (n0 + n1) * (tangent_offset / denom)
            };
            points[self.topol.from_vertex(*h)] = p + inset + lift;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use glam::{Vec3, vec3};

    use crate::{
        bevel::Orientation,
        element::{EH, FH},
        iterator::HasIterators,
        macros::{assert_f32_eq, assert_vec3_eq},
        mesh::PolyMesh,
    };

    fn box_edge(qbox: &PolyMesh, a: u32, b: u32) -> EH {
        qbox.find_halfedge(a.into(), b.into())
            .expect("Cannot find halfedge")
            .edge()
    }

    #[test]
    fn t_box_bevel_vertex() {
        let mut qbox = PolyMesh::unit_box().expect("Cannot create box");
        let f = qbox.bevel_vertex(6u32.into()).expect("Cannot bevel vertex");
        qbox.check_topology().expect("Topological errors found");
        assert_eq!(10, qbox.num_vertices());
        assert_eq!(15, qbox.num_edges());
        assert_eq!(7, qbox.num_faces());
        assert_eq!(3, qbox.face_valence(f));
        assert!(qbox.is_deleted_vertex(6u32.into()));
        // The faces around the vertex gain a side.
        assert_eq!(
            3,
            qbox.faces().filter(|f| qbox.face_valence(*f) == 5).count()
        );
        let start = qbox
            .bevel_start_positions(f)
            .expect("Cannot read start positions");
        assert_eq!(3, start.len());
        for p in &start {
            assert_eq!(Vec3::ONE, *p);
        }
    }

    #[test]
    fn t_bevel_vertex_positions() {
        let mut qbox = PolyMesh::unit_box().expect("Cannot create box");
        let f = qbox.bevel_vertex(6u32.into()).expect("Cannot bevel vertex");
        let start = qbox
            .bevel_start_positions(f)
            .expect("Cannot read start positions");
        let check = |qbox: &PolyMesh, dist: f32| {
            for v in qbox.fv_ccw_iter(f) {
                let p = qbox.point(v).expect("Cannot read point");
                assert_f32_eq!(dist, (p - Vec3::ONE).length(), 1e-6);
                // Each vertex stays on one of the edges of the box.
                assert_eq!(2, [p.x, p.y, p.z].iter().filter(|c| **c == 1.0).count());
            }
        };
        qbox.bevel_vertex_positions(&start, f, 0.25)
            .expect("Cannot update positions");
        check(&qbox, 0.25);
        // Positions are recomputed from the start, not accumulated.
        qbox.bevel_vertex_positions(&start, f, 0.5)
            .expect("Cannot update positions");
        check(&qbox, 0.5);
        // Offsets are clamped to the length of the edges.
        qbox.bevel_vertex_positions(&start, f, 5.0)
            .expect("Cannot update positions");
        check(&qbox, 1.0);
        qbox.check_topology().expect("Topological errors found");
    }

    #[test]
    fn t_bevel_boundary_vertex() {
        let mut grid = PolyMesh::quad_grid(1.0, 1.0, 2, 2).expect("Cannot create grid");
        assert_eq!(None, grid.bevel_vertex(1u32.into()));
        assert_eq!(9, grid.num_vertices());
        let f = grid.bevel_vertex(4u32.into()).expect("Cannot bevel vertex");
        grid.check_topology().expect("Topological errors found");
        assert_eq!(4, grid.face_valence(f));
    }

    #[test]
    fn t_box_bevel_edge() {
        let mut qbox = PolyMesh::unit_box().expect("Cannot create box");
        let e = box_edge(&qbox, 5, 6);
        let f = qbox.bevel_edge(e).expect("Cannot bevel edge");
        qbox.check_topology().expect("Topological errors found");
        assert_eq!(10, qbox.num_vertices());
        assert_eq!(15, qbox.num_edges());
        assert_eq!(7, qbox.num_faces());
        assert_eq!(4, qbox.face_valence(f));
        assert!(qbox.is_deleted_edge(e));
        assert_eq!(
            (4, 2),
            qbox.faces()
                .filter(|g| *g != f)
                .fold((0usize, 0usize), |(q, p), g| match qbox.face_valence(g) {
                    4 => (q + 1, p),
                    5 => (q, p + 1),
                    _ => (q, p),
                })
        );
        let start = qbox
            .bevel_start_positions(f)
            .expect("Cannot read start positions");
        for p in &start {
            assert!(*p == vec3(1.0, 0.0, 1.0) || *p == vec3(1.0, 1.0, 1.0));
        }
        qbox.bevel_edge_positions(&start, f, 0.25)
            .expect("Cannot update positions");
        qbox.check_topology().expect("Topological errors found");
        for (v, p) in qbox.fv_ccw_iter(f).zip(start.iter().cycle().skip(1)) {
            let moved = qbox.point(v).expect("Cannot read point");
            assert_f32_eq!(0.25, (moved - *p).length(), 1e-6);
        }
    }

    #[test]
    fn t_bevel_boundary_edge() {
        let mut grid = PolyMesh::quad_grid(1.0, 1.0, 2, 2).expect("Cannot create grid");
        let e = grid
            .find_halfedge(0u32.into(), 1u32.into())
            .expect("Cannot find halfedge")
            .edge();
        assert_eq!(None, grid.bevel_edge(e));
        // Interior edge, but with an endpoint on the boundary.
        let e = grid
            .find_halfedge(1u32.into(), 4u32.into())
            .expect("Cannot find halfedge")
            .edge();
        assert_eq!(None, grid.bevel_edge(e));
        grid.check_topology().expect("Topological errors found");
    }

    #[test]
    fn t_box_bevel_face() {
        let mut qbox = PolyMesh::unit_box().expect("Cannot create box");
        let top: FH = 5u32.into();
        let f = qbox.bevel_face(top).expect("Cannot bevel face");
        assert_eq!(top, f);
        qbox.check_topology().expect("Topological errors found");
        assert_eq!(12, qbox.num_vertices());
        assert_eq!(20, qbox.num_edges());
        assert_eq!(10, qbox.num_faces());
        assert!(qbox.faces().all(|f| qbox.face_valence(f) == 4));
        let start = qbox
            .bevel_start_positions(f)
            .expect("Cannot read start positions");
        assert_eq!(4, start.len());
        assert!(start.iter().all(|p| p.z == 1.0));
        qbox.bevel_face_positions(&start, f, 0.1, 0.2, Orientation::Standard)
            .expect("Cannot update positions");
        qbox.check_topology().expect("Topological errors found");
        for v in qbox.fv_ccw_iter(f) {
            let p = qbox.point(v).expect("Cannot read point");
            assert_f32_eq!(1.2, p.z, 1e-6);
            for c in [p.x, p.y] {
                assert!((c - 0.1).abs() < 1e-6 || (c - 0.9).abs() < 1e-6);
            }
        }
        assert_vec3_eq!(
            vec3(0.5, 0.5, 1.2),
            qbox.try_calc_face_centroid(f)
                .expect("Cannot compute centroid")
        );
        qbox.bevel_face_positions(&start, f, 0.1, 0.2, Orientation::Flipped)
            .expect("Cannot update positions");
        assert_vec3_eq!(
            vec3(0.5, 0.5, 0.8),
            qbox.try_calc_face_centroid(f)
                .expect("Cannot compute centroid")
        );
    }

    #[test]
    fn t_bevel_face_mismatched_positions() {
        let mut qbox = PolyMesh::unit_box().expect("Cannot create box");
        let f = qbox.bevel_face(5u32.into()).expect("Cannot bevel face");
        let before = qbox
            .bevel_start_positions(f)
            .expect("Cannot read start positions");
        qbox.bevel_face_positions(&before[..2], f, 0.1, 0.2, Orientation::Standard)
            .expect("Mismatched positions must be ignored");
        assert_eq!(
            before,
            qbox.bevel_start_positions(f)
                .expect("Cannot read start positions")
        );
    }

    #[test]
    fn t_tetrahedron_bevel_face() {
        let mut tet = PolyMesh::tetrahedron(1.0).expect("Cannot create a tetrahedron");
        let f = tet.bevel_face(0u32.into()).expect("Cannot bevel face");
        tet.check_topology().expect("Topological errors found");
        assert_eq!(3, tet.face_valence(f));
        assert_eq!(7, tet.num_faces());
        assert_eq!(7, tet.num_vertices());
        assert_eq!(12, tet.num_edges());
    }
}
