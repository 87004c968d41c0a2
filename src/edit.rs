use glam::Vec3;
use tracing::{debug, warn};

use crate::{
    element::{EH, FH, HH, VH},
    error::Error,
    iterator,
    mesh::PolyMesh,
    topol::Topology,
};

/// Result of splitting an edge with [`Topology::split_edge`].
pub(crate) struct EdgeSplit {
    /// The vertex inserted on the edge.
    pub vertex: VH,
    /// Edges cutting the incident faces, one for each side of the edge that
    /// is not a boundary.
    pub cuts: [Option<EH>; 2],
}

impl Topology {
    /// Remove the loop of two halfedges that contains `h`. The edge of `h` is
    /// deleted, along with the face of the loop, and the next halfedge of `h`
    /// takes the place of the opposite of `h` in the neighbouring loop.
    pub(crate) fn collapse_degenerate_loop(&mut self, h: HH) {
        let h1 = self.next_halfedge(h);
        debug_assert_eq!(self.next_halfedge(h1), h);
        let o = h.opposite();
        let (on, op) = (self.next_halfedge(o), self.prev_halfedge(o));
        let v0 = self.to_vertex(h);
        let v1 = self.to_vertex(h1);
        let fh = self.halfedge_face(h);
        let fo = self.halfedge_face(o);
        self.link_halfedges(h1, on);
        self.link_halfedges(op, h1);
        self.set_halfedge_face(h1, fo);
        self.set_vertex_halfedge(v0, h1);
        self.set_vertex_halfedge(v1, h1.opposite());
        if let Some(fo) = fo {
            if self.face_halfedge(fo) == o {
                self.set_face_halfedge(fo, h1);
            }
        }
        if let Some(fh) = fh {
            self.delete_face(fh);
        }
        self.delete_edge(h.edge());
        self.adjust_outgoing_halfedge(v0);
        self.adjust_outgoing_halfedge(v1);
    }

    /// Check if an edge can be flipped without breaking the mesh.
    pub fn check_edge_flip(&self, e: EH) -> bool {
        if !self.is_valid_edge(e) || self.is_boundary_edge(e) {
            return false;
        }
        let (h, o) = e.halfedges();
        if self.halfedge_face(h) == self.halfedge_face(o) {
            return false;
        }
        if self.vertex_valence(self.from_vertex(h)) < 3 || self.vertex_valence(self.to_vertex(h)) < 3
        {
            return false;
        }
        // The rotated edge must not connect a vertex to itself.
        self.to_vertex(self.next_halfedge(h)) != self.to_vertex(self.next_halfedge(o))
    }

    /// Rotate the edge counter-clockwise inside the two incident faces, by one
    /// vertex on each side. The caller must make sure the flip is allowed.
    pub(crate) fn flip_edge(&mut self, e: EH) {
        let (h, o) = e.halfedges();
        let (hn, hp) = (self.next_halfedge(h), self.prev_halfedge(h));
        let (on, op) = (self.next_halfedge(o), self.prev_halfedge(o));
        let (hnn, onn) = (self.next_halfedge(hn), self.next_halfedge(on));
        let (f0, f1) = (self.halfedge_face(h), self.halfedge_face(o));
        let (a, b) = (self.from_vertex(h), self.to_vertex(h));
        let (c, d) = (self.to_vertex(hn), self.to_vertex(on));
        self.link_halfedges(h, hnn);
        self.link_halfedges(hp, on);
        self.link_halfedges(on, h);
        self.link_halfedges(o, onn);
        self.link_halfedges(op, hn);
        self.link_halfedges(hn, o);
        self.set_halfedge_vertex(h, c);
        self.set_halfedge_vertex(o, d);
        self.set_halfedge_face(on, f0);
        self.set_halfedge_face(hn, f1);
        if let Some(f0) = f0 {
            self.set_face_halfedge(f0, h);
        }
        if let Some(f1) = f1 {
            self.set_face_halfedge(f1, o);
        }
        if self.vertex_halfedge(a) == Some(h) {
            self.set_vertex_halfedge(a, on);
        }
        if self.vertex_halfedge(b) == Some(o) {
            self.set_vertex_halfedge(b, hn);
        }
    }

    /// Insert a new vertex on `e`, and connect it to the vertex following the
    /// edge in each incident face. Boundary edges are split too, in which case
    /// only the interior side gets cut.
    pub(crate) fn split_edge(&mut self, e: EH) -> Result<EdgeSplit, Error> {
        let (h, o) = e.halfedges();
        let a = self.from_vertex(h);
        let (hn, hp) = (self.next_halfedge(h), self.prev_halfedge(h));
        let on = self.next_halfedge(o);
        let (f0, f1) = (self.halfedge_face(h), self.halfedge_face(o));
        let m = self.add_vertex()?;
        let (hnew, onew) = self.new_edge(a, m, hp, h, o, on)?.halfedges();
        self.set_halfedge_vertex(o, m);
        self.link_halfedges(hp, hnew);
        self.link_halfedges(hnew, h);
        self.link_halfedges(o, onew);
        self.link_halfedges(onew, on);
        self.set_halfedge_face(hnew, f0);
        self.set_halfedge_face(onew, f1);
        self.set_vertex_halfedge(m, h);
        if self.vertex_halfedge(a) == Some(h) {
            self.set_vertex_halfedge(a, hnew);
        }
        let cut0 = match f0 {
            Some(_) => Some(self.split_face(hnew, self.next_halfedge(hn))?),
            None => None,
        };
        let cut1 = match f1 {
            Some(_) => Some(self.split_face(o, self.next_halfedge(on))?),
            None => None,
        };
        self.adjust_outgoing_halfedge(m);
        Ok(EdgeSplit {
            vertex: m,
            cuts: [cut0, cut1],
        })
    }

    /// Check if an edge can be collapsed into a single vertex.
    pub fn check_edge_collapse(&self, e: EH) -> bool {
        if !self.is_valid_edge(e) || self.num_edges() < 2 {
            return false;
        }
        let (h, oh) = e.halfedges();
        let v0 = self.from_vertex(h);
        let v1 = self.to_vertex(h);
        let htriangle = self
            .halfedge_face(h)
            .is_some_and(|f| self.face_valence(f) == 3);
        let ohtriangle = self
            .halfedge_face(oh)
            .is_some_and(|f| self.face_valence(f) == 3);
        // A triangle must not be left hanging by two boundary edges, nor fold
        // onto a single face.
        for (h, triangle) in [(h, htriangle), (oh, ohtriangle)] {
            if !triangle {
                continue;
            }
            let h1 = self.next_halfedge(h).opposite();
            let h2 = self.prev_halfedge(h).opposite();
            match (self.halfedge_face(h1), self.halfedge_face(h2)) {
                (None, None) => return false,
                (Some(fa), Some(fb)) if fa == fb => return false,
                _ => {}
            }
        }
        let vl = self.to_vertex(self.next_halfedge(h));
        let vr = self.to_vertex(self.next_halfedge(oh));
        if htriangle && ohtriangle && vl == vr {
            return false;
        }
        // Collapsing across two different boundaries.
        if self.is_boundary_vertex(v0)
            && self.is_boundary_vertex(v1)
            && !self.is_boundary_halfedge(h)
            && !self.is_boundary_halfedge(oh)
        {
            return false;
        }
        // Another edge between the same vertices would become a loop.
        if iterator::vv_ccw_iter(self, v0).filter(|v| *v == v1).count() != 1 {
            return false;
        }
        // Link condition: the only common neighbours of the two vertices are
        // the opposite vertices of the incident triangles.
        let ring: Vec<VH> = iterator::vv_ccw_iter(self, v1).collect();
        iterator::vv_ccw_iter(self, v0).all(|v| {
            !ring.contains(&v) || (v == vl && htriangle) || (v == vr && ohtriangle)
        })
    }

    /// Merge the two vertices of `e` into a new vertex. The caller must make
    /// sure the collapse is allowed.
    pub(crate) fn collapse_edge(&mut self, e: EH) -> Result<VH, Error> {
        let (h, o) = e.halfedges();
        let (hn, hp) = (self.next_halfedge(h), self.prev_halfedge(h));
        let (on, op) = (self.next_halfedge(o), self.prev_halfedge(o));
        let (fh, fo) = (self.halfedge_face(h), self.halfedge_face(o));
        let (a, b) = (self.from_vertex(h), self.to_vertex(h));
        let incoming: Vec<HH> = iterator::vih_ccw_iter(self, a)
            .chain(iterator::vih_ccw_iter(self, b))
            .filter(|ih| ih.edge() != e)
            .collect();
        let m = self.add_vertex()?;
        for ih in incoming {
            self.set_halfedge_vertex(ih, m);
        }
        self.link_halfedges(hp, hn);
        self.link_halfedges(op, on);
        if let Some(fh) = fh {
            self.set_face_halfedge(fh, hn);
        }
        if let Some(fo) = fo {
            self.set_face_halfedge(fo, on);
        }
        self.set_vertex_halfedge(m, hn);
        self.clear_vertex_halfedge(a);
        self.clear_vertex_halfedge(b);
        self.delete_edge(e);
        self.delete_vertex(a);
        self.delete_vertex(b);
        if self.next_halfedge(hn) == hp {
            self.collapse_degenerate_loop(hn);
        }
        if self.next_halfedge(on) == op {
            self.collapse_degenerate_loop(on);
        }
        self.adjust_outgoing_halfedge(m);
        Ok(m)
    }

    /// Check if an interior vertex can be removed by merging its faces.
    pub fn check_vertex_erase(&self, v: VH) -> bool {
        if !self.is_valid_vertex(v) || self.is_boundary_vertex(v) || self.vertex_valence(v) < 3 {
            return false;
        }
        let faces: Vec<FH> = iterator::vf_ccw_iter(self, v).collect();
        if (1..faces.len()).any(|i| faces[..i].contains(&faces[i])) {
            return false;
        }
        iterator::vv_ccw_iter(self, v).all(|w| self.vertex_valence(w) > 2)
    }

    /// Delete `v` and its edges, merging the faces around it into one. The
    /// caller must make sure the erasure is allowed.
    pub(crate) fn erase_vertex(&mut self, v: VH) -> Result<FH, Error> {
        let hs: Vec<HH> = iterator::voh_ccw_iter(self, v).collect();
        let f = match hs.first().and_then(|h| self.halfedge_face(*h)) {
            Some(f) => f,
            None => return Err(Error::BoundaryVertex(v)),
        };
        let links: Vec<(HH, HH)> = hs
            .iter()
            .map(|h| (self.prev_halfedge(h.opposite()), self.next_halfedge(*h)))
            .collect();
        for &(p, n) in &links {
            self.link_halfedges(p, n);
        }
        let start = links[0].1;
        let merged: Vec<HH> = iterator::loop_ccw_iter(self, start).collect();
        for h in merged {
            self.set_halfedge_face(h, Some(f));
        }
        self.set_face_halfedge(f, start);
        for &h in &hs {
            let w = self.to_vertex(h);
            if self.vertex_halfedge(w) == Some(h.opposite()) {
                self.set_vertex_halfedge(w, self.next_halfedge(h));
            }
            match self.halfedge_face(h) {
                Some(g) if g != f => self.delete_face(g),
                _ => {}
            }
            self.delete_edge(h.edge());
        }
        self.clear_vertex_halfedge(v);
        self.delete_vertex(v);
        Ok(f)
    }

    /// Check if an interior edge can be removed by merging its two faces.
    pub fn check_edge_erase(&self, e: EH) -> bool {
        if !self.is_valid_edge(e) || self.is_boundary_edge(e) {
            return false;
        }
        let (h, o) = e.halfedges();
        self.halfedge_face(h) != self.halfedge_face(o)
            && self.vertex_valence(self.from_vertex(h)) > 2
            && self.vertex_valence(self.to_vertex(h)) > 2
    }

    /// Delete `e` and merge the face on its second side into the face on its
    /// first side. The caller must make sure the erasure is allowed.
    pub(crate) fn erase_edge(&mut self, e: EH) -> Result<FH, Error> {
        let (h, o) = e.halfedges();
        let (f0, f1) = match (self.halfedge_face(h), self.halfedge_face(o)) {
            (Some(f0), Some(f1)) => (f0, f1),
            _ => return Err(Error::BoundaryEdge(e)),
        };
        let (hn, hp) = (self.next_halfedge(h), self.prev_halfedge(h));
        let (on, op) = (self.next_halfedge(o), self.prev_halfedge(o));
        let (a, b) = (self.from_vertex(h), self.to_vertex(h));
        self.link_halfedges(hp, on);
        self.link_halfedges(op, hn);
        let merged: Vec<HH> = iterator::loop_ccw_iter(self, hn).collect();
        for x in merged {
            self.set_halfedge_face(x, Some(f0));
        }
        self.set_face_halfedge(f0, hn);
        if self.vertex_halfedge(a) == Some(h) {
            self.set_vertex_halfedge(a, on);
        }
        if self.vertex_halfedge(b) == Some(o) {
            self.set_vertex_halfedge(b, hn);
        }
        self.delete_face(f1);
        self.delete_edge(e);
        Ok(f0)
    }

    /// Check if a face can be shrunk into a single vertex.
    pub fn check_face_collapse(&self, f: FH) -> bool {
        if !self.is_valid_face(f) {
            return false;
        }
        let hs: Vec<HH> = iterator::fh_ccw_iter(self, f).collect();
        let n = hs.len();
        let verts: Vec<VH> = hs.iter().map(|h| self.from_vertex(*h)).collect();
        if (1..n).any(|i| verts[..i].contains(&verts[i])) {
            return false;
        }
        // At most one boundary edge, and no boundary vertex away from it.
        let nbedges = hs
            .iter()
            .filter(|h| self.is_boundary_halfedge(h.opposite()))
            .count();
        let nbverts = verts.iter().filter(|v| self.is_boundary_vertex(**v)).count();
        match nbedges {
            0 if nbverts > 1 => return false,
            1 if nbverts > 2 => return false,
            0 | 1 => {}
            _ => return false,
        }
        // Neighbouring faces must be distinct.
        let nbr_faces: Vec<FH> = hs
            .iter()
            .filter_map(|h| self.halfedge_face(h.opposite()))
            .collect();
        if (1..nbr_faces.len()).any(|i| nbr_faces[..i].contains(&nbr_faces[i])) {
            return false;
        }
        // No chords between the vertices of the face.
        for (i, h) in hs.iter().enumerate() {
            let prev_opp = hs[(i + n - 1) % n].opposite();
            if iterator::voh_ccw_iter(self, verts[i])
                .any(|g| g != *h && g != prev_opp && verts.contains(&self.to_vertex(g)))
            {
                return false;
            }
        }
        // Triangles across the face edges must not be left hanging, or fold.
        for h in &hs {
            let o = h.opposite();
            let Some(g) = self.halfedge_face(o) else {
                continue;
            };
            if self.face_valence(g) != 3 {
                continue;
            }
            let x = self.next_halfedge(o).opposite();
            let y = self.prev_halfedge(o).opposite();
            match (self.halfedge_face(x), self.halfedge_face(y)) {
                (None, None) => return false,
                (Some(fa), Some(fb)) if fa == fb => return false,
                _ => {}
            }
        }
        // A vertex outside the face may only neighbour two consecutive face
        // vertices, as the apex of the triangle across their edge.
        let mut nbrs: Vec<(VH, usize)> = Vec::new();
        for (i, v) in verts.iter().enumerate() {
            nbrs.extend(
                iterator::vv_ccw_iter(self, *v)
                    .filter(|w| !verts.contains(w))
                    .map(|w| (w, i)),
            );
        }
        nbrs.sort();
        for group in nbrs.chunk_by(|a, b| a.0 == b.0) {
            match group {
                [_] => {}
                [(w, i), (_, j)] => {
                    let k = if (i + 1) % n == *j {
                        *i
                    } else if (j + 1) % n == *i {
                        *j
                    } else {
                        return false;
                    };
                    let o = hs[k].opposite();
                    let is_apex = self
                        .halfedge_face(o)
                        .is_some_and(|g| self.face_valence(g) == 3)
                        && self.to_vertex(self.next_halfedge(o)) == *w;
                    if !is_apex {
                        return false;
                    }
                }
                _ => return false,
            }
        }
        true
    }

    /// Shrink the face `f` into a new vertex, deleting the face, its edges and
    /// its vertices. The caller must make sure the collapse is allowed.
    pub(crate) fn collapse_face(&mut self, f: FH) -> Result<VH, Error> {
        let hs: Vec<HH> = iterator::fh_ccw_iter(self, f).collect();
        let verts: Vec<VH> = hs.iter().map(|h| self.from_vertex(*h)).collect();
        let incoming: Vec<HH> = verts
            .iter()
            .flat_map(|v| iterator::vih_ccw_iter(self, *v))
            .filter(|ih| !hs.contains(ih) && !hs.contains(&ih.opposite()))
            .collect();
        let m = self.add_vertex()?;
        for &ih in &incoming {
            self.set_halfedge_vertex(ih, m);
        }
        let mut outer = Vec::with_capacity(hs.len());
        for h in &hs {
            let o = h.opposite();
            let (on, op) = (self.next_halfedge(o), self.prev_halfedge(o));
            self.link_halfedges(op, on);
            if let Some(g) = self.halfedge_face(o) {
                if self.face_halfedge(g) == o {
                    self.set_face_halfedge(g, on);
                }
            }
            outer.push(on);
            self.delete_edge(h.edge());
        }
        self.delete_face(f);
        for &v in &verts {
            self.clear_vertex_halfedge(v);
            self.delete_vertex(v);
        }
        match incoming.first() {
            Some(ih) => self.set_vertex_halfedge(m, ih.opposite()),
            None => self.clear_vertex_halfedge(m),
        }
        for h in outer {
            if !self.is_deleted_halfedge(h) && self.next_halfedge(self.next_halfedge(h)) == h {
                self.collapse_degenerate_loop(h);
            }
        }
        self.adjust_outgoing_halfedge(m);
        Ok(m)
    }
}

/// Log and swallow the error of a local operation that failed after its
/// checks passed.
pub(crate) fn commit<T>(op: &'static str, result: Result<T, Error>) -> Option<T> {
    match result {
        Ok(val) => Some(val),
        Err(err) => {
            warn!(op, %err, "Local operation failed");
            None
        }
    }
}

impl PolyMesh {
    /// All local operations refuse to edit the mesh while one of its
    /// properties is borrowed.
    pub(crate) fn can_edit(&self, op: &'static str) -> bool {
        let editable = self.topol.is_editable();
        if !editable {
            debug!(op, "Refusing to edit a mesh with borrowed properties");
        }
        editable
    }

    /// Flip the edge `e`, i.e. rotate it inside the quadrilateral formed by
    /// its two triangles, so that it connects the other two corners.
    ///
    /// The edge keeps its handle. `None` is returned without touching the
    /// mesh if `e` is a boundary edge, or if the flip would produce a
    /// degenerate edge.
    ///
    /// ```rust
    /// use meshedit::PolyMesh;
    ///
    /// let mut tet = PolyMesh::tetrahedron(1.0).expect("Cannot create a tetrahedron");
    /// let e = tet.edges().next().expect("No edges found");
    /// assert_eq!(Some(e), tet.flip_edge(e));
    /// tet.check_topology().expect("Topological errors found");
    /// ```
    pub fn flip_edge(&mut self, e: EH) -> Option<EH> {
        if !self.can_edit("flip_edge") {
            return None;
        }
        if !self.topol.check_edge_flip(e) {
            debug!(edge = %e, "Refusing to flip edge");
            return None;
        }
        self.topol.flip_edge(e);
        Some(e)
    }

    /// Insert a new vertex at the midpoint of the edge `e`, and connect it to
    /// the vertex following the edge in each of the two incident faces. Two
    /// triangles become four. Boundary edges are not split.
    pub fn split_edge(&mut self, e: EH) -> Option<VH> {
        if !self.can_edit("split_edge") {
            return None;
        }
        if !self.topol.is_valid_edge(e) || self.topol.is_boundary_edge(e) {
            debug!(edge = %e, "Refusing to split edge");
            return None;
        }
        commit("split_edge", self.split_edge_at_midpoint(e))
    }

    pub(crate) fn split_edge_at_midpoint(&mut self, e: EH) -> Result<VH, Error> {
        let mid = self.try_calc_edge_midpoint(e)?;
        let split = self.topol.split_edge(e)?;
        self.points.set(split.vertex, mid)?;
        Ok(split.vertex)
    }

    /// Collapse the edge `e` into a new vertex at its midpoint. Triangles
    /// incident on the edge degenerate and are removed.
    ///
    /// Collapses that would make the mesh non-manifold are refused.
    pub fn collapse_edge(&mut self, e: EH) -> Option<VH> {
        if !self.can_edit("collapse_edge") {
            return None;
        }
        if !self.topol.check_edge_collapse(e) {
            debug!(edge = %e, "Refusing to collapse edge");
            return None;
        }
        commit("collapse_edge", self.collapse_edge_to(e, None))
    }

    /// Collapse `e` and move the new vertex to `pos`, or the midpoint of the
    /// edge if no position is given. The collapse must already be checked.
    pub(crate) fn collapse_edge_to(&mut self, e: EH, pos: Option<Vec3>) -> Result<VH, Error> {
        let pos = match pos {
            Some(pos) => pos,
            None => self.try_calc_edge_midpoint(e)?,
        };
        let v = self.topol.collapse_edge(e)?;
        self.points.set(v, pos)?;
        Ok(v)
    }

    /// Remove an interior vertex along with all its edges. The faces around
    /// the vertex are merged into a single face, which is returned.
    pub fn erase_vertex(&mut self, v: VH) -> Option<FH> {
        if !self.can_edit("erase_vertex") {
            return None;
        }
        if !self.topol.check_vertex_erase(v) {
            debug!(vertex = %v, "Refusing to erase vertex");
            return None;
        }
        commit("erase_vertex", self.topol.erase_vertex(v))
    }

    /// Remove an interior edge, merging its two faces into one. The merged
    /// face is returned.
    pub fn erase_edge(&mut self, e: EH) -> Option<FH> {
        if !self.can_edit("erase_edge") {
            return None;
        }
        if !self.topol.check_edge_erase(e) {
            debug!(edge = %e, "Refusing to erase edge");
            return None;
        }
        commit("erase_edge", self.topol.erase_edge(e))
    }

    /// Shrink the face `f` into a single new vertex at its centroid.
    pub fn collapse_face(&mut self, f: FH) -> Option<VH> {
        if !self.can_edit("collapse_face") {
            return None;
        }
        if !self.topol.check_face_collapse(f) {
            debug!(face = %f, "Refusing to collapse face");
            return None;
        }
        commit("collapse_face", self.collapse_face_to_centroid(f))
    }

    fn collapse_face_to_centroid(&mut self, f: FH) -> Result<VH, Error> {
        let centroid = self.try_calc_face_centroid(f)?;
        let v = self.topol.collapse_face(f)?;
        self.points.set(v, centroid)?;
        Ok(v)
    }
}
