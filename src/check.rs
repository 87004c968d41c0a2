use crate::{
    element::{HH, Handle},
    error::Error,
    iterator,
    mesh::PolyMesh,
    topol::Topology,
};

fn check_vertices(mesh: &Topology, hvisited: &mut [bool]) -> Result<(), Error> {
    hvisited.fill(false);
    for v in mesh.vertices() {
        if let Some(h) = mesh.vertex_halfedge(v) {
            // Invalid index, or deleted halfedge.
            if (h.edge().index() as usize) >= mesh.num_edge_slots() {
                return Err(Error::InvalidHalfedge(h));
            }
            if mesh.is_deleted_edge(h.edge()) {
                return Err(Error::DeletedEdge(h.edge()));
            }
            // Outgoing halfedge must point back to this vertex.
            if mesh.from_vertex(h) != v {
                return Err(Error::InvalidOutgoingHalfedges(v));
            }
        }
        // Check ccw iterator.
        for h in iterator::voh_ccw_iter(mesh, v) {
            if std::mem::replace(&mut hvisited[h.index() as usize], true)
                || mesh.from_vertex(h) != v
            {
                return Err(Error::InvalidOutgoingHalfedges(v));
            }
        }
        // Check cw iterator.
        for h in iterator::voh_cw_iter(mesh, v) {
            if !std::mem::replace(&mut hvisited[h.index() as usize], false) {
                return Err(Error::InvalidOutgoingHalfedges(v));
            }
        }
        // The outgoing halfedge must be a boundary halfedge, or none of the
        // halfedges are boundary.
        if let Some(h) = mesh.vertex_halfedge(v) {
            if !mesh.is_boundary_halfedge(h)
                && iterator::voh_ccw_iter(mesh, v).any(|h| mesh.is_boundary_halfedge(h))
            {
                return Err(Error::OutgoingHalfedgeNotBoundary(v));
            }
        }
    }
    Ok(())
}

fn check_edges(mesh: &Topology, hflags: &mut [bool]) -> Result<(), Error> {
    for h in mesh.halfedges() {
        // Check if degenerate.
        let head = mesh.to_vertex(h);
        let tail = mesh.from_vertex(h);
        if head == tail {
            return Err(Error::DegenerateHalfedge(h));
        }
        let hedge = mesh.halfedge(h);
        // Check for deleted.
        if mesh.is_deleted_halfedge(hedge.prev) {
            return Err(Error::DeletedHalfedge(hedge.prev));
        }
        if mesh.is_deleted_halfedge(hedge.next) {
            return Err(Error::DeletedHalfedge(hedge.next));
        }
        if mesh.is_deleted_vertex(hedge.vertex) {
            return Err(Error::DeletedVertex(hedge.vertex));
        }
        if let Some(f) = hedge.face {
            if mesh.is_deleted_face(f) {
                return Err(Error::DeletedFace(f));
            }
        }
        // Check connectivity.
        if mesh.next_halfedge(hedge.prev) != h
            || mesh.prev_halfedge(hedge.next) != h
            || head != mesh.from_vertex(hedge.next)
            || tail != mesh.to_vertex(hedge.prev)
        {
            return Err(Error::InvalidHalfedgeLink(h));
        }
        // Halfedge must be found in the circulators around head and tail.
        if !iterator::voh_ccw_iter(mesh, tail).any(|hh| hh == h)
            || !iterator::vih_ccw_iter(mesh, head).any(|hh| hh == h)
        {
            return Err(Error::InvalidHalfedgeVertexLink(h));
        }
    }
    // Check all loops. Each live halfedge must be visited exactly once, and all
    // halfedges of a loop must agree on the face.
    let mut visit = |h: HH, flag: bool| -> Result<(), Error> {
        if hflags[h.index() as usize] == flag {
            return Ok(());
        }
        let f = mesh.halfedge_face(h);
        for h in iterator::loop_ccw_iter(mesh, h) {
            if std::mem::replace(&mut hflags[h.index() as usize], flag) == flag {
                return Err(Error::InvalidLoopTopology(h));
            }
            if mesh.halfedge_face(h) != f {
                return Err(Error::InconsistentFaceInLoop(h));
            }
        }
        Ok(())
    };
    for h in mesh.halfedges() {
        visit(h, true)?;
    }
    for h in mesh.halfedges() {
        visit(h, false)?;
    }
    Ok(())
}

fn check_faces(mesh: &Topology) -> Result<(), Error> {
    for f in mesh.faces() {
        let h = mesh.face_halfedge(f);
        if mesh.is_deleted_halfedge(h) {
            return Err(Error::DeletedHalfedge(h));
        }
        if mesh.halfedge_face(h) != Some(f) {
            return Err(Error::InvalidFaceHalfedgeLink(f, h));
        }
        if mesh.face_valence(f) < 3 {
            return Err(Error::DegenerateFace(f));
        }
    }
    Ok(())
}

impl Topology {
    /// Walk the entire topology and verify the halfedge invariants.
    pub fn check(&self) -> Result<(), Error> {
        // To keep track of visited halfedges.
        let mut hvisited = vec![false; self.num_edge_slots() * 2].into_boxed_slice();
        check_vertices(self, &mut hvisited)?;
        check_edges(self, &mut hvisited)?;
        check_faces(self)?;
        Ok(())
    }
}

impl PolyMesh {
    /// Check the topology of the mesh.
    ///
    /// This function will return an error if any errors are found in the
    /// topology. Deleted elements are ignored, but no live element may refer
    /// to a deleted one.
    pub fn check_topology(&self) -> Result<(), Error> {
        self.topol.check()
    }
}
