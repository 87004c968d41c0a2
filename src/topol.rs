use crate::{
    element::{EH, Edge, FH, Face, HH, Halfedge, Handle, VH, Vertex},
    error::Error,
    iterator,
    property::{EProperty, FProperty, HProperty, PropertyContainer, VProperty},
    status::Status,
};

/// Scratch buffers reused across calls to [`Topology::add_face`].
#[derive(Default)]
pub(crate) struct TopolCache {
    loop_halfedges: Vec<Option<HH>>,
    needs_adjust: Vec<bool>,
    links: Vec<(HH, HH)>,
}

impl TopolCache {
    fn clear(&mut self) {
        self.loop_halfedges.clear();
        self.needs_adjust.clear();
        self.links.clear();
    }
}

/// Index based halfedge arena.
///
/// Elements are never moved while the mesh is being edited. Removing an
/// element only marks it deleted, so handles held by the caller remain stable
/// until [`Topology::garbage_collection`] compacts the arena.
pub struct Topology {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    faces: Vec<Face>,
    vstatus: Vec<Status>,
    estatus: Vec<Status>,
    fstatus: Vec<Status>,
    ndeleted_vertices: usize,
    ndeleted_edges: usize,
    ndeleted_faces: usize,
    vprops: PropertyContainer<VH>,
    hprops: PropertyContainer<HH>,
    eprops: PropertyContainer<EH>,
    fprops: PropertyContainer<FH>,
}

impl Topology {
    pub fn new() -> Self {
        Self::with_capacity(0, 0, 0)
    }

    pub fn with_capacity(nverts: usize, nedges: usize, nfaces: usize) -> Self {
        Topology {
            vertices: Vec::with_capacity(nverts),
            edges: Vec::with_capacity(nedges),
            faces: Vec::with_capacity(nfaces),
            vstatus: Vec::with_capacity(nverts),
            estatus: Vec::with_capacity(nedges),
            fstatus: Vec::with_capacity(nfaces),
            ndeleted_vertices: 0,
            ndeleted_edges: 0,
            ndeleted_faces: 0,
            vprops: PropertyContainer::new(),
            hprops: PropertyContainer::new(),
            eprops: PropertyContainer::new(),
            fprops: PropertyContainer::new(),
        }
    }

    pub fn create_vertex_prop<T: Clone + Copy + 'static>(&mut self, default: T) -> VProperty<T> {
        VProperty::<T>::new(&mut self.vprops, default)
    }

    pub fn create_halfedge_prop<T: Clone + Copy + 'static>(&mut self, default: T) -> HProperty<T> {
        HProperty::<T>::new(&mut self.hprops, default)
    }

    pub fn create_edge_prop<T: Clone + Copy + 'static>(&mut self, default: T) -> EProperty<T> {
        EProperty::<T>::new(&mut self.eprops, default)
    }

    pub fn create_face_prop<T: Clone + Copy + 'static>(&mut self, default: T) -> FProperty<T> {
        FProperty::<T>::new(&mut self.fprops, default)
    }

    /// Edits grow every property registered with this topology. That is only
    /// possible when none of them is borrowed.
    pub(crate) fn is_editable(&self) -> bool {
        !(self.vprops.is_borrowed()
            || self.hprops.is_borrowed()
            || self.eprops.is_borrowed()
            || self.fprops.is_borrowed())
    }

    fn vertex(&self, v: VH) -> &Vertex {
        &self.vertices[v.index() as usize]
    }

    fn vertex_mut(&mut self, v: VH) -> &mut Vertex {
        &mut self.vertices[v.index() as usize]
    }

    pub(crate) fn halfedge(&self, h: HH) -> &Halfedge {
        &self.edges[(h.index() >> 1) as usize].halfedges[(h.index() & 1) as usize]
    }

    fn halfedge_mut(&mut self, h: HH) -> &mut Halfedge {
        &mut self.edges[(h.index() >> 1) as usize].halfedges[(h.index() & 1) as usize]
    }

    fn face_mut(&mut self, f: FH) -> &mut Face {
        &mut self.faces[f.index() as usize]
    }

    pub fn vertex_halfedge(&self, v: VH) -> Option<HH> {
        self.vertex(v).halfedge
    }

    pub fn to_vertex(&self, h: HH) -> VH {
        self.halfedge(h).vertex
    }

    pub fn from_vertex(&self, h: HH) -> VH {
        self.halfedge(h.opposite()).vertex
    }

    pub fn prev_halfedge(&self, h: HH) -> HH {
        self.halfedge(h).prev
    }

    pub fn next_halfedge(&self, h: HH) -> HH {
        self.halfedge(h).next
    }

    pub fn halfedge_face(&self, h: HH) -> Option<FH> {
        self.halfedge(h).face
    }

    pub fn face_halfedge(&self, f: FH) -> HH {
        self.faces[f.index() as usize].halfedge
    }

    pub fn is_boundary_halfedge(&self, h: HH) -> bool {
        self.halfedge(h).face.is_none()
    }

    pub fn is_boundary_edge(&self, e: EH) -> bool {
        let (h, oh) = e.halfedges();
        self.is_boundary_halfedge(h) || self.is_boundary_halfedge(oh)
    }

    pub fn is_boundary_vertex(&self, v: VH) -> bool {
        match self.vertex(v).halfedge {
            Some(h) => self.is_boundary_halfedge(h),
            None => true,
        }
    }

    pub fn is_deleted_vertex(&self, v: VH) -> bool {
        self.vstatus[v.index() as usize].deleted()
    }

    pub fn is_deleted_edge(&self, e: EH) -> bool {
        self.estatus[e.index() as usize].deleted()
    }

    pub fn is_deleted_halfedge(&self, h: HH) -> bool {
        self.is_deleted_edge(h.edge())
    }

    pub fn is_deleted_face(&self, f: FH) -> bool {
        self.fstatus[f.index() as usize].deleted()
    }

    pub fn is_valid_vertex(&self, v: VH) -> bool {
        (v.index() as usize) < self.vertices.len() && !self.is_deleted_vertex(v)
    }

    pub fn is_valid_edge(&self, e: EH) -> bool {
        (e.index() as usize) < self.edges.len() && !self.is_deleted_edge(e)
    }

    pub fn is_valid_halfedge(&self, h: HH) -> bool {
        self.is_valid_edge(h.edge())
    }

    pub fn is_valid_face(&self, f: FH) -> bool {
        (f.index() as usize) < self.faces.len() && !self.is_deleted_face(f)
    }

    /// Number of live vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() - self.ndeleted_vertices
    }

    /// Number of live edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len() - self.ndeleted_edges
    }

    /// Number of live halfedges.
    pub fn num_halfedges(&self) -> usize {
        self.num_edges() * 2
    }

    /// Number of live faces.
    pub fn num_faces(&self) -> usize {
        self.faces.len() - self.ndeleted_faces
    }

    /// Number of vertex slots in the arena, including deleted ones. Every
    /// vertex handle indexes below this.
    pub fn num_vertex_slots(&self) -> usize {
        self.vertices.len()
    }

    /// Number of edge slots in the arena, including deleted ones.
    pub fn num_edge_slots(&self) -> usize {
        self.edges.len()
    }

    /// Number of face slots in the arena, including deleted ones.
    pub fn num_face_slots(&self) -> usize {
        self.faces.len()
    }

    /// True if some elements are deleted and waiting for garbage collection.
    pub fn has_deleted(&self) -> bool {
        self.ndeleted_vertices + self.ndeleted_edges + self.ndeleted_faces > 0
    }

    pub fn vertices(&self) -> impl Iterator<Item = VH> + use<'_> {
        (0..(self.vertices.len() as u32))
            .map(VH::from)
            .filter(|v| !self.is_deleted_vertex(*v))
    }

    pub fn halfedges(&self) -> impl Iterator<Item = HH> + use<'_> {
        self.edges().flat_map(|e| {
            let (h, oh) = e.halfedges();
            [h, oh]
        })
    }

    pub fn edges(&self) -> impl Iterator<Item = EH> + use<'_> {
        (0..(self.edges.len() as u32))
            .map(EH::from)
            .filter(|e| !self.is_deleted_edge(*e))
    }

    pub fn faces(&self) -> impl Iterator<Item = FH> + use<'_> {
        (0..(self.faces.len() as u32))
            .map(FH::from)
            .filter(|f| !self.is_deleted_face(*f))
    }

    pub fn find_halfedge(&self, from: VH, to: VH) -> Option<HH> {
        iterator::voh_ccw_iter(self, from).find(|h| self.to_vertex(*h) == to)
    }

    /// A vertex is manifold when its fan has at most one gap. The outgoing
    /// halfedge is kept on the boundary, so only the first halfedge of the fan
    /// may be a boundary halfedge.
    pub fn is_manifold_vertex(&self, v: VH) -> bool {
        iterator::voh_ccw_iter(self, v)
            .skip(1)
            .all(|h| !self.is_boundary_halfedge(h))
    }

    /// Make the outgoing halfedge of `v` a boundary halfedge, if it has one.
    pub(crate) fn adjust_outgoing_halfedge(&mut self, v: VH) {
        let h = iterator::voh_ccw_iter(self, v).find(|h| self.is_boundary_halfedge(*h));
        if let Some(h) = h {
            self.set_vertex_halfedge(v, h)
        }
    }

    pub fn add_vertex(&mut self) -> Result<VH, Error> {
        let vi = self.vertices.len() as u32;
        self.vprops.push_value()?;
        self.vertices.push(Vertex { halfedge: None });
        self.vstatus.push(Status::default());
        Ok(vi.into())
    }

    /// Create a new edge from `from` to `to`. The first halfedge of the new
    /// edge points to `to`, and is linked between `prev` and `next`. The
    /// opposite halfedge is linked between `opp_prev` and `opp_next`. Only the
    /// new halfedges are written, the neighbours are left for the caller to
    /// link.
    pub(crate) fn new_edge(
        &mut self,
        from: VH,
        to: VH,
        prev: HH,
        next: HH,
        opp_prev: HH,
        opp_next: HH,
    ) -> Result<EH, Error> {
        let ei = self.edges.len() as u32;
        self.eprops.push_value()?;
        for _ in 0..2 {
            self.hprops.push_value()?;
        }
        self.edges.push(Edge {
            halfedges: [
                Halfedge {
                    face: None,
                    vertex: to,
                    next,
                    prev,
                },
                Halfedge {
                    face: None,
                    vertex: from,
                    next: opp_next,
                    prev: opp_prev,
                },
            ],
        });
        self.estatus.push(Status::default());
        Ok(ei.into())
    }

    pub(crate) fn new_face(&mut self, halfedge: HH) -> Result<FH, Error> {
        let fi = self.faces.len() as u32;
        self.fprops.push_value()?;
        self.faces.push(Face { halfedge });
        self.fstatus.push(Status::default());
        Ok(fi.into())
    }

    pub(crate) fn set_vertex_halfedge(&mut self, v: VH, h: HH) {
        self.vertex_mut(v).halfedge = Some(h);
    }

    pub(crate) fn clear_vertex_halfedge(&mut self, v: VH) {
        self.vertex_mut(v).halfedge = None;
    }

    pub(crate) fn set_halfedge_vertex(&mut self, h: HH, v: VH) {
        self.halfedge_mut(h).vertex = v;
    }

    pub(crate) fn set_halfedge_face(&mut self, h: HH, f: Option<FH>) {
        self.halfedge_mut(h).face = f;
    }

    pub(crate) fn set_face_halfedge(&mut self, f: FH, h: HH) {
        self.face_mut(f).halfedge = h;
    }

    /// Make `next` follow `prev` in their loop.
    pub(crate) fn link_halfedges(&mut self, prev: HH, next: HH) {
        self.halfedge_mut(prev).next = next;
        self.halfedge_mut(next).prev = prev;
    }

    pub(crate) fn delete_vertex(&mut self, v: VH) {
        let status = &mut self.vstatus[v.index() as usize];
        if !status.deleted() {
            status.set_deleted(true);
            self.ndeleted_vertices += 1;
        }
    }

    pub(crate) fn delete_edge(&mut self, e: EH) {
        let status = &mut self.estatus[e.index() as usize];
        if !status.deleted() {
            status.set_deleted(true);
            self.ndeleted_edges += 1;
        }
    }

    pub(crate) fn delete_face(&mut self, f: FH) {
        let status = &mut self.fstatus[f.index() as usize];
        if !status.deleted() {
            status.set_deleted(true);
            self.ndeleted_faces += 1;
        }
    }

    /// Split the face containing `h0` and `h1` with a new edge running from
    /// the head of `h0` to the tail of `h1`.
    ///
    /// The halfedges strictly between `h0` and `h1` are moved to a new face
    /// together with the opposite of the new edge. The original face keeps
    /// `h0` and `h1`. Both halfedges must belong to the same face, and must not
    /// be adjacent.
    /// ```text
    ///          pn ---> ... ---> pp
    ///          ^                 |
    ///          |    new face     |
    ///          |                 v
    ///    --h0->u <---- new ----- w --h1->
    ///                old face
    /// ```
    pub(crate) fn split_face(&mut self, h0: HH, h1: HH) -> Result<EH, Error> {
        let f = self.halfedge_face(h0);
        debug_assert!(f.is_some() && f == self.halfedge_face(h1));
        debug_assert!(self.next_halfedge(h0) != h1 && h0 != h1);
        let u = self.to_vertex(h0);
        let w = self.from_vertex(h1);
        let pn = self.next_halfedge(h0);
        let pp = self.prev_halfedge(h1);
        let e = self.new_edge(u, w, h0, h1, pp, pn)?;
        let (y, x) = e.halfedges();
        let fnew = self.new_face(x)?;
        self.link_halfedges(h0, y);
        self.link_halfedges(y, h1);
        self.link_halfedges(pp, x);
        self.link_halfedges(x, pn);
        self.halfedge_mut(y).face = f;
        if let Some(f) = f {
            self.face_mut(f).halfedge = y;
        }
        let mut h = x;
        loop {
            self.halfedge_mut(h).face = Some(fnew);
            h = self.next_halfedge(h);
            if h == x {
                break;
            }
        }
        Ok(e)
    }

    /// Add a face bounded by `verts`, in counter-clockwise order.
    ///
    /// Existing edges between consecutive vertices are reused, and must still
    /// be free on the side of the new face. Missing edges are created. If a
    /// vertex has several boundary gaps, the patches around it are reordered
    /// so the new face can close one of them. The topology is untouched when
    /// an error is returned.
    pub(crate) fn add_face(&mut self, verts: &[VH], cache: &mut TopolCache) -> Result<FH, Error> {
        let n = verts.len();
        if n < 3 {
            return Err(Error::InvalidFaceDegree(n));
        }
        if let Some(v) = verts.iter().find(|v| !self.is_valid_vertex(**v)) {
            return Err(Error::VertexIndexOutOfBounds(v.index() as usize));
        }
        if !self.is_editable() {
            return Err(Error::BorrowedPropertyAccess);
        }
        cache.clear();
        for i in 0..n {
            if !self.is_boundary_vertex(verts[i]) {
                return Err(Error::ComplexVertex(verts[i]));
            }
            let h = self.find_halfedge(verts[i], verts[(i + 1) % n]);
            if let Some(h) = h {
                if !self.is_boundary_halfedge(h) {
                    return Err(Error::ComplexHalfedge(h));
                }
            }
            cache.loop_halfedges.push(h);
            cache.needs_adjust.push(false);
        }
        // Two existing consecutive edges that are not linked yet. The patch
        // between them is moved into another gap around their shared vertex.
        for i in 0..n {
            let (Some(prev), Some(next)) =
                (cache.loop_halfedges[i], cache.loop_halfedges[(i + 1) % n])
            else {
                continue;
            };
            if self.next_halfedge(prev) == next {
                continue;
            }
            let mut bprev = next.opposite();
            loop {
                bprev = self.next_halfedge(bprev).opposite();
                if self.is_boundary_halfedge(bprev) {
                    break;
                }
            }
            if bprev == prev {
                return Err(Error::PatchRelinkingFailed);
            }
            let bnext = self.next_halfedge(bprev);
            cache.links.extend_from_slice(&[
                (bprev, self.next_halfedge(prev)),
                (self.prev_halfedge(next), bnext),
                (prev, next),
            ]);
        }
        // Nothing can fail past this point.
        let mut created: Vec<bool> = Vec::with_capacity(n);
        for i in 0..n {
            let missing = cache.loop_halfedges[i].is_none();
            if missing {
                let h: HH = ((self.edges.len() as u32) << 1).into();
                let o = h.opposite();
                self.new_edge(verts[i], verts[(i + 1) % n], h, h, o, o)?;
                cache.loop_halfedges[i] = Some(h);
            }
            created.push(missing);
        }
        let hs: Vec<HH> = cache.loop_halfedges.iter().flatten().copied().collect();
        for i in 0..n {
            let j = (i + 1) % n;
            let v = verts[j];
            let (inner_prev, inner_next) = (hs[i], hs[j]);
            let (outer_prev, outer_next) = (inner_next.opposite(), inner_prev.opposite());
            match (created[i], created[j]) {
                (false, false) => {
                    cache.needs_adjust[j] = self.vertex_halfedge(v) == Some(inner_next);
                    continue;
                }
                (true, false) => {
                    let bprev = self.prev_halfedge(inner_next);
                    cache.links.push((bprev, outer_next));
                    self.set_vertex_halfedge(v, outer_next);
                }
                (false, true) => {
                    let bnext = self.next_halfedge(inner_prev);
                    cache.links.push((outer_prev, bnext));
                    self.set_vertex_halfedge(v, bnext);
                }
                (true, true) => match self.vertex_halfedge(v) {
                    Some(bnext) => {
                        let bprev = self.prev_halfedge(bnext);
                        cache
                            .links
                            .extend_from_slice(&[(bprev, outer_next), (outer_prev, bnext)]);
                    }
                    None => {
                        self.set_vertex_halfedge(v, outer_next);
                        cache.links.push((outer_prev, outer_next));
                    }
                },
            }
            cache.links.push((inner_prev, inner_next));
        }
        let f = self.new_face(hs[n - 1])?;
        for &h in &hs {
            self.halfedge_mut(h).face = Some(f);
        }
        for (prev, next) in cache.links.drain(..) {
            self.link_halfedges(prev, next);
        }
        for i in 0..n {
            if cache.needs_adjust[i] {
                self.adjust_outgoing_halfedge(verts[i]);
            }
        }
        Ok(f)
    }

    pub fn vertex_valence(&self, v: VH) -> usize {
        iterator::voh_ccw_iter(self, v).count()
    }

    pub fn face_valence(&self, f: FH) -> usize {
        iterator::fh_ccw_iter(self, f).count()
    }

    /// Physically remove all deleted elements, and compact the arena along
    /// with every property defined on it.
    ///
    /// Surviving elements keep their relative order, but their indices
    /// change. All handles obtained before this call are invalidated.
    pub fn garbage_collection(&mut self) -> Result<(), Error> {
        if !self.is_editable() {
            return Err(Error::BorrowedPropertyAccess);
        }
        self.vprops.garbage_collection();
        self.hprops.garbage_collection();
        self.eprops.garbage_collection();
        self.fprops.garbage_collection();
        if !self.has_deleted() {
            return Ok(());
        }
        let vkeep: Vec<bool> = self.vstatus.iter().map(|s| !s.deleted()).collect();
        let ekeep: Vec<bool> = self.estatus.iter().map(|s| !s.deleted()).collect();
        let fkeep: Vec<bool> = self.fstatus.iter().map(|s| !s.deleted()).collect();
        let hkeep: Vec<bool> = ekeep.iter().flat_map(|k| [*k, *k]).collect();
        fn index_map(keep: &[bool]) -> Vec<u32> {
            let mut next = 0u32;
            keep.iter()
                .map(|k| {
                    if *k {
                        next += 1;
                        next - 1
                    } else {
                        u32::MAX
                    }
                })
                .collect()
        }
        let vmap = index_map(&vkeep);
        let emap = index_map(&ekeep);
        let fmap = index_map(&fkeep);
        let hmap = |h: HH| -> HH { ((emap[(h.index() >> 1) as usize] << 1) | (h.index() & 1)).into() };
        // Properties first, they are the only part that can fail.
        self.vprops.compact(&vkeep)?;
        self.hprops.compact(&hkeep)?;
        self.eprops.compact(&ekeep)?;
        self.fprops.compact(&fkeep)?;
        self.vertices = self
            .vertices
            .iter()
            .zip(vkeep.iter())
            .filter(|(_, keep)| **keep)
            .map(|(v, _)| Vertex {
                halfedge: v.halfedge.filter(|h| ekeep[h.edge().index() as usize]).map(hmap),
            })
            .collect();
        self.edges = self
            .edges
            .iter()
            .zip(ekeep.iter())
            .filter(|(_, keep)| **keep)
            .map(|(e, _)| Edge {
                halfedges: e.halfedges.map(|h| Halfedge {
                    face: h.face.map(|f| fmap[f.index() as usize].into()),
                    vertex: vmap[h.vertex.index() as usize].into(),
                    next: hmap(h.next),
                    prev: hmap(h.prev),
                }),
            })
            .collect();
        self.faces = self
            .faces
            .iter()
            .zip(fkeep.iter())
            .filter(|(_, keep)| **keep)
            .map(|(f, _)| Face {
                halfedge: hmap(f.halfedge),
            })
            .collect();
        self.vstatus = vec![Status::default(); self.vertices.len()];
        self.estatus = vec![Status::default(); self.edges.len()];
        self.fstatus = vec![Status::default(); self.faces.len()];
        self.ndeleted_vertices = 0;
        self.ndeleted_edges = 0;
        self.ndeleted_faces = 0;
        Ok(())
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}
