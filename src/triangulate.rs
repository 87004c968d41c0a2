use tracing::debug;

use crate::{element::FH, error::Error, mesh::PolyMesh, topol::Topology};

impl Topology {
    /// Split `f` into a fan of triangles around the tail of its halfedge. The
    /// last triangle of the fan keeps the handle `f`.
    pub(crate) fn triangulate_face(&mut self, f: FH) -> Result<(), Error> {
        let h0 = self.face_halfedge(f);
        let p = self.prev_halfedge(h0);
        let mut h = h0;
        for _ in 3..self.face_valence(f) {
            let cut = self.next_halfedge(self.next_halfedge(h));
            h = self.split_face(p, cut)?.halfedges().0;
        }
        Ok(())
    }
}

impl PolyMesh {
    /// Triangulate a single face. Triangles are left untouched.
    pub fn triangulate_face(&mut self, f: FH) -> Result<(), Error> {
        if !self.topol.is_editable() {
            return Err(Error::BorrowedPropertyAccess);
        }
        if !self.topol.is_valid_face(f) {
            return Err(Error::DeletedFace(f));
        }
        self.topol.triangulate_face(f)
    }

    /// Split every polygon with more than 3 sides into triangles. No vertices
    /// are added.
    ///
    /// ```rust
    /// use meshedit::PolyMesh;
    ///
    /// let mut qbox = PolyMesh::unit_box().expect("Cannot create box");
    /// qbox.triangulate().expect("Cannot triangulate");
    /// assert_eq!(12, qbox.num_faces());
    /// ```
    pub fn triangulate(&mut self) -> Result<(), Error> {
        if !self.topol.is_editable() {
            return Err(Error::BorrowedPropertyAccess);
        }
        let faces: Vec<FH> = self
            .faces()
            .filter(|f| self.face_valence(*f) > 3)
            .collect();
        for &f in &faces {
            self.topol.triangulate_face(f)?;
        }
        debug!(
            polygons = faces.len(),
            triangles = self.num_faces(),
            "Triangulated mesh"
        );
        Ok(())
    }
}
