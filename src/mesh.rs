use std::ops::Range;

use glam::Vec3;

use crate::{
    element::{EH, FH, HH, Handle, VH},
    error::Error,
    iterator,
    property::{EProperty, FProperty, HProperty, VProperty},
    topol::{TopolCache, Topology},
};

/// Polygon mesh with vertex positions in 3D.
///
/// This is the type all the editing operators and whole-mesh algorithms work
/// on. The connectivity lives in a [`Topology`], and the positions of the
/// vertices are stored in a vertex property, so they stay in sync with the
/// vertices when the mesh is edited or compacted.
pub struct PolyMesh {
    pub(crate) topol: Topology,
    pub(crate) cache: TopolCache,
    pub(crate) points: VProperty<Vec3>,
}

impl Default for PolyMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl PolyMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::with_capacity(0, 0, 0)
    }

    /// Create an empty mesh with memory reserved for the given number of
    /// vertices, edges and faces.
    pub fn with_capacity(nverts: usize, nedges: usize, nfaces: usize) -> Self {
        let mut topol = Topology::with_capacity(nverts, nedges, nfaces);
        let points = topol.create_vertex_prop(Vec3::ZERO);
        PolyMesh {
            topol,
            cache: TopolCache::default(),
            points,
        }
    }

    /// Create a mesh from a polygon soup. Each entry of `faces` lists the
    /// indices of the vertices of a face, in counter-clockwise order.
    pub fn from_polygons<F>(points: &[Vec3], faces: &[F]) -> Result<Self, Error>
    where
        F: AsRef<[u32]>,
    {
        let mut mesh = Self::with_capacity(points.len(), points.len() * 3, faces.len());
        mesh.add_vertices(points)?;
        let mut fverts: Vec<VH> = Vec::new();
        for face in faces {
            fverts.clear();
            for &vi in face.as_ref() {
                if vi as usize >= points.len() {
                    return Err(Error::VertexIndexOutOfBounds(vi as usize));
                }
                fverts.push(vi.into());
            }
            mesh.add_face(&fverts)?;
        }
        Ok(mesh)
    }

    pub fn topology(&self) -> &Topology {
        &self.topol
    }

    pub fn num_vertices(&self) -> usize {
        self.topol.num_vertices()
    }

    pub fn num_halfedges(&self) -> usize {
        self.topol.num_halfedges()
    }

    pub fn num_edges(&self) -> usize {
        self.topol.num_edges()
    }

    pub fn num_faces(&self) -> usize {
        self.topol.num_faces()
    }

    /// Iterate over the live vertices of the mesh.
    pub fn vertices(&self) -> impl Iterator<Item = VH> + use<'_> {
        self.topol.vertices()
    }

    /// Iterate over the live halfedges of the mesh.
    pub fn halfedges(&self) -> impl Iterator<Item = HH> + use<'_> {
        self.topol.halfedges()
    }

    /// Iterate over the live edges of the mesh.
    pub fn edges(&self) -> impl Iterator<Item = EH> + use<'_> {
        self.topol.edges()
    }

    /// Iterate over the live faces of the mesh.
    pub fn faces(&self) -> impl Iterator<Item = FH> + use<'_> {
        self.topol.faces()
    }

    pub fn is_deleted_vertex(&self, v: VH) -> bool {
        self.topol.is_deleted_vertex(v)
    }

    pub fn is_deleted_halfedge(&self, h: HH) -> bool {
        self.topol.is_deleted_halfedge(h)
    }

    pub fn is_deleted_edge(&self, e: EH) -> bool {
        self.topol.is_deleted_edge(e)
    }

    pub fn is_deleted_face(&self, f: FH) -> bool {
        self.topol.is_deleted_face(f)
    }

    pub fn is_boundary_vertex(&self, v: VH) -> bool {
        self.topol.is_boundary_vertex(v)
    }

    pub fn is_boundary_halfedge(&self, h: HH) -> bool {
        self.topol.is_boundary_halfedge(h)
    }

    pub fn is_boundary_edge(&self, e: EH) -> bool {
        self.topol.is_boundary_edge(e)
    }

    pub fn vertex_valence(&self, v: VH) -> usize {
        self.topol.vertex_valence(v)
    }

    pub fn face_valence(&self, f: FH) -> usize {
        self.topol.face_valence(f)
    }

    /// Find the halfedge pointing from `from` to `to`, if one exists.
    pub fn find_halfedge(&self, from: VH, to: VH) -> Option<HH> {
        self.topol.find_halfedge(from, to)
    }

    pub fn create_vertex_prop<T: Clone + Copy + 'static>(&mut self, default: T) -> VProperty<T> {
        self.topol.create_vertex_prop(default)
    }

    pub fn create_halfedge_prop<T: Clone + Copy + 'static>(&mut self, default: T) -> HProperty<T> {
        self.topol.create_halfedge_prop(default)
    }

    pub fn create_edge_prop<T: Clone + Copy + 'static>(&mut self, default: T) -> EProperty<T> {
        self.topol.create_edge_prop(default)
    }

    pub fn create_face_prop<T: Clone + Copy + 'static>(&mut self, default: T) -> FProperty<T> {
        self.topol.create_face_prop(default)
    }

    /// Get the vertex positions. The returned property shares its buffer with
    /// the mesh.
    pub fn points(&self) -> VProperty<Vec3> {
        self.points.clone()
    }

    /// Position of a single vertex.
    pub fn point(&self, v: VH) -> Result<Vec3, Error> {
        self.points.get_cloned(v)
    }

    pub fn set_point(&mut self, v: VH, pos: Vec3) -> Result<(), Error> {
        self.points.set(v, pos)
    }

    pub fn add_vertex(&mut self, pos: Vec3) -> Result<VH, Error> {
        let v = self.topol.add_vertex()?;
        self.points.set(v, pos)?;
        Ok(v)
    }

    /// Add all `pos` as new vertices, and return the range of their indices.
    pub fn add_vertices(&mut self, pos: &[Vec3]) -> Result<Range<u32>, Error> {
        let start = self.topol.num_vertex_slots() as u32;
        for _ in 0..pos.len() {
            self.topol.add_vertex()?;
        }
        let end = self.topol.num_vertex_slots() as u32;
        let mut points = self.points.try_borrow_mut()?;
        let dst: &mut [Vec3] = &mut points;
        dst[(start as usize)..(end as usize)].copy_from_slice(pos);
        Ok(start..end)
    }

    /// Add a face with the given vertices, in counter-clockwise order.
    pub fn add_face(&mut self, verts: &[VH]) -> Result<FH, Error> {
        self.topol.add_face(verts, &mut self.cache)
    }

    pub fn add_tri_face(&mut self, v0: VH, v1: VH, v2: VH) -> Result<FH, Error> {
        self.add_face(&[v0, v1, v2])
    }

    pub fn add_quad_face(&mut self, v0: VH, v1: VH, v2: VH, v3: VH) -> Result<FH, Error> {
        self.add_face(&[v0, v1, v2, v3])
    }

    /// Remove the deleted elements from the mesh, and compact all properties.
    /// Handles obtained before calling this are no longer valid.
    pub fn garbage_collection(&mut self) -> Result<(), Error> {
        self.topol.garbage_collection()
    }

    /// Vector from the tail to the head of `h`.
    pub fn calc_halfedge_vector(&self, h: HH, points: &[Vec3]) -> Vec3 {
        points[self.topol.to_vertex(h).index() as usize]
            - points[self.topol.from_vertex(h).index() as usize]
    }

    /// Unnormalized normal of the face from Newell's method. The length of
    /// this vector is twice the area of the face.
    pub(crate) fn calc_face_area_vector(&self, f: FH, points: &[Vec3]) -> Vec3 {
        iterator::fh_ccw_iter(&self.topol, f).fold(Vec3::ZERO, |n, h| {
            let pc = points[self.topol.from_vertex(h).index() as usize];
            let pn = points[self.topol.to_vertex(h).index() as usize];
            let (a, b) = (pc - pn, pc + pn);
            n + Vec3::new(a.y * b.z, a.z * b.x, a.x * b.y)
        })
    }

    /// Compute the face normal using Newell's method. The `points` must
    /// represent the positions of the vertices.
    ///
    /// Degenerate faces get a zero normal.
    pub fn calc_face_normal(&self, f: FH, points: &[Vec3]) -> Vec3 {
        self.calc_face_area_vector(f, points).normalize_or_zero()
    }

    /// This is similar to `calc_face_normal`, except this function attempts to
    /// borrow the necessary properties and return an error if borrowing fails.
    pub fn try_calc_face_normal(&self, f: FH) -> Result<Vec3, Error> {
        let points = self.points.try_borrow()?;
        Ok(self.calc_face_normal(f, &points))
    }

    /// Compute the centroid of a face as the average position of the incident
    /// vertices.
    pub fn calc_face_centroid(&self, f: FH, points: &[Vec3]) -> Vec3 {
        let (count, total) = iterator::fv_ccw_iter(&self.topol, f)
            .fold((0usize, Vec3::ZERO), |(count, total), v| {
                (count + 1, total + points[v.index() as usize])
            });
        total / count.max(1) as f32
    }

    pub fn try_calc_face_centroid(&self, f: FH) -> Result<Vec3, Error> {
        let points = self.points.try_borrow()?;
        Ok(self.calc_face_centroid(f, &points))
    }

    /// Area weighted vertex normal.
    pub fn calc_vertex_normal(&self, v: VH, points: &[Vec3]) -> Vec3 {
        iterator::vf_ccw_iter(&self.topol, v)
            .fold(Vec3::ZERO, |n, f| n + self.calc_face_area_vector(f, points))
            .normalize_or_zero()
    }

    pub fn try_calc_vertex_normal(&self, v: VH) -> Result<Vec3, Error> {
        let points = self.points.try_borrow()?;
        Ok(self.calc_vertex_normal(v, &points))
    }

    /// Compute the length of a mesh edge. `points` must be the positions of
    /// the vertices.
    pub fn calc_edge_length(&self, e: EH, points: &[Vec3]) -> f32 {
        self.calc_halfedge_vector(e.halfedge(false), points).length()
    }

    /// Similar to `calc_edge_length`, except this function tries to borrow the
    /// required properties, and returns an error when borrowing fails.
    ///
    /// ```rust
    /// use meshedit::PolyMesh;
    ///
    /// let qbox = PolyMesh::unit_box().expect("Cannot create a box primitive");
    /// // All edges of a unit cube must be of length 1.
    /// for e in qbox.edges() {
    ///     assert_eq!(
    ///         1.0,
    ///         qbox.try_calc_edge_length(e)
    ///             .expect("Cannot compute edge length")
    ///     );
    /// }
    /// ```
    pub fn try_calc_edge_length(&self, e: EH) -> Result<f32, Error> {
        let points = self.points.try_borrow()?;
        Ok(self.calc_edge_length(e, &points))
    }

    pub fn calc_edge_midpoint(&self, e: EH, points: &[Vec3]) -> Vec3 {
        let h = e.halfedge(false);
        (points[self.topol.to_vertex(h).index() as usize]
            + points[self.topol.from_vertex(h).index() as usize])
            * 0.5
    }

    pub fn try_calc_edge_midpoint(&self, e: EH) -> Result<Vec3, Error> {
        let points = self.points.try_borrow()?;
        Ok(self.calc_edge_midpoint(e, &points))
    }

    /// Mean length of all live edges. Zero for a mesh without edges.
    pub fn calc_mean_edge_length(&self, points: &[Vec3]) -> f32 {
        let (count, total) = self.edges().fold((0usize, 0.0f32), |(count, total), e| {
            (count + 1, total + self.calc_edge_length(e, points))
        });
        if count == 0 { 0.0 } else { total / count as f32 }
    }

    /// Compute the total area of this mesh.
    pub fn calc_area(&self, points: &[Vec3]) -> f32 {
        self.faces()
            .map(|f| self.calc_face_area_vector(f, points).length() * 0.5)
            .sum()
    }

    pub fn try_calc_area(&self) -> Result<f32, Error> {
        let points = self.points.try_borrow()?;
        Ok(self.calc_area(&points))
    }
}

#[cfg(test)]
mod test {
    use glam::vec3;

    use crate::{Error, PolyMesh, iterator::HasIterators, macros::assert_f32_eq};

    #[test]
    fn t_from_polygons() {
        let mesh = PolyMesh::from_polygons(
            &[
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 0.0, 0.0),
                vec3(1.0, 1.0, 0.0),
                vec3(0.0, 1.0, 0.0),
            ],
            &[[0u32, 1, 2], [0, 2, 3]],
        )
        .expect("Cannot create mesh");
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_edges(), 5);
        assert_eq!(mesh.num_faces(), 2);
        mesh.check_topology().expect("Topological errors found");
        for f in mesh.faces() {
            let n = mesh.try_calc_face_normal(f).expect("Cannot compute normal");
            assert_f32_eq!(n.z, 1.0);
        }
        assert_f32_eq!(mesh.try_calc_area().expect("Cannot compute area"), 1.0);
    }

    #[test]
    fn t_from_polygons_bad_index() {
        assert!(PolyMesh::from_polygons(&[glam::Vec3::ZERO; 3], &[[0u32, 1, 3]]).is_err());
    }

    #[test]
    fn t_face_centroid() {
        let qbox = PolyMesh::unit_box().expect("Cannot create box");
        let points = qbox.points();
        let points = points.try_borrow().expect("Cannot borrow points");
        for f in qbox.faces() {
            let c = qbox.calc_face_centroid(f, &points);
            let n = qbox.calc_face_normal(f, &points);
            // The centroid of each face is half a unit away from the center,
            // along the outward normal.
            assert!((c - vec3(0.5, 0.5, 0.5)).abs_diff_eq(n * 0.5, 1e-6));
            assert_eq!(qbox.fv_ccw_iter(f).count(), 4);
        }
    }

    #[test]
    fn t_set_point() {
        let mut mesh = PolyMesh::tetrahedron(1.0).expect("Cannot create tetrahedron");
        let v = 1u32.into();
        mesh.set_point(v, vec3(1.0, 2.0, 3.0))
            .expect("Cannot set point");
        assert_eq!(
            mesh.point(v).expect("Cannot read point"),
            vec3(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn t_add_vertices() {
        let mut mesh = PolyMesh::tetrahedron(1.0).expect("Cannot create tetrahedron");
        let pos = [vec3(1.0, 0.0, 0.0), vec3(0.0, 2.0, 0.0), vec3(0.0, 0.0, 3.0)];
        let range = mesh.add_vertices(&pos).expect("Cannot add vertices");
        assert_eq!(4..7, range);
        assert_eq!(7, mesh.num_vertices());
        for (i, p) in range.zip(pos) {
            assert_eq!(p, mesh.point(i.into()).expect("Cannot read point"));
        }
    }

    #[test]
    fn t_point_out_of_range() {
        let mut mesh = PolyMesh::tetrahedron(1.0).expect("Cannot create tetrahedron");
        let v = 4u32.into();
        assert!(matches!(
            mesh.point(v),
            Err(Error::PropertyIndexOutOfBounds(4))
        ));
        assert!(matches!(
            mesh.set_point(v, glam::Vec3::ONE),
            Err(Error::PropertyIndexOutOfBounds(4))
        ));
        assert_eq!(4, mesh.num_vertices());
    }
}
