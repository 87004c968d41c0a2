mod quadric;
mod queue;

use std::cmp::Ordering;

use glam::Vec3;
use tracing::{debug, trace};

pub use quadric::Quadric;
pub use queue::PQueue;

use crate::{
    edit::commit,
    element::{EH, Handle, VH},
    error::Error,
    iterator,
    mesh::PolyMesh,
    property::{EProperty, VProperty},
};

/// Candidate collapse of an edge, with the position of the merged vertex and
/// the quadric error at that position. Records are ordered by cost, with
/// ties broken by the edge index.
#[derive(Debug, Clone, Copy)]
pub struct EdgeRecord {
    pub edge: EH,
    pub optimal: Vec3,
    pub cost: f64,
}

impl EdgeRecord {
    /// Record for collapsing `e`, with `quadrics` and `points` indexed by
    /// vertex. When the combined quadric is singular, the best of the two
    /// endpoints and the midpoint is used.
    pub fn new(mesh: &PolyMesh, e: EH, quadrics: &[Quadric], points: &[Vec3]) -> Self {
        let h = e.halfedge(false);
        let (a, b) = (mesh.topol.from_vertex(h), mesh.topol.to_vertex(h));
        let q = quadrics[a.index() as usize] + quadrics[b.index() as usize];
        let optimal = q.minimizer().unwrap_or_else(|| {
            let (pa, pb) = (points[a.index() as usize], points[b.index() as usize]);
            [pa, pb, (pa + pb) * 0.5]
                .into_iter()
                .min_by(|x, y| q.residual(*x).total_cmp(&q.residual(*y)))
                .unwrap_or(pa)
        });
        EdgeRecord {
            edge: e,
            optimal,
            cost: q.residual(optimal),
        }
    }
}

impl PartialEq for EdgeRecord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EdgeRecord {}

impl PartialOrd for EdgeRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EdgeRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.edge.cmp(&other.edge))
    }
}

/// Parameters of [`PolyMesh::simplify_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimplifyConfig {
    /// Fraction of the edges that should remain.
    pub target_ratio: f64,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        SimplifyConfig { target_ratio: 0.75 }
    }
}

impl SimplifyConfig {
    pub fn with_target_ratio(mut self, ratio: f64) -> Self {
        self.target_ratio = ratio;
        self
    }
}

impl PolyMesh {
    /// Simplify the mesh by collapsing edges in the order of their quadric
    /// error, until three quarters of the edges remain.
    ///
    /// Returns `false` without modifying the mesh if it has fewer than three
    /// edges.
    ///
    /// ```rust
    /// use meshedit::PolyMesh;
    ///
    /// let mut mesh = PolyMesh::icosahedron(1.0).expect("Cannot create icosahedron");
    /// assert!(mesh.simplify());
    /// assert!(mesh.num_edges() < 30);
    /// mesh.check_topology().expect("Topological errors found");
    /// ```
    pub fn simplify(&mut self) -> bool {
        self.simplify_with(&SimplifyConfig::default())
    }

    pub fn simplify_with(&mut self, config: &SimplifyConfig) -> bool {
        if !self.can_edit("simplify") {
            return false;
        }
        if self.num_edges() < 3 {
            debug!(edges = self.num_edges(), "Refusing to simplify a mesh with too few edges");
            return false;
        }
        commit("simplify", self.simplify_impl(config)).is_some()
    }

    fn vertex_quadrics(&mut self) -> Result<VProperty<Quadric>, Error> {
        let mut quadrics = self.create_vertex_prop(Quadric::default());
        {
            let points = self.points.try_borrow()?;
            let mut vq = quadrics.try_borrow_mut()?;
            for f in self.topol.faces() {
                let n = self.calc_face_normal(f, &points);
                if n == Vec3::ZERO {
                    continue;
                }
                let p = points[self.topol.from_vertex(self.topol.face_halfedge(f))];
                let q = Quadric::from_plane(p, n);
                for v in iterator::fv_ccw_iter(&self.topol, f) {
                    vq[v] += q;
                }
            }
        }
        Ok(quadrics)
    }

    fn queue_edges(
        &self,
        edges: impl Iterator<Item = EH>,
        quadrics: &[Quadric],
        records: &mut EProperty<Option<EdgeRecord>>,
        queue: &mut PQueue<EdgeRecord>,
    ) -> Result<(), Error> {
        let points = self.points.try_borrow()?;
        let mut records = records.try_borrow_mut()?;
        for e in edges {
            let record = EdgeRecord::new(self, e, quadrics, &points);
            queue.insert(record);
            records[e] = Some(record);
        }
        Ok(())
    }

    /// Number of edges that disappear when `e` collapses, including itself.
    fn edges_removed_by_collapse(&self, e: EH) -> usize {
        let (h, o) = e.halfedges();
        1 + [h, o]
            .into_iter()
            .filter(|h| {
                self.topol
                    .halfedge_face(*h)
                    .is_some_and(|f| self.topol.face_valence(f) == 3)
            })
            .count()
    }

    fn simplify_impl(&mut self, config: &SimplifyConfig) -> Result<(), Error> {
        let nedges = self.num_edges();
        let target = (nedges as f64 * config.target_ratio).floor() as usize;
        let mut quadrics = self.vertex_quadrics()?;
        let mut records = self.create_edge_prop(None::<EdgeRecord>);
        let mut queue = PQueue::new();
        {
            let vq = quadrics.try_borrow()?;
            let edges: Vec<EH> = self.edges().collect();
            self.queue_edges(edges.into_iter(), &vq, &mut records, &mut queue)?;
        }
        let mut ncollapses = 0usize;
        let mut around: Vec<EH> = Vec::new();
        while self.num_edges() > target {
            let Some(record) = queue.pop() else {
                break;
            };
            let e = record.edge;
            records.set(e, None)?;
            if !self.topol.is_valid_edge(e) {
                continue;
            }
            if self.num_edges().saturating_sub(self.edges_removed_by_collapse(e)) < target {
                trace!(edge = %e, "Dropping collapse that undershoots the target");
                continue;
            }
            if !self.topol.check_edge_collapse(e) {
                trace!(edge = %e, cost = record.cost, "Dropping illegal collapse");
                continue;
            }
            let h = e.halfedge(false);
            let (a, b): (VH, VH) = (self.topol.from_vertex(h), self.topol.to_vertex(h));
            let merged = quadrics.get_cloned(a)? + quadrics.get_cloned(b)?;
            around.clear();
            around.extend(
                iterator::ve_ccw_iter(&self.topol, a).chain(iterator::ve_ccw_iter(&self.topol, b)),
            );
            for &x in &around {
                if let Some(old) = records.get_cloned(x)? {
                    queue.remove(&old);
                    records.set(x, None)?;
                }
            }
            let v = self.collapse_edge_to(e, Some(record.optimal))?;
            quadrics.set(v, merged)?;
            ncollapses += 1;
            trace!(edge = %e, vertex = %v, cost = record.cost, "Collapsed edge");
            around.clear();
            around.extend(iterator::ve_ccw_iter(&self.topol, v));
            let vq = quadrics.try_borrow()?;
            self.queue_edges(around.iter().copied(), &vq, &mut records, &mut queue)?;
        }
        debug!(
            before = nedges,
            after = self.num_edges(),
            target,
            ncollapses,
            "Simplified mesh"
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use glam::Vec3;

    use super::{EdgeRecord, PQueue};
    use crate::{
        SimplifyConfig,
        element::{EH, Handle},
        mesh::PolyMesh,
    };

    #[test]
    fn t_edge_record_order() {
        let record = |e: u32, cost: f64| EdgeRecord {
            edge: EH::from(e),
            optimal: Vec3::ZERO,
            cost,
        };
        let mut queue = PQueue::new();
        queue.insert(record(3, 0.5));
        queue.insert(record(1, 0.5));
        queue.insert(record(0, 2.0));
        queue.insert(record(7, 0.0));
        // Same cost and edge, different position.
        assert!(queue.remove(&EdgeRecord {
            optimal: Vec3::ONE,
            ..record(3, 0.5)
        }));
        let order: Vec<u32> = std::iter::from_fn(|| queue.pop())
            .map(|r| r.edge.index())
            .collect();
        assert_eq!(vec![7, 1, 0], order);
    }

    #[test]
    fn t_box_simplify() {
        let mut qbox = PolyMesh::unit_box().expect("Cannot create box");
        assert!(qbox.simplify());
        qbox.check_topology().expect("Topological errors found");
        assert!(qbox.num_edges() >= 9);
        assert!(qbox.num_edges() < 12);
        assert!(qbox.num_vertices() < 8);
    }

    #[test]
    fn t_icosahedron_simplify() {
        let mut mesh = PolyMesh::icosahedron(1.0).expect("Cannot create icosahedron");
        assert!(mesh.simplify());
        mesh.check_topology().expect("Topological errors found");
        assert!(mesh.num_edges() >= 22);
        assert!(mesh.num_edges() < 30);
        assert!(mesh.faces().all(|f| mesh.face_valence(f) == 3));
        // Collapses stay close to the sphere.
        for v in mesh.vertices() {
            let r = mesh.point(v).expect("Cannot read point").length();
            assert!(r > 0.5 && r < 1.5);
        }
        mesh.garbage_collection()
            .expect("Cannot garbage collect");
        mesh.check_topology().expect("Topological errors found");
    }

    #[cfg(feature = "subdiv")]
    #[test]
    fn t_simplify_half() {
        let mut mesh = PolyMesh::icosahedron(1.0).expect("Cannot create icosahedron");
        mesh.loop_subdivide().expect("Cannot subdivide");
        let config = SimplifyConfig::default().with_target_ratio(0.5);
        assert!(mesh.simplify_with(&config));
        mesh.check_topology().expect("Topological errors found");
        assert!(mesh.num_edges() >= 60);
        assert!(mesh.num_edges() < 120);
    }

    #[test]
    fn t_simplify_refuses_empty() {
        let mut mesh = PolyMesh::new();
        assert!(!mesh.simplify());
    }

    #[test]
    fn t_edges_removed_per_collapse() {
        for mut mesh in [
            PolyMesh::unit_box().expect("Cannot create box"),
            PolyMesh::icosahedron(1.0).expect("Cannot create icosahedron"),
        ] {
            let mut ncollapses = 0;
            while ncollapses < 2 {
                let Some(e) = mesh.edges().find(|e| mesh.topol.check_edge_collapse(*e)) else {
                    break;
                };
                let before = mesh.num_edges();
                let expected = mesh.edges_removed_by_collapse(e);
                mesh.collapse_edge(e).expect("Cannot collapse edge");
                mesh.check_topology().expect("Topological errors found");
                assert_eq!(before - expected, mesh.num_edges());
                ncollapses += 1;
            }
            assert_eq!(2, ncollapses);
        }
    }

    #[test]
    fn t_simplify_exact_target() {
        // Every collapse on a closed triangle mesh removes three edges.
        let mut mesh = PolyMesh::icosahedron(1.0).expect("Cannot create icosahedron");
        assert!(mesh.simplify_with(&SimplifyConfig::default().with_target_ratio(0.9)));
        mesh.check_topology().expect("Topological errors found");
        assert_eq!(27, mesh.num_edges());
        assert_eq!(11, mesh.num_vertices());
        let mut mesh = PolyMesh::icosahedron(1.0).expect("Cannot create icosahedron");
        assert!(mesh.simplify_with(&SimplifyConfig::default().with_target_ratio(0.8)));
        assert_eq!(24, mesh.num_edges());
    }

    #[test]
    fn t_simplify_never_undershoots() {
        // A single collapse would take 30 edges to 27, below the target of 28.
        let mut mesh = PolyMesh::icosahedron(1.0).expect("Cannot create icosahedron");
        assert!(mesh.simplify_with(&SimplifyConfig::default().with_target_ratio(0.95)));
        assert_eq!((12, 30, 20), (mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()));
    }
}

