use glam::Vec3;
use tracing::{debug, trace};

use crate::{
    edit::commit,
    element::{EH, Handle, VH},
    error::Error,
    iterator,
    mesh::PolyMesh,
    topol::Topology,
};

/// Parameters of [`PolyMesh::isotropic_remesh_with`]. The thresholds are
/// relative to the mean edge length of the input mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RemeshConfig {
    /// Number of split, collapse, flip and smoothing passes.
    pub iterations: usize,
    /// Edges longer than this multiple of the target length are split.
    pub split_ratio: f32,
    /// Edges shorter than this multiple of the target length are collapsed.
    pub collapse_ratio: f32,
    /// Fraction of the way each vertex moves toward the centroid of its
    /// neighbours during smoothing.
    pub smoothing_weight: f32,
}

impl Default for RemeshConfig {
    fn default() -> Self {
        RemeshConfig {
            iterations: 6,
            split_ratio: 4.0 / 3.0,
            collapse_ratio: 4.0 / 5.0,
            smoothing_weight: 0.2,
        }
    }
}

impl RemeshConfig {
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_split_ratio(mut self, ratio: f32) -> Self {
        self.split_ratio = ratio;
        self
    }

    pub fn with_collapse_ratio(mut self, ratio: f32) -> Self {
        self.collapse_ratio = ratio;
        self
    }

    pub fn with_smoothing_weight(mut self, weight: f32) -> Self {
        self.smoothing_weight = weight;
        self
    }
}

fn target_valence(topol: &Topology, v: VH) -> i64 {
    if topol.is_boundary_vertex(v) { 4 } else { 6 }
}

impl PolyMesh {
    /// Remesh a triangle mesh so that its edges approach the mean edge
    /// length of the input, using the default [`RemeshConfig`].
    ///
    /// Returns `false` without modifying the mesh if it has faces that are
    /// not triangles, or if it has no edges.
    ///
    /// ```rust
    /// use meshedit::PolyMesh;
    ///
    /// let mut mesh = PolyMesh::icosahedron(1.0).expect("Cannot create icosahedron");
    /// assert!(mesh.isotropic_remesh());
    /// mesh.check_topology().expect("Topological errors found");
    /// ```
    pub fn isotropic_remesh(&mut self) -> bool {
        self.isotropic_remesh_with(&RemeshConfig::default())
    }

    pub fn isotropic_remesh_with(&mut self, config: &RemeshConfig) -> bool {
        if !self.can_edit("isotropic_remesh") {
            return false;
        }
        if let Some(f) = self.faces().find(|f| self.face_valence(*f) != 3) {
            debug!(face = %f, "Refusing to remesh a mesh with non-triangle faces");
            return false;
        }
        if self.num_edges() == 0 {
            debug!("Refusing to remesh a mesh without edges");
            return false;
        }
        commit("isotropic_remesh", self.remesh_passes(config)).is_some()
    }

    fn remesh_passes(&mut self, config: &RemeshConfig) -> Result<(), Error> {
        let target = {
            let points = self.points.try_borrow()?;
            self.calc_mean_edge_length(&points)
        };
        let (hi, lo) = (target * config.split_ratio, target * config.collapse_ratio);
        for iteration in 0..config.iterations {
            let nsplits = self.split_long_edges(hi)?;
            let ncollapses = self.collapse_short_edges(lo, hi)?;
            let nflips = self.equalize_valences();
            self.tangential_smoothing(config.smoothing_weight)?;
            debug!(
                iteration,
                nsplits,
                ncollapses,
                nflips,
                faces = self.num_faces(),
                "Remesh pass"
            );
        }
        Ok(())
    }

    fn split_long_edges(&mut self, hi: f32) -> Result<usize, Error> {
        let long: Vec<EH> = {
            let points = self.points.try_borrow()?;
            self.edges()
                .filter(|e| self.calc_edge_length(*e, &points) > hi)
                .collect()
        };
        for &e in &long {
            self.split_edge_at_midpoint(e)?;
        }
        Ok(long.len())
    }

    /// Position of the vertex produced by collapsing `e`. A collapse that
    /// touches the boundary keeps the boundary vertex in place.
    fn remesh_collapse_target(&self, e: EH, points: &[Vec3]) -> Vec3 {
        let h = e.halfedge(false);
        let (a, b) = (self.topol.from_vertex(h), self.topol.to_vertex(h));
        match (
            self.topol.is_boundary_vertex(a),
            self.topol.is_boundary_vertex(b),
        ) {
            (true, false) => points[a.index() as usize],
            (false, true) => points[b.index() as usize],
            _ => self.calc_edge_midpoint(e, points),
        }
    }

    fn collapse_short_edges(&mut self, lo: f32, hi: f32) -> Result<usize, Error> {
        let edges: Vec<EH> = self.edges().collect();
        let mut count = 0usize;
        for e in edges {
            if !self.topol.is_valid_edge(e) {
                continue;
            }
            let pos = {
                let points = self.points.try_borrow()?;
                if self.calc_edge_length(e, &points) >= lo {
                    continue;
                }
                let pos = self.remesh_collapse_target(e, &points);
                let h = e.halfedge(false);
                let (a, b) = (self.topol.from_vertex(h), self.topol.to_vertex(h));
                let creates_long_edge = iterator::vv_ccw_iter(&self.topol, a)
                    .chain(iterator::vv_ccw_iter(&self.topol, b))
                    .filter(|n| *n != a && *n != b)
                    .any(|n| pos.distance(points[n]) > hi);
                if creates_long_edge {
                    trace!(edge = %e, "Skipping collapse that creates a long edge");
                    continue;
                }
                pos
            };
            if !self.topol.check_edge_collapse(e) {
                trace!(edge = %e, "Skipping illegal collapse");
                continue;
            }
            self.collapse_edge_to(e, Some(pos))?;
            count += 1;
        }
        Ok(count)
    }

    fn equalize_valences(&mut self) -> usize {
        let edges: Vec<EH> = self.edges().collect();
        let mut count = 0usize;
        for e in edges {
            if self.topol.is_boundary_edge(e) || !self.topol.check_edge_flip(e) {
                continue;
            }
            let (h, o) = e.halfedges();
            let topol = &self.topol;
            let (a, b) = (topol.from_vertex(h), topol.to_vertex(h));
            let (c, d) = (
                topol.to_vertex(topol.next_halfedge(h)),
                topol.to_vertex(topol.next_halfedge(o)),
            );
            // The rotated edge must not duplicate an existing one, and both
            // endpoints must keep at least three neighbours.
            if topol.find_halfedge(c, d).is_some()
                || topol.vertex_valence(a) <= 3
                || topol.vertex_valence(b) <= 3
            {
                trace!(edge = %e, "Skipping flip that degenerates the mesh");
                continue;
            }
            let corners = [(a, -1i64), (b, -1), (c, 1), (d, 1)];
            let (before, after) = corners.iter().fold((0i64, 0i64), |(before, after), &(v, delta)| {
                let valence = topol.vertex_valence(v) as i64;
                let target = target_valence(topol, v);
                (
                    before.max((valence - target).abs()),
                    after.max((valence + delta - target).abs()),
                )
            });
            if after < before {
                trace!(edge = %e, before, after, "Flipping edge to improve valences");
                self.topol.flip_edge(e);
                count += 1;
            }
        }
        count
    }

    /// Move every interior vertex toward the centroid of its neighbours,
    /// within its tangent plane.
    fn tangential_smoothing(&mut self, weight: f32) -> Result<(), Error> {
        let mut new_pos = self.create_vertex_prop(Vec3::ZERO);
        {
            let points = self.points.try_borrow()?;
            let mut dst = new_pos.try_borrow_mut()?;
            dst.copy_from_slice(&points);
            for v in self.topol.vertices() {
                if self.topol.is_boundary_vertex(v) {
                    continue;
                }
                let (n, sum) = iterator::vv_ccw_iter(&self.topol, v)
                    .fold((0usize, Vec3::ZERO), |(n, sum), nv| {
                        (n + 1, sum + points[nv])
                    });
                if n == 0 {
                    continue;
                }
                let normal = self.calc_vertex_normal(v, &points);
                let delta = sum / n as f32 - points[v];
                let delta = delta - normal * normal.dot(delta);
                dst[v] = points[v] + delta * weight;
            }
        }
        let src = new_pos.try_borrow()?;
        let mut points = self.points.try_borrow_mut()?;
        points.copy_from_slice(&src);
        Ok(())
    }
}
