use crate::{
    element::{EH, FH, HH, HasTopology, VH},
    topol::Topology,
};

struct OutgoingHalfedgeIter<'a, const CCW: bool> {
    topol: &'a Topology,
    hstart: Option<HH>,
    hcurrent: Option<HH>,
}

impl Iterator for OutgoingHalfedgeIter<'_, true> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        match self.hcurrent {
            Some(current) => {
                let next = self.topol.prev_halfedge(current).opposite();
                self.hcurrent = match self.hstart {
                    Some(start) if start != next => Some(next),
                    _ => None,
                };
                Some(current)
            }
            None => None,
        }
    }
}

impl Iterator for OutgoingHalfedgeIter<'_, false> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        match self.hcurrent {
            Some(current) => {
                let next = self.topol.next_halfedge(current.opposite());
                self.hcurrent = match self.hstart {
                    Some(start) if start != next => Some(next),
                    _ => None,
                };
                Some(current)
            }
            None => None,
        }
    }
}

struct LoopHalfedgeIter<'a, const CCW: bool> {
    topol: &'a Topology,
    hstart: HH,
    hcurrent: Option<HH>,
}

impl Iterator for LoopHalfedgeIter<'_, true> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        match self.hcurrent {
            Some(current) => {
                let next = self.topol.next_halfedge(current);
                self.hcurrent = if next == self.hstart {
                    None
                } else {
                    Some(next)
                };
                Some(current)
            }
            None => None,
        }
    }
}

impl Iterator for LoopHalfedgeIter<'_, false> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        match self.hcurrent {
            Some(current) => {
                let next = self.topol.prev_halfedge(current);
                self.hcurrent = if next == self.hstart {
                    None
                } else {
                    Some(next)
                };
                Some(current)
            }
            None => None,
        }
    }
}

pub(crate) fn vv_ccw_iter(topol: &Topology, v: VH) -> impl Iterator<Item = VH> + use<'_> {
    voh_ccw_iter(topol, v).map(|h| topol.to_vertex(h))
}

pub(crate) fn vv_cw_iter(topol: &Topology, v: VH) -> impl Iterator<Item = VH> + use<'_> {
    voh_cw_iter(topol, v).map(|h| topol.to_vertex(h))
}

pub(crate) fn vih_ccw_iter(topol: &Topology, v: VH) -> impl Iterator<Item = HH> + use<'_> {
    voh_ccw_iter(topol, v).map(|h| h.opposite())
}

pub(crate) fn vih_cw_iter(topol: &Topology, v: VH) -> impl Iterator<Item = HH> + use<'_> {
    voh_cw_iter(topol, v).map(|h| h.opposite())
}

pub(crate) fn voh_ccw_iter(topol: &Topology, v: VH) -> impl Iterator<Item = HH> + use<'_> {
    let h = topol.vertex_halfedge(v);
    OutgoingHalfedgeIter::<true> {
        topol,
        hstart: h,
        hcurrent: h,
    }
}

pub(crate) fn voh_cw_iter(topol: &Topology, v: VH) -> impl Iterator<Item = HH> + use<'_> {
    let h = topol.vertex_halfedge(v);
    OutgoingHalfedgeIter::<false> {
        topol,
        hstart: h,
        hcurrent: h,
    }
}

pub(crate) fn ve_ccw_iter(topol: &Topology, v: VH) -> impl Iterator<Item = EH> + use<'_> {
    voh_ccw_iter(topol, v).map(|h| h.edge())
}

pub(crate) fn vf_ccw_iter(topol: &Topology, v: VH) -> impl Iterator<Item = FH> + use<'_> {
    voh_ccw_iter(topol, v).filter_map(|h| topol.halfedge_face(h))
}

pub(crate) fn ev_iter(topol: &Topology, e: EH) -> impl Iterator<Item = VH> + use<'_> {
    let (h, oh) = e.halfedges();
    [h, oh].into_iter().map(|h| topol.to_vertex(h))
}

pub(crate) fn ef_iter(topol: &Topology, e: EH) -> impl Iterator<Item = FH> + use<'_> {
    let (h, oh) = e.halfedges();
    [h, oh].into_iter().filter_map(|h| topol.halfedge_face(h))
}

pub(crate) fn fv_ccw_iter(topol: &Topology, f: FH) -> impl Iterator<Item = VH> + use<'_> {
    fh_ccw_iter(topol, f).map(|h| topol.to_vertex(h))
}

pub(crate) fn fh_ccw_iter(topol: &Topology, f: FH) -> impl Iterator<Item = HH> + use<'_> {
    loop_ccw_iter(topol, topol.face_halfedge(f))
}

pub(crate) fn fh_cw_iter(topol: &Topology, f: FH) -> impl Iterator<Item = HH> + use<'_> {
    loop_cw_iter(topol, topol.face_halfedge(f))
}

pub(crate) fn fe_ccw_iter(topol: &Topology, f: FH) -> impl Iterator<Item = EH> + use<'_> {
    fh_ccw_iter(topol, f).map(|h| h.edge())
}

pub(crate) fn ff_ccw_iter(topol: &Topology, f: FH) -> impl Iterator<Item = FH> + use<'_> {
    fh_ccw_iter(topol, f).filter_map(|h| topol.halfedge_face(h.opposite()))
}

/// Iterate the loop containing `h`, following the next halfedges, starting at
/// `h`. Works for boundary loops as well as faces.
pub(crate) fn loop_ccw_iter(topol: &Topology, h: HH) -> impl Iterator<Item = HH> + use<'_> {
    LoopHalfedgeIter::<true> {
        topol,
        hstart: h,
        hcurrent: Some(h),
    }
}

pub(crate) fn loop_cw_iter(topol: &Topology, h: HH) -> impl Iterator<Item = HH> + use<'_> {
    LoopHalfedgeIter::<false> {
        topol,
        hstart: h,
        hcurrent: Some(h),
    }
}

/// Circulators around the elements of a mesh.
///
/// Vertex circulators start at the outgoing halfedge of the vertex, and face
/// circulators start at the halfedge of the face.
pub trait HasIterators: HasTopology {
    /// Neighbouring vertices, counter-clockwise.
    fn vv_ccw_iter(&self, v: VH) -> impl Iterator<Item = VH> {
        vv_ccw_iter(self.topology(), v)
    }

    /// Neighbouring vertices, clockwise.
    fn vv_cw_iter(&self, v: VH) -> impl Iterator<Item = VH> {
        vv_cw_iter(self.topology(), v)
    }

    /// Incoming halfedges, counter-clockwise.
    fn vih_ccw_iter(&self, v: VH) -> impl Iterator<Item = HH> {
        vih_ccw_iter(self.topology(), v)
    }

    /// Incoming halfedges, clockwise.
    fn vih_cw_iter(&self, v: VH) -> impl Iterator<Item = HH> {
        vih_cw_iter(self.topology(), v)
    }

    /// Outgoing halfedges, counter-clockwise.
    fn voh_ccw_iter(&self, v: VH) -> impl Iterator<Item = HH> {
        voh_ccw_iter(self.topology(), v)
    }

    /// Outgoing halfedges, clockwise.
    fn voh_cw_iter(&self, v: VH) -> impl Iterator<Item = HH> {
        voh_cw_iter(self.topology(), v)
    }

    /// Incident edges, counter-clockwise.
    fn ve_ccw_iter(&self, v: VH) -> impl Iterator<Item = EH> {
        ve_ccw_iter(self.topology(), v)
    }

    /// Incident faces, counter-clockwise. Boundary gaps are skipped.
    fn vf_ccw_iter(&self, v: VH) -> impl Iterator<Item = FH> {
        vf_ccw_iter(self.topology(), v)
    }

    /// The two vertices of an edge.
    fn ev_iter(&self, e: EH) -> impl Iterator<Item = VH> {
        ev_iter(self.topology(), e)
    }

    /// The faces on either side of an edge.
    fn ef_iter(&self, e: EH) -> impl Iterator<Item = FH> {
        ef_iter(self.topology(), e)
    }

    /// Vertices of a face, counter-clockwise.
    fn fv_ccw_iter(&self, f: FH) -> impl Iterator<Item = VH> {
        fv_ccw_iter(self.topology(), f)
    }

    /// Halfedges of a face, counter-clockwise.
    fn fh_ccw_iter(&self, f: FH) -> impl Iterator<Item = HH> {
        fh_ccw_iter(self.topology(), f)
    }

    /// Halfedges of a face, clockwise.
    fn fh_cw_iter(&self, f: FH) -> impl Iterator<Item = HH> {
        fh_cw_iter(self.topology(), f)
    }

    /// Edges of a face, counter-clockwise.
    fn fe_ccw_iter(&self, f: FH) -> impl Iterator<Item = EH> {
        fe_ccw_iter(self.topology(), f)
    }

    /// Faces across the edges of a face, counter-clockwise.
    fn ff_ccw_iter(&self, f: FH) -> impl Iterator<Item = FH> {
        ff_ccw_iter(self.topology(), f)
    }

    /// The loop containing `h`, starting at `h`.
    fn loop_ccw_iter(&self, h: HH) -> impl Iterator<Item = HH> {
        loop_ccw_iter(self.topology(), h)
    }

    /// The loop containing `h` in reverse, starting at `h`.
    fn loop_cw_iter(&self, h: HH) -> impl Iterator<Item = HH> {
        loop_cw_iter(self.topology(), h)
    }
}

impl<T> HasIterators for T where T: HasTopology {}

#[cfg(test)]
mod test {
    use crate::{
        element::Handle,
        iterator::{
            fh_ccw_iter, fh_cw_iter, fv_ccw_iter, vf_ccw_iter, voh_ccw_iter, voh_cw_iter,
            vv_ccw_iter, vv_cw_iter,
        },
        topol::test::{loop_mesh, quad_box},
    };

    #[test]
    fn t_box_vv_ccw_iter() {
        let qbox = quad_box();
        for (vi, vis) in [
            (0u32, [4u32, 3, 1]),
            (1u32, [2u32, 5, 0]),
            (2u32, [3u32, 6, 1]),
            (3u32, [0u32, 7, 2]),
            (4u32, [5u32, 7, 0]),
            (5u32, [6u32, 4, 1]),
            (6u32, [7u32, 5, 2]),
            (7u32, [4u32, 6, 3]),
        ] {
            assert_eq!(
                vv_ccw_iter(&qbox, vi.into())
                    .map(|v| v.index())
                    .collect::<Vec<_>>(),
                vis
            );
        }
    }

    #[test]
    fn t_box_ccw_cw_agree() {
        let qbox = quad_box();
        for v in qbox.vertices() {
            let mut ccw: Vec<_> = vv_ccw_iter(&qbox, v).collect();
            let cw: Vec<_> = vv_cw_iter(&qbox, v).collect();
            // Both start at the same halfedge, then go in opposite directions.
            ccw[1..].reverse();
            assert_eq!(ccw, cw);
            let voh: Vec<_> = voh_ccw_iter(&qbox, v).collect();
            assert_eq!(voh.len(), voh_cw_iter(&qbox, v).count());
            assert!(voh.iter().all(|h| qbox.from_vertex(*h) == v));
        }
    }

    #[test]
    fn t_box_face_iters() {
        let qbox = quad_box();
        assert_eq!(
            fv_ccw_iter(&qbox, 5u32.into())
                .map(|v| v.index())
                .collect::<Vec<_>>()
                .len(),
            4
        );
        for f in qbox.faces() {
            let mut ccw: Vec<_> = fh_ccw_iter(&qbox, f).collect();
            let cw: Vec<_> = fh_cw_iter(&qbox, f).collect();
            ccw[1..].reverse();
            assert_eq!(ccw, cw);
        }
    }

    #[test]
    fn t_loop_mesh_vf_ccw_iter() {
        let mesh = loop_mesh();
        // Interior vertex next to the hole has 3 faces, boundary gaps skipped.
        let mut faces: Vec<_> = vf_ccw_iter(&mesh, 5u32.into())
            .map(|f| f.index())
            .collect();
        faces.sort();
        assert_eq!(faces, [0, 1, 3]);
        let mut faces: Vec<_> = vf_ccw_iter(&mesh, 0u32.into())
            .map(|f| f.index())
            .collect();
        faces.sort();
        assert_eq!(faces, [0]);
    }
}
