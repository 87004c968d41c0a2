use crate::{mesh::PolyMesh, topol::Topology};
use std::fmt::{Debug, Display};

/**
 * All elements of the mesh implement this trait. They are identified by their
 * index.
 */
pub trait Handle: Copy {
    /**
     * The index of the element.
     */
    fn index(&self) -> u32;
}

macro_rules! impl_handle {
    ($name:ident, $label:literal) => {
        impl Handle for $name {
            fn index(&self) -> u32 {
                self.idx
            }
        }

        impl From<u32> for $name {
            fn from(idx: u32) -> Self {
                $name { idx }
            }
        }

        impl From<&u32> for $name {
            fn from(idx: &u32) -> Self {
                $name { idx: *idx }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", $label, self.idx)
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", $label, self.idx)
            }
        }
    };
}

/**
 * Vertex handle.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VH {
    idx: u32,
}

/**
 * Halfedge handle.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HH {
    idx: u32,
}

/**
 * Edge handle.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EH {
    idx: u32,
}

/**
 * Face handle.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FH {
    idx: u32,
}

impl_handle!(VH, "VH");
impl_handle!(HH, "HH");
impl_handle!(EH, "EH");
impl_handle!(FH, "FH");

/// Anything that owns a halfedge topology.
pub trait HasTopology {
    fn topology(&self) -> &Topology;
}

impl HasTopology for Topology {
    fn topology(&self) -> &Topology {
        self
    }
}

impl HasTopology for PolyMesh {
    fn topology(&self) -> &Topology {
        &self.topol
    }
}

impl HH {
    /// The vertex this halfedge points to.
    pub fn head(self, mesh: &impl HasTopology) -> VH {
        mesh.topology().to_vertex(self)
    }

    /// The vertex this halfedge starts from.
    pub fn tail(self, mesh: &impl HasTopology) -> VH {
        mesh.topology().from_vertex(self)
    }

    /// The twin of this halfedge. Both halfedges of an edge are stored next to
    /// each other, so this doesn't need the mesh.
    pub fn opposite(self) -> HH {
        (self.idx ^ 1).into()
    }

    pub fn edge(self) -> EH {
        (self.idx >> 1).into()
    }

    pub fn prev(self, mesh: &impl HasTopology) -> HH {
        mesh.topology().prev_halfedge(self)
    }

    pub fn next(self, mesh: &impl HasTopology) -> HH {
        mesh.topology().next_halfedge(self)
    }

    /// `None` for boundary halfedges.
    pub fn face(self, mesh: &impl HasTopology) -> Option<FH> {
        mesh.topology().halfedge_face(self)
    }
}

impl EH {
    /// Both halfedges, the first one pointing along the edge.
    pub fn halfedges(self) -> (HH, HH) {
        let hi = self.idx << 1;
        (hi.into(), (hi | 1).into())
    }

    pub fn halfedge(self, flag: bool) -> HH {
        ((self.idx << 1) | u32::from(flag)).into()
    }
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct Vertex {
    pub(crate) halfedge: Option<HH>,
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct Halfedge {
    pub(crate) face: Option<FH>,
    pub(crate) vertex: VH,
    pub(crate) next: HH,
    pub(crate) prev: HH,
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct Edge {
    pub(crate) halfedges: [Halfedge; 2],
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct Face {
    pub(crate) halfedge: HH,
}

#[cfg(test)]
mod test {
    use super::{EH, HH, Handle};

    #[test]
    fn t_halfedge_pairs() {
        let e: EH = 7u32.into();
        let (h, oh) = e.halfedges();
        assert_eq!((h.index(), oh.index()), (14, 15));
        assert_eq!(h.opposite(), oh);
        assert_eq!(oh.opposite(), h);
        assert_eq!(h.edge(), e);
        assert_eq!(oh.edge(), e);
        assert_eq!(e.halfedge(false), h);
        assert_eq!(e.halfedge(true), oh);
    }

    #[test]
    fn t_handle_display() {
        let h: HH = 3u32.into();
        assert_eq!(format!("{h}"), "HH(3)");
        assert_eq!(format!("{:?}", h.edge()), "EH(1)");
    }
}
