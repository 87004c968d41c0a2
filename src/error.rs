use crate::element::{EH, FH, HH, VH};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Properties.
    #[error("a property is already borrowed")]
    BorrowedPropertyAccess,
    #[error("index {0} is out of range of the property")]
    PropertyIndexOutOfBounds(u32),
    // Topology.
    #[error("vertex {0} is not manifold")]
    ComplexVertex(VH),
    #[error("halfedge {0} already has a face")]
    ComplexHalfedge(HH),
    #[error("unable to relink the patch around the new face")]
    PatchRelinkingFailed,
    #[error("a face needs at least 3 vertices, {0} were given")]
    InvalidFaceDegree(usize),
    #[error("vertex index {0} is out of bounds")]
    VertexIndexOutOfBounds(usize),
    // Validation.
    #[error("vertex {0} is deleted")]
    DeletedVertex(VH),
    #[error("halfedge {0} is deleted")]
    DeletedHalfedge(HH),
    #[error("edge {0} is deleted")]
    DeletedEdge(EH),
    #[error("face {0} is deleted")]
    DeletedFace(FH),
    #[error("halfedge {0} is out of range")]
    InvalidHalfedge(HH),
    #[error("outgoing halfedges of vertex {0} are inconsistent")]
    InvalidOutgoingHalfedges(VH),
    #[error("outgoing halfedge of boundary vertex {0} is not a boundary halfedge")]
    OutgoingHalfedgeNotBoundary(VH),
    #[error("halfedge {0} starts and ends at the same vertex")]
    DegenerateHalfedge(HH),
    #[error("halfedge {0} is not linked to its neighbours")]
    InvalidHalfedgeLink(HH),
    #[error("halfedge {0} is missing from the fans of its vertices")]
    InvalidHalfedgeVertexLink(HH),
    #[error("the loop containing halfedge {0} is broken")]
    InvalidLoopTopology(HH),
    #[error("halfedge {0} disagrees with its loop about the face")]
    InconsistentFaceInLoop(HH),
    #[error("face {0} and its halfedge {1} are not linked")]
    InvalidFaceHalfedgeLink(FH, HH),
    #[error("face {0} has fewer than 3 sides")]
    DegenerateFace(FH),
    // Algorithms.
    #[error("face {0} is not a triangle")]
    NonTriangleFace(FH),
    #[error("edge {0} is on the boundary")]
    BoundaryEdge(EH),
    #[error("vertex {0} is on the boundary")]
    BoundaryVertex(VH),
}
