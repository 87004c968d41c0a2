/*!
This is a halfedge based polygon mesh editing library. It is meant to be the
kernel of an interactive modeling tool, where the user picks an element of the
mesh and applies a local operation to it, or runs a whole-mesh algorithm.

# Overview

+ A halfedge datastructure is used to represent the topology of a mesh, i.e. the
  connectivity of vertices, edges and faces. The topology is an index based
  arena. Removing an element only marks it as deleted, so handles stay valid
  until [`PolyMesh::garbage_collection`] compacts the mesh.

+ [`PolyMesh`] stores the positions of the vertices alongside the topology,
  using [`glam`](https://crates.io/crates/glam) vectors.

+ Local operations such as [`PolyMesh::flip_edge`], [`PolyMesh::split_edge`],
  [`PolyMesh::collapse_edge`] and the bevels return `None` when they refuse to
  edit the mesh. A refused operation never modifies the mesh.

+ Bevel operations only change the connectivity. The positions of the new
  vertices are computed separately by the position solvers, such as
  [`PolyMesh::bevel_face_positions`], which can be called repeatedly with
  different offsets.

+ Whole-mesh algorithms include triangulation, linear and Catmull-Clark
  subdivision, Loop subdivision, isotropic remeshing and quadric error based
  simplification.

+ Every edit preserves the halfedge invariants, which can be verified with
  [`PolyMesh::check_topology`].
*/

mod bevel;
mod check;
#[cfg(feature = "decimate")]
mod decimate;
mod edit;
mod element;
mod error;
mod iterator;
mod macros;
mod mesh;
mod primitive;
mod property;
mod remesh;
mod status;
#[cfg(feature = "subdiv")]
mod subdiv;
mod topol;
mod triangulate;

pub use bevel::Orientation;
#[cfg(feature = "decimate")]
pub use decimate::{EdgeRecord, PQueue, Quadric, SimplifyConfig};
pub use element::{EH, FH, HH, Handle, HasTopology, VH};
pub use error::Error;
pub use iterator::HasIterators;
pub use mesh::PolyMesh;
pub use property::{EProperty, FProperty, HProperty, PropBuf, Property, VProperty};
pub use remesh::RemeshConfig;
#[cfg(feature = "subdiv")]
pub use subdiv::{SubdivPoints, SubdivScheme};
pub use topol::Topology;
