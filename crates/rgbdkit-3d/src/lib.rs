#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// I/O utilities for reading and writing 3D data.
pub mod io;

/// Linear algebra utilities.
pub mod linalg;

/// Triangle mesh container and geometric construction routines.
pub mod mesh;

/// Infinite plane primitive.
pub mod plane;

/// Point cloud container.
pub mod pointcloud;

/// Rigid body transforms.
pub mod pose;

/// Mesh generation from closed-form primitives.
pub mod primitives;

/// RGB-D images and depth map processing.
pub mod rgbd;

/// Oriented surface elements.
pub mod surfel;

/// 3D transforms algorithms.
pub mod transforms;
