#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use rgbdkit_3d::io;

#[doc(inline)]
pub use rgbdkit_3d::linalg;

#[doc(inline)]
pub use rgbdkit_3d::mesh;

#[doc(inline)]
pub use rgbdkit_3d::plane;

#[doc(inline)]
pub use rgbdkit_3d::pointcloud;

#[doc(inline)]
pub use rgbdkit_3d::pose;

#[doc(inline)]
pub use rgbdkit_3d::primitives;

#[doc(inline)]
pub use rgbdkit_3d::rgbd;

#[doc(inline)]
pub use rgbdkit_3d::surfel;

#[doc(inline)]
pub use rgbdkit_3d::transforms;

#[doc(inline)]
pub use rgbdkit_icp as icp;
