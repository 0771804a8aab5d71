/// PLY mesh import and export.
pub mod ply;
