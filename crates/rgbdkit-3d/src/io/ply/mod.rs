mod parser;
mod properties;
mod writer;

pub use parser::read_ply;
pub use properties::{PlyDataType, PlyElement, PlyFormat, PlyProperty};
pub use writer::{write_ply, write_ply_binary};

/// Error types for the PLY module.
#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    /// Failed to read or write the PLY file.
    #[error("failed to read PLY file")]
    Io(#[from] std::io::Error),

    /// The file does not start with the `ply` magic.
    #[error("not a PLY file")]
    MissingMagic,

    /// A format other than ascii or binary_little_endian.
    #[error("unsupported PLY format: {0}")]
    UnsupportedFormat(String),

    /// A property type name that is not a known PLY scalar type.
    #[error("unsupported PLY property type: {0}")]
    UnsupportedPropertyType(String),

    /// A header line that could not be parsed.
    #[error("malformed header line: {0}")]
    MalformedHeader(String),

    /// The vertex element lacks a required property.
    #[error("missing required vertex property: {0}")]
    MissingProperty(&'static str),

    /// The element data ended before all declared records were read.
    #[error("unexpected end of element data")]
    UnexpectedEof,

    /// A token in the element data that could not be parsed.
    #[error("invalid value in element data: {0}")]
    InvalidValue(String),

    /// A face with other than three vertex indices.
    #[error("only triangular faces are supported (got {0} indices)")]
    NonTriangleFace(usize),

    /// A face referring to a vertex that does not exist.
    #[error("face index {0} out of bounds for {1} vertices")]
    FaceIndexOutOfBounds(u32, usize),
}
