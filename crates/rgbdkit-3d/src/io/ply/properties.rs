use super::PlyError;

/// Encoding of the element data following the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyFormat {
    /// Whitespace-separated decimal text.
    Ascii,
    /// Packed little-endian binary.
    BinaryLittleEndian,
}

/// Scalar data types that can appear in a PLY property declaration.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlyDataType {
    /// 32-bit float (`float`).
    Float32,
    /// 64-bit float (`double`).
    Float64,
    /// Signed 8-bit integer (`char`).
    Int8,
    /// Unsigned 8-bit integer (`uchar`).
    UInt8,
    /// Signed 16-bit integer (`short`).
    Int16,
    /// Unsigned 16-bit integer (`ushort`).
    UInt16,
    /// Signed 32-bit integer (`int`).
    Int32,
    /// Unsigned 32-bit integer (`uint`).
    UInt32,
}

impl PlyDataType {
    /// Size of one value in bytes in the binary encoding.
    pub fn size(&self) -> usize {
        match self {
            PlyDataType::Float32 | PlyDataType::Int32 | PlyDataType::UInt32 => 4,
            PlyDataType::Float64 => 8,
            PlyDataType::Int16 | PlyDataType::UInt16 => 2,
            PlyDataType::Int8 | PlyDataType::UInt8 => 1,
        }
    }

    /// Whether this is one of the floating point types.
    pub fn is_float(&self) -> bool {
        matches!(self, PlyDataType::Float32 | PlyDataType::Float64)
    }

    pub(crate) fn parse(type_str: &str) -> Result<Self, PlyError> {
        match type_str {
            "float" | "float32" => Ok(PlyDataType::Float32),
            "double" | "float64" => Ok(PlyDataType::Float64),
            "char" | "int8" => Ok(PlyDataType::Int8),
            "uchar" | "uint8" => Ok(PlyDataType::UInt8),
            "short" | "int16" => Ok(PlyDataType::Int16),
            "ushort" | "uint16" => Ok(PlyDataType::UInt16),
            "int" | "int32" => Ok(PlyDataType::Int32),
            "uint" | "uint32" => Ok(PlyDataType::UInt32),
            _ => Err(PlyError::UnsupportedPropertyType(type_str.to_string())),
        }
    }

    pub(crate) fn decode_le(&self, buffer: &[u8]) -> f64 {
        match self {
            PlyDataType::Float32 => {
                f32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as f64
            }
            PlyDataType::Float64 => f64::from_le_bytes([
                buffer[0], buffer[1], buffer[2], buffer[3], buffer[4], buffer[5], buffer[6],
                buffer[7],
            ]),
            PlyDataType::Int8 => buffer[0] as i8 as f64,
            PlyDataType::UInt8 => buffer[0] as f64,
            PlyDataType::Int16 => i16::from_le_bytes([buffer[0], buffer[1]]) as f64,
            PlyDataType::UInt16 => u16::from_le_bytes([buffer[0], buffer[1]]) as f64,
            PlyDataType::Int32 => {
                i32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as f64
            }
            PlyDataType::UInt32 => {
                u32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as f64
            }
        }
    }
}

/// A property declaration within an element.
#[derive(Debug, Clone, PartialEq)]
pub enum PlyProperty {
    /// A single scalar value per record.
    Scalar {
        /// Property name.
        name: String,
        /// Value type.
        data_type: PlyDataType,
    },
    /// A counted list of values per record.
    List {
        /// Property name.
        name: String,
        /// Type of the leading count value.
        count_type: PlyDataType,
        /// Type of the list items.
        item_type: PlyDataType,
    },
}

impl PlyProperty {
    /// The property name.
    pub fn name(&self) -> &str {
        match self {
            PlyProperty::Scalar { name, .. } => name,
            PlyProperty::List { name, .. } => name,
        }
    }
}

/// One element declaration: a name, a record count and its properties in
/// declaration order.
#[derive(Debug, Clone)]
pub struct PlyElement {
    /// Element name, e.g. `vertex` or `face`.
    pub name: String,
    /// Number of records of this element.
    pub count: usize,
    /// Properties of one record, in declaration order.
    pub properties: Vec<PlyProperty>,
}

// Which mesh channels the vertex element carries, as indices into the
// per-record scalar value buffer.
pub(crate) struct VertexLayout {
    pub position: [usize; 3],
    pub normal: Option<[usize; 3]>,
    pub texcoord: Option<[usize; 2]>,
    pub color: Option<[usize; 3]>,
    pub color_is_float: bool,
}

impl VertexLayout {
    pub fn detect(element: &PlyElement) -> Result<Self, PlyError> {
        let scalar = |name: &str| -> Option<(usize, PlyDataType)> {
            element.properties.iter().enumerate().find_map(|(i, p)| match p {
                PlyProperty::Scalar {
                    name: n,
                    data_type,
                } if n == name => Some((i, *data_type)),
                _ => None,
            })
        };
        let triple = |a: &str, b: &str, c: &str| -> Option<[usize; 3]> {
            match (scalar(a), scalar(b), scalar(c)) {
                (Some((i, _)), Some((j, _)), Some((k, _))) => Some([i, j, k]),
                _ => None,
            }
        };

        let position = [
            scalar("x").ok_or(PlyError::MissingProperty("x"))?.0,
            scalar("y").ok_or(PlyError::MissingProperty("y"))?.0,
            scalar("z").ok_or(PlyError::MissingProperty("z"))?.0,
        ];
        let normal = triple("nx", "ny", "nz");
        let texcoord = match (scalar("s"), scalar("t")) {
            (Some((i, _)), Some((j, _))) => Some([i, j]),
            _ => match (scalar("u"), scalar("v")) {
                (Some((i, _)), Some((j, _))) => Some([i, j]),
                _ => None,
            },
        };
        let color = triple("red", "green", "blue");
        let color_is_float = scalar("red").map(|(_, t)| t.is_float()).unwrap_or(false);

        Ok(Self {
            position,
            normal,
            texcoord,
            color,
            color_is_float,
        })
    }
}
