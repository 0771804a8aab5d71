use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use super::properties::{PlyDataType, PlyElement, PlyFormat, PlyProperty, VertexLayout};
use super::PlyError;
use crate::mesh::TriangleMesh;

pub(crate) struct PlyHeader {
    pub format: PlyFormat,
    pub elements: Vec<PlyElement>,
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<PlyHeader, PlyError> {
    let mut line = String::new();
    let mut format = None;
    let mut elements: Vec<PlyElement> = Vec::new();
    let mut saw_magic = false;
    let mut saw_end = false;

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if !saw_magic {
            if trimmed != "ply" {
                return Err(PlyError::MissingMagic);
            }
            saw_magic = true;
            continue;
        }

        if trimmed == "end_header" {
            saw_end = true;
            break;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        match parts.as_slice() {
            ["comment", ..] | ["obj_info", ..] => {}
            ["format", "ascii", _] => format = Some(PlyFormat::Ascii),
            ["format", "binary_little_endian", _] => format = Some(PlyFormat::BinaryLittleEndian),
            ["format", other, ..] => {
                return Err(PlyError::UnsupportedFormat(other.to_string()));
            }
            ["element", name, count] => {
                let count = count
                    .parse()
                    .map_err(|_| PlyError::MalformedHeader(trimmed.to_string()))?;
                elements.push(PlyElement {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            ["property", "list", count_type, item_type, name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| PlyError::MalformedHeader(trimmed.to_string()))?;
                element.properties.push(PlyProperty::List {
                    name: name.to_string(),
                    count_type: PlyDataType::parse(count_type)?,
                    item_type: PlyDataType::parse(item_type)?,
                });
            }
            ["property", data_type, name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| PlyError::MalformedHeader(trimmed.to_string()))?;
                element.properties.push(PlyProperty::Scalar {
                    name: name.to_string(),
                    data_type: PlyDataType::parse(data_type)?,
                });
            }
            _ => return Err(PlyError::MalformedHeader(trimmed.to_string())),
        }
    }

    if !saw_magic {
        return Err(PlyError::MissingMagic);
    }
    if !saw_end {
        return Err(PlyError::MalformedHeader("missing end_header".to_string()));
    }
    let format = format.ok_or_else(|| PlyError::MalformedHeader("missing format".to_string()))?;

    Ok(PlyHeader { format, elements })
}

// A stream of scalar values, decoded ascii tokens or little-endian bytes.
trait ValueSource {
    fn next_scalar(&mut self, data_type: PlyDataType) -> Result<f64, PlyError>;
}

struct AsciiSource<'a> {
    tokens: std::str::SplitAsciiWhitespace<'a>,
}

impl ValueSource for AsciiSource<'_> {
    fn next_scalar(&mut self, _data_type: PlyDataType) -> Result<f64, PlyError> {
        let token = self.tokens.next().ok_or(PlyError::UnexpectedEof)?;
        token
            .parse::<f64>()
            .map_err(|_| PlyError::InvalidValue(token.to_string()))
    }
}

struct BinarySource<R: Read> {
    reader: R,
}

impl<R: Read> ValueSource for BinarySource<R> {
    fn next_scalar(&mut self, data_type: PlyDataType) -> Result<f64, PlyError> {
        let mut buffer = [0u8; 8];
        self.reader.read_exact(&mut buffer[..data_type.size()])?;
        Ok(data_type.decode_le(&buffer))
    }
}

fn read_vertices<S: ValueSource>(
    source: &mut S,
    element: &PlyElement,
    mesh: &mut TriangleMesh,
) -> Result<(), PlyError> {
    let layout = VertexLayout::detect(element)?;

    let mut vertices = Vec::with_capacity(element.count);
    let mut colors = layout.color.map(|_| Vec::with_capacity(element.count));
    let mut normals = layout.normal.map(|_| Vec::with_capacity(element.count));
    let mut texcoords = layout.texcoord.map(|_| Vec::with_capacity(element.count));

    let mut values = vec![0.0f64; element.properties.len()];
    for _ in 0..element.count {
        for (slot, property) in values.iter_mut().zip(element.properties.iter()) {
            match property {
                PlyProperty::Scalar { data_type, .. } => {
                    *slot = source.next_scalar(*data_type)?;
                }
                PlyProperty::List {
                    count_type,
                    item_type,
                    ..
                } => {
                    // lists within a vertex element carry no mesh channel
                    let count = source.next_scalar(*count_type)? as usize;
                    for _ in 0..count {
                        source.next_scalar(*item_type)?;
                    }
                    *slot = f64::NAN;
                }
            }
        }

        let [ix, iy, iz] = layout.position;
        vertices.push([values[ix], values[iy], values[iz]]);
        if let (Some(out), Some([i, j, k])) = (&mut normals, layout.normal) {
            out.push([values[i], values[j], values[k]]);
        }
        if let (Some(out), Some([i, j])) = (&mut texcoords, layout.texcoord) {
            out.push([values[i], values[j]]);
        }
        if let (Some(out), Some([i, j, k])) = (&mut colors, layout.color) {
            let to_u8 = |v: f64| -> u8 {
                let v = if layout.color_is_float { v * 255.0 } else { v };
                v.clamp(0.0, 255.0) as u8
            };
            out.push([to_u8(values[i]), to_u8(values[j]), to_u8(values[k])]);
        }
    }

    mesh.vertices = vertices;
    mesh.colors = colors;
    mesh.normals = normals;
    mesh.texcoords = texcoords;
    Ok(())
}

fn read_faces<S: ValueSource>(
    source: &mut S,
    element: &PlyElement,
    mesh: &mut TriangleMesh,
) -> Result<(), PlyError> {
    let has_indices = element
        .properties
        .iter()
        .any(|p| matches!(p, PlyProperty::List { name, .. } if name == "vertex_indices" || name == "vertex_index"));
    if !has_indices {
        return Err(PlyError::MissingProperty("vertex_indices"));
    }

    let mut faces = Vec::with_capacity(element.count);
    for _ in 0..element.count {
        for property in &element.properties {
            match property {
                PlyProperty::Scalar { data_type, .. } => {
                    source.next_scalar(*data_type)?;
                }
                PlyProperty::List {
                    name,
                    count_type,
                    item_type,
                } => {
                    let count = source.next_scalar(*count_type)? as usize;
                    if name == "vertex_indices" || name == "vertex_index" {
                        if count != 3 {
                            return Err(PlyError::NonTriangleFace(count));
                        }
                        let mut face = [0u32; 3];
                        for slot in &mut face {
                            let v = source.next_scalar(*item_type)?;
                            if v < 0.0 || v > u32::MAX as f64 || v.fract() != 0.0 {
                                return Err(PlyError::InvalidValue(v.to_string()));
                            }
                            *slot = v as u32;
                        }
                        faces.push(face);
                    } else {
                        // e.g. wedge texcoord lists, decoded and discarded
                        for _ in 0..count {
                            source.next_scalar(*item_type)?;
                        }
                    }
                }
            }
        }
    }

    mesh.faces = faces;
    Ok(())
}

fn skip_element<S: ValueSource>(source: &mut S, element: &PlyElement) -> Result<(), PlyError> {
    for _ in 0..element.count {
        for property in &element.properties {
            match property {
                PlyProperty::Scalar { data_type, .. } => {
                    source.next_scalar(*data_type)?;
                }
                PlyProperty::List {
                    count_type,
                    item_type,
                    ..
                } => {
                    let count = source.next_scalar(*count_type)? as usize;
                    for _ in 0..count {
                        source.next_scalar(*item_type)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn read_body<S: ValueSource>(source: &mut S, header: &PlyHeader) -> Result<TriangleMesh, PlyError> {
    let mut mesh = TriangleMesh::new();
    for element in &header.elements {
        match element.name.as_str() {
            "vertex" => read_vertices(source, element, &mut mesh)?,
            "face" => read_faces(source, element, &mut mesh)?,
            _ => skip_element(source, element)?,
        }
    }

    for face in &mesh.faces {
        for &index in face {
            if index as usize >= mesh.vertices.len() {
                return Err(PlyError::FaceIndexOutOfBounds(index, mesh.vertices.len()));
            }
        }
    }
    Ok(mesh)
}

/// Read a triangle mesh from a PLY file, ascii or binary_little_endian.
///
/// The vertex element must carry at least `x`, `y` and `z`; normal
/// (`nx`/`ny`/`nz`), texture coordinate (`s`/`t` or `u`/`v`) and color
/// (`red`/`green`/`blue`) properties are attached as mesh channels when
/// present, and any other property is decoded and discarded. Faces must be
/// triangles.
pub fn read_ply(path: impl AsRef<Path>) -> Result<TriangleMesh, PlyError> {
    let file = std::fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let header = parse_header(&mut reader)?;

    log::debug!(
        "parsed PLY header: {} elements, format {:?}",
        header.elements.len(),
        header.format
    );

    match header.format {
        PlyFormat::Ascii => {
            let mut body = String::new();
            reader.read_to_string(&mut body)?;
            let mut source = AsciiSource {
                tokens: body.split_ascii_whitespace(),
            };
            read_body(&mut source, &header)
        }
        PlyFormat::BinaryLittleEndian => {
            let mut source = BinarySource { reader };
            read_body(&mut source, &header)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{write_ply, write_ply_binary};
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_mesh() -> TriangleMesh {
        let mut mesh = TriangleMesh::new();
        mesh.vertices = vec![
            [0.0, 0.0, 0.0],
            [1.5, 0.0, 0.0],
            [0.0, 2.25, 0.0],
            [0.5, 0.5, -1.75],
        ];
        mesh.normals = Some(vec![
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
        ]);
        mesh.colors = Some(vec![
            [255, 0, 0],
            [0, 255, 0],
            [0, 0, 255],
            [128, 128, 128],
        ]);
        mesh.faces = vec![[0, 1, 2], [1, 3, 2]];
        mesh
    }

    #[test]
    fn test_parse_header_basic() -> Result<(), PlyError> {
        let header_text = "ply\nformat ascii 1.0\nelement vertex 10\nproperty float x\nproperty float y\nproperty float z\nend_header\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        let header = parse_header(&mut reader)?;
        assert_eq!(header.format, PlyFormat::Ascii);
        assert_eq!(header.elements.len(), 1);
        assert_eq!(header.elements[0].name, "vertex");
        assert_eq!(header.elements[0].count, 10);
        assert_eq!(header.elements[0].properties.len(), 3);
        Ok(())
    }

    #[test]
    fn test_parse_header_face_list() -> Result<(), PlyError> {
        let header_text = "ply\nformat binary_little_endian 1.0\nelement vertex 5\nproperty float x\nproperty float y\nproperty float z\nelement face 2\nproperty list uchar uint vertex_indices\nend_header\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        let header = parse_header(&mut reader)?;
        assert_eq!(header.format, PlyFormat::BinaryLittleEndian);
        assert_eq!(header.elements.len(), 2);
        assert_eq!(header.elements[1].name, "face");
        assert!(matches!(
            header.elements[1].properties[0],
            PlyProperty::List {
                count_type: PlyDataType::UInt8,
                item_type: PlyDataType::UInt32,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_parse_header_missing_magic() {
        let mut reader = std::io::BufReader::new("not a ply\n".as_bytes());
        assert!(matches!(
            parse_header(&mut reader),
            Err(PlyError::MissingMagic)
        ));
    }

    #[test]
    fn test_parse_header_big_endian_rejected() {
        let header_text = "ply\nformat binary_big_endian 1.0\nend_header\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        assert!(matches!(
            parse_header(&mut reader),
            Err(PlyError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_ascii_roundtrip() -> Result<(), PlyError> {
        let mesh = sample_mesh();
        let file = NamedTempFile::new()?;
        write_ply(file.path(), &mesh)?;

        let loaded = read_ply(file.path())?;
        assert_eq!(loaded.vertices, mesh.vertices);
        assert_eq!(loaded.normals, mesh.normals);
        assert_eq!(loaded.colors, mesh.colors);
        assert_eq!(loaded.faces, mesh.faces);
        Ok(())
    }

    #[test]
    fn test_binary_roundtrip() -> Result<(), PlyError> {
        let mesh = sample_mesh();
        let file = NamedTempFile::new()?;
        write_ply_binary(file.path(), &mesh)?;

        let loaded = read_ply(file.path())?;
        assert_eq!(loaded.vertices, mesh.vertices);
        assert_eq!(loaded.normals, mesh.normals);
        assert_eq!(loaded.colors, mesh.colors);
        assert_eq!(loaded.faces, mesh.faces);
        Ok(())
    }

    #[test]
    fn test_ascii_roundtrip_with_texcoords() -> Result<(), PlyError> {
        let mut mesh = sample_mesh();
        mesh.texcoords = Some(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.5, 0.5]]);

        let file = NamedTempFile::new()?;
        write_ply(file.path(), &mesh)?;

        let loaded = read_ply(file.path())?;
        assert_eq!(loaded.texcoords, mesh.texcoords);
        assert_eq!(loaded.faces, mesh.faces);
        Ok(())
    }

    #[test]
    fn test_read_ascii_with_comments_and_unknown_properties() -> Result<(), PlyError> {
        let content = "\
ply
format ascii 1.0
comment exported by a scanner
obj_info scan session 7
element vertex 2
property float x
property float y
property float z
property float intensity
end_header
0 0 0 0.25
1 2 3 0.75
";
        let mut file = NamedTempFile::new()?;
        file.write_all(content.as_bytes())?;

        let mesh = read_ply(file.path())?;
        assert_eq!(mesh.vertices, vec![[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]]);
        assert!(!mesh.has_colors());
        assert!(!mesh.has_normals());
        assert!(!mesh.has_faces());
        Ok(())
    }

    #[test]
    fn test_read_non_triangle_face() -> Result<(), PlyError> {
        let content = "\
ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
element face 1
property list uchar uint vertex_indices
end_header
0 0 0
1 0 0
1 1 0
0 1 0
4 0 1 2 3
";
        let mut file = NamedTempFile::new()?;
        file.write_all(content.as_bytes())?;

        assert!(matches!(
            read_ply(file.path()),
            Err(PlyError::NonTriangleFace(4))
        ));
        Ok(())
    }

    #[test]
    fn test_read_missing_position_property() -> Result<(), PlyError> {
        let content = "\
ply
format ascii 1.0
element vertex 1
property float x
property float z
end_header
0 0
";
        let mut file = NamedTempFile::new()?;
        file.write_all(content.as_bytes())?;

        assert!(matches!(
            read_ply(file.path()),
            Err(PlyError::MissingProperty("y"))
        ));
        Ok(())
    }

    #[test]
    fn test_read_face_index_out_of_bounds() -> Result<(), PlyError> {
        let content = "\
ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar uint vertex_indices
end_header
0 0 0
1 0 0
0 1 0
3 0 1 7
";
        let mut file = NamedTempFile::new()?;
        file.write_all(content.as_bytes())?;

        assert!(matches!(
            read_ply(file.path()),
            Err(PlyError::FaceIndexOutOfBounds(7, 3))
        ));
        Ok(())
    }

    #[test]
    fn test_read_truncated_ascii_body() -> Result<(), PlyError> {
        let content = "\
ply
format ascii 1.0
element vertex 2
property float x
property float y
property float z
end_header
0 0 0
1 0
";
        let mut file = NamedTempFile::new()?;
        file.write_all(content.as_bytes())?;

        assert!(matches!(
            read_ply(file.path()),
            Err(PlyError::UnexpectedEof)
        ));
        Ok(())
    }

    #[test]
    fn test_read_truncated_binary_body() -> Result<(), PlyError> {
        let mut file = NamedTempFile::new()?;
        let header = "ply\nformat binary_little_endian 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n";
        file.write_all(header.as_bytes())?;
        // only one of the two declared vertices
        for v in [1.0f32, 2.0, 3.0] {
            file.write_all(&v.to_le_bytes())?;
        }

        assert!(matches!(read_ply(file.path()), Err(PlyError::Io(_))));
        Ok(())
    }

    #[test]
    fn test_read_binary_double_precision_vertices() -> Result<(), PlyError> {
        let mut file = NamedTempFile::new()?;
        let header = "ply\nformat binary_little_endian 1.0\nelement vertex 1\nproperty double x\nproperty double y\nproperty double z\nend_header\n";
        file.write_all(header.as_bytes())?;
        for v in [0.1f64, 0.2, 0.3] {
            file.write_all(&v.to_le_bytes())?;
        }

        let mesh = read_ply(file.path())?;
        assert_eq!(mesh.vertices, vec![[0.1, 0.2, 0.3]]);
        Ok(())
    }

    #[test]
    fn test_skips_unknown_element() -> Result<(), PlyError> {
        let content = "\
ply
format ascii 1.0
element camera 1
property float view_px
property float view_py
element vertex 1
property float x
property float y
property float z
end_header
0.5 0.5
7 8 9
";
        let mut file = NamedTempFile::new()?;
        file.write_all(content.as_bytes())?;

        let mesh = read_ply(file.path())?;
        assert_eq!(mesh.vertices, vec![[7.0, 8.0, 9.0]]);
        Ok(())
    }
}
