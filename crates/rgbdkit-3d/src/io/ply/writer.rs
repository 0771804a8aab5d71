use std::io::{BufWriter, Write};
use std::path::Path;

use super::properties::PlyFormat;
use super::PlyError;
use crate::mesh::TriangleMesh;

fn write_header<W: Write>(
    writer: &mut W,
    mesh: &TriangleMesh,
    format: PlyFormat,
) -> Result<(), std::io::Error> {
    writeln!(writer, "ply")?;
    match format {
        PlyFormat::Ascii => writeln!(writer, "format ascii 1.0")?,
        PlyFormat::BinaryLittleEndian => writeln!(writer, "format binary_little_endian 1.0")?,
    }

    writeln!(writer, "element vertex {}", mesh.vertices.len())?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;

    if mesh.has_normals() {
        writeln!(writer, "property float nx")?;
        writeln!(writer, "property float ny")?;
        writeln!(writer, "property float nz")?;
    }

    if mesh.has_texcoords() {
        writeln!(writer, "property float s")?;
        writeln!(writer, "property float t")?;
    }

    if mesh.has_colors() {
        writeln!(writer, "property uchar red")?;
        writeln!(writer, "property uchar green")?;
        writeln!(writer, "property uchar blue")?;
    }

    if mesh.has_faces() {
        writeln!(writer, "element face {}", mesh.faces.len())?;
        writeln!(writer, "property list uchar uint vertex_indices")?;
        // wedge texture coordinates for viewers that want them per face
        if mesh.has_texcoords() {
            writeln!(writer, "property list uchar float texcoord")?;
        }
    }

    writeln!(writer, "end_header")?;
    Ok(())
}

#[inline]
fn scrub_nan(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v
    }
}

/// Write a triangle mesh to an ascii PLY file.
///
/// The header mirrors the channels the mesh actually carries. NaN normal
/// components are written as zeros. When the mesh has texture coordinates,
/// each face additionally gets a six-float wedge texcoord list with the `t`
/// coordinate flipped, which is what most mesh viewers expect.
pub fn write_ply(path: impl AsRef<Path>, mesh: &TriangleMesh) -> Result<(), PlyError> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_header(&mut writer, mesh, PlyFormat::Ascii)?;

    for (i, v) in mesh.vertices.iter().enumerate() {
        write!(writer, "{} {} {}", v[0], v[1], v[2])?;

        if let Some(normals) = &mesh.normals {
            let n = normals[i];
            write!(
                writer,
                " {} {} {}",
                scrub_nan(n[0]),
                scrub_nan(n[1]),
                scrub_nan(n[2])
            )?;
        }

        if let Some(texcoords) = &mesh.texcoords {
            let t = texcoords[i];
            write!(writer, " {} {}", t[0], t[1])?;
        }

        if let Some(colors) = &mesh.colors {
            let c = colors[i];
            write!(writer, " {} {} {}", c[0], c[1], c[2])?;
        }

        writeln!(writer)?;
    }

    for face in &mesh.faces {
        write!(writer, "3 {} {} {}", face[0], face[1], face[2])?;
        if let Some(texcoords) = &mesh.texcoords {
            writeln!(writer)?;
            write!(writer, "6")?;
            for &index in face {
                let t = texcoords[index as usize];
                write!(writer, " {} {}", t[0], 1.0 - t[1])?;
            }
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write a triangle mesh to a binary_little_endian PLY file.
///
/// Positions, normals and texture coordinates are stored as 32-bit floats,
/// colors as bytes. See [`write_ply`] for the channel layout.
pub fn write_ply_binary(path: impl AsRef<Path>, mesh: &TriangleMesh) -> Result<(), PlyError> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_header(&mut writer, mesh, PlyFormat::BinaryLittleEndian)?;

    for (i, v) in mesh.vertices.iter().enumerate() {
        for &c in v {
            writer.write_all(&(c as f32).to_le_bytes())?;
        }

        if let Some(normals) = &mesh.normals {
            for &c in &normals[i] {
                writer.write_all(&(scrub_nan(c) as f32).to_le_bytes())?;
            }
        }

        if let Some(texcoords) = &mesh.texcoords {
            for &c in &texcoords[i] {
                writer.write_all(&(c as f32).to_le_bytes())?;
            }
        }

        if let Some(colors) = &mesh.colors {
            writer.write_all(&colors[i])?;
        }
    }

    for face in &mesh.faces {
        writer.write_all(&[3u8])?;
        for &index in face {
            writer.write_all(&index.to_le_bytes())?;
        }
        if let Some(texcoords) = &mesh.texcoords {
            writer.write_all(&[6u8])?;
            for &index in face {
                let t = texcoords[index as usize];
                writer.write_all(&(t[0] as f32).to_le_bytes())?;
                writer.write_all(&((1.0 - t[1]) as f32).to_le_bytes())?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_header_minimal() -> Result<(), PlyError> {
        let mut mesh = TriangleMesh::new();
        mesh.vertices = vec![[0.0; 3]];

        let file = NamedTempFile::new()?;
        write_ply(file.path(), &mesh)?;

        let content = std::fs::read_to_string(file.path())?;
        let expected = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n";
        assert_eq!(content, expected);
        Ok(())
    }

    #[test]
    fn test_header_declares_present_channels_only() -> Result<(), PlyError> {
        let mut mesh = TriangleMesh::new();
        mesh.vertices = vec![[0.0; 3]];
        mesh.colors = Some(vec![[1, 2, 3]]);

        let file = NamedTempFile::new()?;
        write_ply(file.path(), &mesh)?;

        let content = std::fs::read_to_string(file.path())?;
        assert!(content.contains("property uchar red"));
        assert!(!content.contains("property float nx"));
        assert!(!content.contains("element face"));
        Ok(())
    }

    #[test]
    fn test_nan_normals_written_as_zero() -> Result<(), PlyError> {
        let mut mesh = TriangleMesh::new();
        mesh.vertices = vec![[1.0, 2.0, 3.0]];
        mesh.normals = Some(vec![[f64::NAN, 1.0, f64::NAN]]);

        let file = NamedTempFile::new()?;
        write_ply(file.path(), &mesh)?;

        let content = std::fs::read_to_string(file.path())?;
        assert!(content.ends_with("1 2 3 0 1 0\n"));
        Ok(())
    }

    #[test]
    fn test_face_wedge_texcoords_flip_t() -> Result<(), PlyError> {
        let mut mesh = TriangleMesh::new();
        mesh.vertices = vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        mesh.texcoords = Some(vec![[0.0, 0.25], [1.0, 0.25], [0.0, 1.0]]);
        mesh.faces = vec![[0, 1, 2]];

        let file = NamedTempFile::new()?;
        write_ply(file.path(), &mesh)?;

        let content = std::fs::read_to_string(file.path())?;
        assert!(content.contains("property list uchar float texcoord"));
        assert!(content.contains("3 0 1 2\n6 0 0.75 1 0.75 0 0\n"));
        Ok(())
    }
}
