//! Dense NumPy `.npy` arrays.
//!
//! Masks are `|b1` arrays of shape `(M, M, M)` and fields `<f4` arrays of
//! shape `(M, M, M, 3)`, both indexed `[x, y, z(, c)]`. Writers emit
//! version 1.0 files in C order. Readers accept versions 1.0 through 3.0,
//! either memory order, `|b1`/`|u1` masks and `<f4`/`<f8` fields.

use std::io::{Read, Write};

use glam::Vec3;
use specimask_core::{Error, Lattice, Result};
use specimask_voxel::{VectorField, VoxelGrid};

const MAGIC: &[u8; 6] = b"\x93NUMPY";
/// Header (magic through padding) is padded to a multiple of this.
const HEADER_ALIGN: usize = 64;

/// Parsed array header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NpyHeader {
    pub descr: String,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

impl NpyHeader {
    fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    fn render(&self) -> String {
        let dims: Vec<String> = self.shape.iter().map(ToString::to_string).collect();
        let shape = if dims.len() == 1 {
            format!("({},)", dims[0])
        } else {
            format!("({})", dims.join(", "))
        };
        let order = if self.fortran_order { "True" } else { "False" };
        format!(
            "{{'descr': '{}', 'fortran_order': {order}, 'shape': {shape}, }}",
            self.descr
        )
    }

    /// Write magic, version 1.0 and the padded header dictionary.
    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut dict = self.render().into_bytes();
        let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
        let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
        dict.resize(dict.len() + padding, b' ');
        dict.push(b'\n');
        let len = u16::try_from(dict.len())
            .map_err(|_| Error::Serialization("npy header too long".to_string()))?;
        writer.write_all(MAGIC)?;
        writer.write_all(&[1, 0])?;
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(&dict)?;
        Ok(())
    }

    /// Read magic, version and header dictionary.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut preamble = [0u8; 8];
        reader.read_exact(&mut preamble)?;
        if &preamble[..6] != MAGIC {
            return Err(Error::InvalidData("not an npy file".to_string()));
        }
        let len = match preamble[6] {
            1 => {
                let mut bytes = [0u8; 2];
                reader.read_exact(&mut bytes)?;
                usize::from(u16::from_le_bytes(bytes))
            }
            2 | 3 => {
                let mut bytes = [0u8; 4];
                reader.read_exact(&mut bytes)?;
                u32::from_le_bytes(bytes) as usize
            }
            major => {
                return Err(Error::InvalidData(format!(
                    "unsupported npy version {major}.{}",
                    preamble[7]
                )))
            }
        };
        let mut dict = vec![0u8; len];
        reader.read_exact(&mut dict)?;
        let dict = String::from_utf8(dict)
            .map_err(|_| Error::InvalidData("npy header is not utf-8".to_string()))?;
        Self::parse(&dict)
    }

    fn parse(dict: &str) -> Result<Self> {
        let descr = value_after(dict, "descr")?;
        let descr = descr
            .strip_prefix(['\'', '"'])
            .and_then(|rest| rest.split(['\'', '"']).next())
            .ok_or_else(|| Error::InvalidData("npy header has a bad descr".to_string()))?
            .to_string();

        let order = value_after(dict, "fortran_order")?;
        let fortran_order = if order.starts_with("True") {
            true
        } else if order.starts_with("False") {
            false
        } else {
            return Err(Error::InvalidData("npy header has a bad fortran_order".to_string()));
        };

        let shape = value_after(dict, "shape")?;
        let inner = shape
            .strip_prefix('(')
            .and_then(|rest| rest.split(')').next())
            .ok_or_else(|| Error::InvalidData("npy header has a bad shape".to_string()))?;
        let shape = inner
            .split(',')
            .map(str::trim)
            .filter(|dim| !dim.is_empty())
            .map(|dim| {
                dim.trim_end_matches('L')
                    .parse::<usize>()
                    .map_err(|_| Error::InvalidData(format!("bad npy dimension {dim:?}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            descr,
            fortran_order,
            shape,
        })
    }
}

/// Text following `'key':` in a header dictionary, leading whitespace removed.
fn value_after<'a>(dict: &'a str, key: &str) -> Result<&'a str> {
    let found = dict
        .find(&format!("'{key}'"))
        .or_else(|| dict.find(&format!("\"{key}\"")))
        .ok_or_else(|| Error::InvalidData(format!("npy header lacks {key}")))?;
    let rest = &dict[found + key.len() + 2..];
    rest.trim_start()
        .strip_prefix(':')
        .map(str::trim_start)
        .ok_or_else(|| Error::InvalidData(format!("npy header has a bad {key} entry")))
}

/// Resolution of a cube array, checking the trailing dimensions.
fn cube_resolution(header: &NpyHeader, trailing: &[usize]) -> Result<u32> {
    let dims = &header.shape;
    let cube = dims.len() == 3 + trailing.len()
        && dims[0] == dims[1]
        && dims[1] == dims[2]
        && dims[3..] == *trailing;
    if !cube {
        return Err(Error::InvalidData(format!(
            "expected shape (M, M, M{}), found {:?}",
            trailing.iter().map(|d| format!(", {d}")).collect::<String>(),
            dims
        )));
    }
    u32::try_from(dims[0])
        .map_err(|_| Error::InvalidData(format!("resolution {} out of range", dims[0])))
}

/// Linear storage index (x fastest) of file element `n` of an `[x, y, z]` cube.
fn storage_index(n: usize, m: usize, fortran_order: bool) -> usize {
    if fortran_order {
        n
    } else {
        let z = n % m;
        let y = (n / m) % m;
        let x = n / (m * m);
        x + y * m + z * m * m
    }
}

fn write_f32_le<W: Write>(writer: &mut W, values: &[f32]) -> Result<()> {
    if cfg!(target_endian = "little") {
        writer.write_all(bytemuck::cast_slice(values))?;
    } else {
        for value in values {
            writer.write_all(&value.to_le_bytes())?;
        }
    }
    Ok(())
}

fn read_payload<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

/// Write a mask as a `|b1` array.
pub fn write_mask<W: Write>(mut writer: W, grid: &VoxelGrid) -> Result<()> {
    let m = grid.resolution() as usize;
    let header = NpyHeader {
        descr: "|b1".to_string(),
        fortran_order: false,
        shape: vec![m; 3],
    };
    header.write(&mut writer)?;
    let cells = grid.cells();
    let payload: Vec<u8> = (0..cells.len())
        .map(|n| u8::from(cells[storage_index(n, m, false)]))
        .collect();
    writer.write_all(&payload)?;
    writer.flush()?;
    tracing::debug!(resolution = m, "wrote npy mask");
    Ok(())
}

/// Read a mask array.
pub fn read_mask<R: Read>(mut reader: R) -> Result<VoxelGrid> {
    let header = NpyHeader::read(&mut reader)?;
    if !matches!(header.descr.as_str(), "|b1" | "|u1" | "<u1") {
        return Err(Error::InvalidData(format!(
            "unsupported mask dtype {}",
            header.descr
        )));
    }
    let resolution = cube_resolution(&header, &[])?;
    let lattice = Lattice::unit(resolution)?;
    let m = resolution as usize;
    let payload = read_payload(&mut reader, header.element_count())?;
    let mut cells = vec![false; payload.len()];
    for (n, &byte) in payload.iter().enumerate() {
        cells[storage_index(n, m, header.fortran_order)] = byte != 0;
    }
    VoxelGrid::from_cells(lattice, cells)
}

/// Write a vector field as a `<f4` array.
pub fn write_field<W: Write>(mut writer: W, field: &VectorField) -> Result<()> {
    let m = field.resolution() as usize;
    let header = NpyHeader {
        descr: "<f4".to_string(),
        fortran_order: false,
        shape: vec![m, m, m, 3],
    };
    header.write(&mut writer)?;
    let vectors = field.vectors();
    let ordered: Vec<Vec3> = (0..vectors.len())
        .map(|n| vectors[storage_index(n, m, false)])
        .collect();
    write_f32_le(&mut writer, bytemuck::cast_slice(ordered.as_slice()))?;
    writer.flush()?;
    tracing::debug!(resolution = m, "wrote npy field");
    Ok(())
}

/// Read a vector field array.
pub fn read_field<R: Read>(mut reader: R) -> Result<VectorField> {
    let header = NpyHeader::read(&mut reader)?;
    let width = match header.descr.as_str() {
        "<f4" => 4,
        "<f8" => 8,
        other => {
            return Err(Error::InvalidData(format!(
                "unsupported field dtype {other}"
            )))
        }
    };
    let resolution = cube_resolution(&header, &[3])?;
    let lattice = Lattice::unit(resolution)?;
    let m = resolution as usize;
    let voxels = lattice.len();
    let payload = read_payload(&mut reader, header.element_count() * width)?;

    let scalars: Vec<f32> = if width == 4 {
        payload
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    } else {
        payload
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32)
            .collect()
    };

    let mut vectors = vec![Vec3::ZERO; voxels];
    for (n, &value) in scalars.iter().enumerate() {
        // C order: component fastest. Fortran order: component slowest.
        let (voxel, axis) = if header.fortran_order {
            (n % voxels, n / voxels)
        } else {
            (n / 3, n % 3)
        };
        vectors[storage_index(voxel, m, header.fortran_order)][axis] = value;
    }
    VectorField::from_vectors(lattice, vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corner_mask() -> VoxelGrid {
        VoxelGrid::from_fn(Lattice::unit(3).unwrap(), |i| i.x == 2 && i.y == 0 && i.z == 1)
    }

    #[test]
    fn header_is_aligned_and_parsable() {
        let mut out = Vec::new();
        write_mask(&mut out, &corner_mask()).unwrap();
        let header_len = usize::from(u16::from_le_bytes([out[8], out[9]]));
        assert_eq!((10 + header_len) % HEADER_ALIGN, 0);
        assert_eq!(out[10 + header_len - 1], b'\n');
        assert_eq!(out.len(), 10 + header_len + 27);

        let header = NpyHeader::read(&mut out.as_slice()).unwrap();
        assert_eq!(header.descr, "|b1");
        assert!(!header.fortran_order);
        assert_eq!(header.shape, vec![3, 3, 3]);
    }

    #[test]
    fn mask_payload_is_x_major() {
        let mut out = Vec::new();
        write_mask(&mut out, &corner_mask()).unwrap();
        let payload = &out[out.len() - 27..];
        // [x=2, y=0, z=1] in C order
        let hot = 2 * 9 + 1;
        for (n, &byte) in payload.iter().enumerate() {
            assert_eq!(byte, u8::from(n == hot), "element {n}");
        }
    }

    #[test]
    fn mask_round_trip() {
        let grid = VoxelGrid::from_fn(Lattice::unit(5).unwrap(), |i| (i.x * i.y + i.z) % 2 == 1);
        let mut out = Vec::new();
        write_mask(&mut out, &grid).unwrap();
        assert_eq!(read_mask(out.as_slice()).unwrap(), grid);
    }

    #[test]
    fn fortran_mask_is_storage_order() {
        let grid = corner_mask();
        let header = NpyHeader {
            descr: "|b1".to_string(),
            fortran_order: true,
            shape: vec![3, 3, 3],
        };
        let mut out = Vec::new();
        header.write(&mut out).unwrap();
        out.extend(grid.cells().iter().map(|&c| u8::from(c)));
        assert_eq!(read_mask(out.as_slice()).unwrap(), grid);
    }

    fn sample_field() -> VectorField {
        let lattice = Lattice::unit(2).unwrap();
        let vectors = (0..lattice.len())
            .map(|i| Vec3::new(i as f32, -(i as f32) * 0.5, 0.25))
            .collect();
        VectorField::from_vectors(lattice, vectors).unwrap()
    }

    #[test]
    fn field_round_trip_is_bit_exact() {
        let field = sample_field();
        let mut out = Vec::new();
        write_field(&mut out, &field).unwrap();
        let back = read_field(out.as_slice()).unwrap();
        assert!(back.bit_eq(&field));
    }

    #[test]
    fn field_payload_layout() {
        let field = sample_field();
        let mut out = Vec::new();
        write_field(&mut out, &field).unwrap();
        let floats: Vec<f32> = out[out.len() - 8 * 3 * 4..]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        // second element in C order is [x=0, y=0, z=1], storage index 4
        assert_eq!(&floats[3..6], &[4.0, -2.0, 0.25]);
    }

    #[test]
    fn reads_fortran_f8_field() {
        let field = sample_field();
        let header = NpyHeader {
            descr: "<f8".to_string(),
            fortran_order: true,
            shape: vec![2, 2, 2, 3],
        };
        let mut out = Vec::new();
        header.write(&mut out).unwrap();
        for axis in 0..3 {
            for v in field.vectors() {
                out.extend(f64::from(v[axis]).to_le_bytes());
            }
        }
        assert!(read_field(out.as_slice()).unwrap().bit_eq(&field));
    }

    #[test]
    fn rejects_wrong_inputs() {
        assert!(matches!(
            read_mask(&b"GIF89a and more"[..]),
            Err(Error::InvalidData(_))
        ));

        let mut out = Vec::new();
        write_field(&mut out, &sample_field()).unwrap();
        assert!(matches!(read_mask(out.as_slice()), Err(Error::InvalidData(_))));

        let mut truncated = Vec::new();
        write_mask(&mut truncated, &corner_mask()).unwrap();
        truncated.truncate(truncated.len() - 1);
        assert!(matches!(read_mask(truncated.as_slice()), Err(Error::Io(_))));
    }

    #[test]
    fn parses_foreign_headers() {
        let dict = "{\"shape\": (4L, 4L, 4L), \"fortran_order\": True, \"descr\": \"|b1\"}";
        let header = NpyHeader::parse(dict).unwrap();
        assert_eq!(header.shape, vec![4, 4, 4]);
        assert!(header.fortran_order);
        assert_eq!(header.descr, "|b1");
    }
}
