//! Whitespace-separated text grids.
//!
//! One token per voxel. Each row holds the M voxels of one `y` along `x`,
//! each z-slice is M rows followed by a blank line:
//!
//! ```text
//! 0 1
//! 0 0
//!
//! 1 1
//! 0 1
//!
//! ```
//!
//! Masks use `0`/`1`. Vector fields are written either as one file per
//! component or as a single file of `x,y,z` tuples. Floats use the shortest
//! representation that parses back to the same value, so the format is
//! lossless. Text carries no domain; readers return grids on the unit domain.

use std::io::{self, Read, Write};

use glam::Vec3;
use specimask_core::{Error, Lattice, Result};
use specimask_voxel::{VectorField, VoxelGrid};

/// Write `lattice.len()` tokens in storage order, formatting each with `token`.
fn write_tokens<W, F>(writer: &mut W, lattice: &Lattice, mut token: F) -> io::Result<()>
where
    W: Write,
    F: FnMut(&mut W, usize) -> io::Result<()>,
{
    let m = lattice.resolution() as usize;
    let mut index = 0;
    for _z in 0..m {
        for _y in 0..m {
            for x in 0..m {
                token(writer, index)?;
                index += 1;
                if x + 1 < m {
                    writer.write_all(b" ")?;
                }
            }
            writer.write_all(b"\n")?;
        }
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Split a text grid into tokens in storage order and infer its resolution.
fn parse_tokens<T>(text: &str, mut parse: impl FnMut(&str) -> Option<T>) -> Result<(u32, Vec<T>)> {
    let mut slices: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                slices.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        slices.push(current);
    }

    let m = slices
        .first()
        .and_then(|rows| rows.first())
        .map(|row| row.split_ascii_whitespace().count())
        .ok_or_else(|| Error::InvalidData("text grid is empty".to_string()))?;
    if slices.len() != m {
        return Err(Error::InvalidData(format!(
            "expected {m} slices for a {m}-wide row, found {}",
            slices.len()
        )));
    }

    let mut values = Vec::with_capacity(m * m * m);
    for (z, rows) in slices.iter().enumerate() {
        if rows.len() != m {
            return Err(Error::InvalidData(format!(
                "slice {z} has {} rows, expected {m}",
                rows.len()
            )));
        }
        for (y, row) in rows.iter().enumerate() {
            let start = values.len();
            for token in row.split_ascii_whitespace() {
                let value = parse(token).ok_or_else(|| {
                    Error::InvalidData(format!("bad token {token:?} in slice {z}, row {y}"))
                })?;
                values.push(value);
            }
            if values.len() - start != m {
                return Err(Error::InvalidData(format!(
                    "slice {z}, row {y} has {} tokens, expected {m}",
                    values.len() - start
                )));
            }
        }
    }

    let resolution = u32::try_from(m)
        .map_err(|_| Error::InvalidData(format!("resolution {m} out of range")))?;
    Ok((resolution, values))
}

fn read_string<R: Read>(mut reader: R) -> Result<String> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

fn parse_bit(token: &str) -> Option<bool> {
    match token {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

fn parse_tuple(token: &str) -> Option<Vec3> {
    let mut parts = token.split(',');
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Vec3::new(x, y, z))
}

/// Write a mask as `0`/`1` tokens.
pub fn write_mask<W: Write>(mut writer: W, grid: &VoxelGrid) -> Result<()> {
    let cells = grid.cells();
    write_tokens(&mut writer, grid.lattice(), |w, i| {
        w.write_all(if cells[i] { b"1" } else { b"0" })
    })?;
    writer.flush()?;
    Ok(())
}

/// Parse a mask written by [`write_mask`].
pub fn read_mask<R: Read>(reader: R) -> Result<VoxelGrid> {
    let text = read_string(reader)?;
    let (resolution, cells) = parse_tokens(&text, parse_bit)?;
    VoxelGrid::from_cells(Lattice::unit(resolution)?, cells)
}

/// Write one component (`0` = x, `1` = y, `2` = z) of a vector field.
pub fn write_field_component<W: Write>(
    mut writer: W,
    field: &VectorField,
    axis: usize,
) -> Result<()> {
    if axis > 2 {
        return Err(Error::InvalidConfig(format!("component axis {axis} out of range")));
    }
    let vectors = field.vectors();
    write_tokens(&mut writer, field.lattice(), |w, i| write!(w, "{}", vectors[i][axis]))?;
    writer.flush()?;
    Ok(())
}

/// Reassemble a field from its three component grids.
pub fn read_field_components<R: Read>(x: R, y: R, z: R) -> Result<VectorField> {
    let mut components = Vec::with_capacity(3);
    for reader in [x, y, z] {
        let text = read_string(reader)?;
        components.push(parse_tokens(&text, |t| t.parse::<f32>().ok())?);
    }
    let resolution = components[0].0;
    if components.iter().any(|(m, _)| *m != resolution) {
        return Err(Error::InvalidData(
            "field components have different resolutions".to_string(),
        ));
    }
    let vectors = (0..components[0].1.len())
        .map(|i| Vec3::new(components[0].1[i], components[1].1[i], components[2].1[i]))
        .collect();
    VectorField::from_vectors(Lattice::unit(resolution)?, vectors)
}

/// Write a field as one file of `x,y,z` tuples.
pub fn write_field_tuples<W: Write>(mut writer: W, field: &VectorField) -> Result<()> {
    let vectors = field.vectors();
    write_tokens(&mut writer, field.lattice(), |w, i| {
        let v = vectors[i];
        write!(w, "{},{},{}", v.x, v.y, v.z)
    })?;
    writer.flush()?;
    Ok(())
}

/// Parse a field written by [`write_field_tuples`].
pub fn read_field_tuples<R: Read>(reader: R) -> Result<VectorField> {
    let text = read_string(reader)?;
    let (resolution, vectors) = parse_tokens(&text, parse_tuple)?;
    VectorField::from_vectors(Lattice::unit(resolution)?, vectors)
}
