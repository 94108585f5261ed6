//! Persistence for specimask occupancy grids and vector fields.
//!
//! Two representations are supported:
//! - [`text`]: whitespace-separated token grids, one z-slice per block
//! - [`npy`]: dense NumPy arrays indexed `[x, y, z]`
//!
//! The path helpers pick the representation from the file extension.

pub mod npy;
pub mod text;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use specimask_core::Result;
use specimask_voxel::{VectorField, VoxelGrid};
use tracing::info;

/// On-disk representation of a grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GridFormat {
    /// Text token grid.
    #[default]
    Text,
    /// NumPy `.npy` array.
    Npy,
}

impl GridFormat {
    /// `.npy` (any case) selects [`GridFormat::Npy`], anything else text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("npy") => Self::Npy,
            _ => Self::Text,
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Npy => "npy",
        }
    }
}

/// Paths of the three per-component text files for a field saved at `path`.
///
/// `out/field.txt` becomes `out/field_x.txt`, `out/field_y.txt` and
/// `out/field_z.txt`.
pub fn component_paths(path: &Path) -> [PathBuf; 3] {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    ["x", "y", "z"].map(|axis| {
        let name = match &ext {
            Some(ext) => format!("{stem}_{axis}.{ext}"),
            None => format!("{stem}_{axis}"),
        };
        path.with_file_name(name)
    })
}

/// Save a mask in the format implied by `path`.
pub fn save_mask(path: impl AsRef<Path>, grid: &VoxelGrid) -> Result<()> {
    let path = path.as_ref();
    let writer = BufWriter::new(File::create(path)?);
    let format = GridFormat::from_path(path);
    match format {
        GridFormat::Text => text::write_mask(writer, grid)?,
        GridFormat::Npy => npy::write_mask(writer, grid)?,
    }
    info!(path = %path.display(), ?format, resolution = grid.resolution(), "saved mask");
    Ok(())
}

/// Load a mask in the format implied by `path`.
pub fn load_mask(path: impl AsRef<Path>) -> Result<VoxelGrid> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    match GridFormat::from_path(path) {
        GridFormat::Text => text::read_mask(reader),
        GridFormat::Npy => npy::read_mask(reader),
    }
}

/// Save a field in the format implied by `path` and return the files written.
///
/// Text fields are split into the three files of [`component_paths`].
pub fn save_field(path: impl AsRef<Path>, field: &VectorField) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    let written = match GridFormat::from_path(path) {
        GridFormat::Npy => {
            npy::write_field(BufWriter::new(File::create(path)?), field)?;
            vec![path.to_path_buf()]
        }
        GridFormat::Text => {
            let paths = component_paths(path);
            for (axis, component) in paths.iter().enumerate() {
                text::write_field_component(BufWriter::new(File::create(component)?), field, axis)?;
            }
            paths.to_vec()
        }
    };
    info!(files = written.len(), resolution = field.resolution(), "saved vector field");
    Ok(written)
}

/// Load a field saved by [`save_field`] at the same `path`.
pub fn load_field(path: impl AsRef<Path>) -> Result<VectorField> {
    let path = path.as_ref();
    match GridFormat::from_path(path) {
        GridFormat::Npy => npy::read_field(BufReader::new(File::open(path)?)),
        GridFormat::Text => {
            let [x, y, z] = component_paths(path);
            text::read_field_components(
                BufReader::new(File::open(x)?),
                BufReader::new(File::open(y)?),
                BufReader::new(File::open(z)?),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use specimask_core::Lattice;

    /// Fresh directory under the system temp dir, removed on drop.
    struct ScratchDir(PathBuf);

    impl ScratchDir {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir()
                .join(format!("specimask-io-{name}-{}", std::process::id()));
            std::fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }
    }

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn format_detection() {
        assert_eq!(GridFormat::from_path(Path::new("a/mask.npy")), GridFormat::Npy);
        assert_eq!(GridFormat::from_path(Path::new("MASK.NPY")), GridFormat::Npy);
        assert_eq!(GridFormat::from_path(Path::new("mask.txt")), GridFormat::Text);
        assert_eq!(GridFormat::from_path(Path::new("mask")), GridFormat::Text);
    }

    #[test]
    fn component_file_names() {
        let [x, y, z] = component_paths(Path::new("out/field.txt"));
        assert_eq!(x, Path::new("out/field_x.txt"));
        assert_eq!(y, Path::new("out/field_y.txt"));
        assert_eq!(z, Path::new("out/field_z.txt"));
        assert_eq!(component_paths(Path::new("field"))[1], Path::new("field_y"));
    }

    #[test]
    fn mask_files_round_trip() {
        let scratch = ScratchDir::new("mask");
        let grid = VoxelGrid::from_fn(Lattice::unit(6).unwrap(), |i| i.x <= i.y && i.z % 2 == 0);
        for name in ["mask.txt", "mask.npy"] {
            let path = scratch.0.join(name);
            save_mask(&path, &grid).unwrap();
            assert_eq!(load_mask(&path).unwrap(), grid, "{name}");
        }
    }

    #[test]
    fn field_files_round_trip() {
        let scratch = ScratchDir::new("field");
        let lattice = Lattice::unit(3).unwrap();
        let vectors = (0..lattice.len())
            .map(|i| Vec3::new(0.1 * i as f32, 1.0, -0.3).normalize())
            .collect();
        let field = VectorField::from_vectors(lattice, vectors).unwrap();

        let written = save_field(scratch.0.join("field.txt"), &field).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|p| p.exists()));
        assert!(load_field(scratch.0.join("field.txt")).unwrap().bit_eq(&field));

        let written = save_field(scratch.0.join("field.npy"), &field).unwrap();
        assert_eq!(written, vec![scratch.0.join("field.npy")]);
        assert!(load_field(scratch.0.join("field.npy")).unwrap().bit_eq(&field));
    }

    #[test]
    fn missing_file_is_io_error() {
        let scratch = ScratchDir::new("missing");
        assert!(matches!(
            load_mask(scratch.0.join("absent.npy")),
            Err(specimask_core::Error::Io(_))
        ));
    }
}
