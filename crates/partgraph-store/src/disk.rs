//! On-disk cache of boxes and instance artifacts.
//!
//! Layout under the cache root:
//!
//! - `boxes/<part>.json`: corners, transform and half-extents of one part's box.
//! - `graphs/<instance>.pgraph`: the instance artifact in a little-endian
//!   binary container (magic `PGRAPH01`, length-prefixed JSON id mapping,
//!   `n`, then the distance and directional matrices row-major as `f64`).
//!
//! Every write lands in a temp file in the target directory, is synced, then
//! renamed over the target, so readers see either the old or the new record.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::{DMatrix, Matrix4};
use partgraph_adjacency::{Artifact, ArtifactStore, IdMapping, InstanceId, PartId, StoreError};
use partgraph_bbox::{BoundingBox, BOX_CORNERS};
use partgraph_math::{Point3, Transform, Vec3};
use serde::{Deserialize, Serialize};

const GRAPH_MAGIC: &[u8; 8] = b"PGRAPH01";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Serialized box: plain arrays, transform row-major.
#[derive(Debug, Serialize, Deserialize)]
struct BoxRecord {
    corners: Vec<[f64; 3]>,
    transform: [[f64; 4]; 4],
    half_extents: [f64; 3],
}

impl BoxRecord {
    fn from_box(bbox: &BoundingBox) -> Self {
        let m = &bbox.transform().matrix;
        Self {
            corners: bbox.corners().iter().map(|p| [p.x, p.y, p.z]).collect(),
            transform: std::array::from_fn(|r| std::array::from_fn(|c| m[(r, c)])),
            half_extents: [bbox.half_extents().x, bbox.half_extents().y, bbox.half_extents().z],
        }
    }

    fn into_box(self) -> Result<BoundingBox, StoreError> {
        if self.corners.len() != BOX_CORNERS {
            return Err(StoreError::Corrupt(format!(
                "box record has {} corners",
                self.corners.len()
            )));
        }
        let corners: [Point3; BOX_CORNERS] = std::array::from_fn(|i| {
            let [x, y, z] = self.corners[i];
            Point3::new(x, y, z)
        });
        let matrix = Matrix4::from_fn(|r, c| self.transform[r][c]);
        let [hx, hy, hz] = self.half_extents;
        Ok(BoundingBox::from_parts(corners, Transform { matrix }, Vec3::new(hx, hy, hz)))
    }
}

/// Filesystem [`ArtifactStore`].
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Use (and create if needed) the cache directory `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join("boxes"))?;
        fs::create_dir_all(root.join("graphs"))?;
        Ok(Self { root })
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn box_path(&self, part: PartId) -> PathBuf {
        self.root.join("boxes").join(format!("{part}.json"))
    }

    fn graph_path(&self, instance: InstanceId) -> PathBuf {
        self.root.join("graphs").join(format!("{instance}.pgraph"))
    }
}

/// Read a file, mapping "not found" to `None`.
fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write `bytes` to `path` through a synced temp file and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dir.join(format!(
        ".{name}.{}.{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = (|| {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn encode_artifact(artifact: &Artifact) -> Result<Vec<u8>, StoreError> {
    let mapping = serde_json::to_vec(artifact.mapping())
        .map_err(|e| StoreError::Corrupt(format!("cannot encode id mapping: {e}")))?;
    let n = artifact.len();

    let mut data = Vec::with_capacity(8 + 8 + mapping.len() + 8 + 2 * 8 * n * n);
    data.extend_from_slice(GRAPH_MAGIC);
    data.extend_from_slice(&(mapping.len() as u64).to_le_bytes());
    data.extend_from_slice(&mapping);
    data.extend_from_slice(&(n as u64).to_le_bytes());
    for m in [artifact.distances(), artifact.directional()] {
        for r in 0..n {
            for c in 0..n {
                data.extend_from_slice(&m[(r, c)].to_le_bytes());
            }
        }
    }
    Ok(data)
}

/// Cursor over a graph record.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], StoreError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| StoreError::Corrupt("graph record is truncated".into()))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u64(&mut self) -> Result<u64, StoreError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn f64(&mut self) -> Result<f64, StoreError> {
        Ok(f64::from_bits(self.u64()?))
    }

    fn len(&mut self) -> Result<usize, StoreError> {
        usize::try_from(self.u64()?).map_err(|_| StoreError::Corrupt("length does not fit in memory".into()))
    }
}

fn decode_artifact(data: &[u8]) -> Result<Artifact, StoreError> {
    let mut reader = Reader { data, pos: 0 };
    if reader.take(GRAPH_MAGIC.len())? != GRAPH_MAGIC {
        return Err(StoreError::Corrupt("not a graph record".into()));
    }
    let mapping_len = reader.len()?;
    let mapping: IdMapping = serde_json::from_slice(reader.take(mapping_len)?)
        .map_err(|e| StoreError::Corrupt(format!("id mapping: {e}")))?;

    let n = reader.len()?;
    let cells = n
        .checked_mul(n)
        .filter(|cells| cells.checked_mul(16) == Some(data.len() - reader.pos))
        .ok_or_else(|| StoreError::Corrupt(format!("matrix size {n} does not match record length")))?;

    let mut read_matrix = || -> Result<DMatrix<f64>, StoreError> {
        let mut values = Vec::with_capacity(cells);
        for _ in 0..cells {
            values.push(reader.f64()?);
        }
        Ok(DMatrix::from_row_slice(n, n, &values))
    };
    let distances = read_matrix()?;
    let directional = read_matrix()?;

    Artifact::new(mapping, distances, directional).map_err(|e| StoreError::Corrupt(e.to_string()))
}

impl ArtifactStore for DiskCache {
    fn load_box(&self, part: PartId) -> Result<Option<BoundingBox>, StoreError> {
        let Some(bytes) = read_optional(&self.box_path(part))? else {
            return Ok(None);
        };
        let record: BoxRecord = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("box of part {part}: {e}")))?;
        record.into_box().map(Some)
    }

    fn store_box(&self, part: PartId, bbox: &BoundingBox) -> Result<(), StoreError> {
        let json = serde_json::to_vec(&BoxRecord::from_box(bbox))
            .map_err(|e| StoreError::Corrupt(format!("cannot encode box of part {part}: {e}")))?;
        write_atomic(&self.box_path(part), &json)?;
        Ok(())
    }

    fn load_artifact(&self, instance: InstanceId) -> Result<Option<Artifact>, StoreError> {
        match read_optional(&self.graph_path(instance))? {
            Some(bytes) => decode_artifact(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn store_artifact(&self, instance: InstanceId, artifact: &Artifact) -> Result<(), StoreError> {
        write_atomic(&self.graph_path(instance), &encode_artifact(artifact)?)?;
        log::debug!("instance {instance}: artifact written to {}", self.graph_path(instance).display());
        Ok(())
    }

    fn invalidate(&self, instance: InstanceId) -> Result<(), StoreError> {
        match fs::remove_file(self.graph_path(instance)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
