//! Snapshot files.
//!
//! A snapshot is written as `<dir>/<index name>.pidx`:
//!
//! ```text
//! magic "PIDX" | version u16 | crc32 u32 | payload length u64 | payload
//! ```
//!
//! All integers are little endian. The payload is the JSON encoding of the
//! index definition followed by every committed row, values in their
//! canonical string form. Files are replaced atomically by writing a sibling
//! temporary file and renaming it over the old one.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::value::{TypeSystem, Value};

use super::definition::IndexDefinition;
use super::staging::Change;
use super::store::Snapshot;
use super::NodeKey;

const MAGIC: &[u8; 4] = b"PIDX";
const VERSION: u16 = 1;
const HEADER_LEN: usize = 4 + 2 + 4 + 8;

/// File extension of snapshot files.
pub const SNAPSHOT_EXTENSION: &str = "pidx";

#[derive(Serialize, Deserialize)]
struct SnapshotRecord {
    definition: IndexDefinition,
    rows: Vec<RowRecord>,
}

#[derive(Serialize, Deserialize)]
struct RowRecord {
    key: NodeKey,
    properties: Vec<PropertyRecord>,
}

#[derive(Serialize, Deserialize)]
struct PropertyRecord {
    name: String,
    values: Vec<String>,
}

/// Location and durability policy of one index's snapshot.
#[derive(Clone, Debug)]
pub(crate) struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub(crate) fn new(directory: &Path, index_name: &str) -> Self {
        Self {
            path: directory.join(format!("{index_name}.{SNAPSHOT_EXTENSION}")),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Writes `snapshot`, returning the payload size in bytes.
    pub(crate) fn write(
        &self,
        definition: &IndexDefinition,
        snapshot: &Snapshot,
        sync: bool,
    ) -> Result<usize> {
        let record = SnapshotRecord {
            definition: definition.clone(),
            rows: snapshot
                .rows_after(None)
                .map(|(key, row)| RowRecord {
                    key: key.clone(),
                    properties: row
                        .properties()
                        .into_iter()
                        .map(|(name, values)| PropertyRecord {
                            name: name.to_owned(),
                            values: values.iter().map(Value::to_canonical_string).collect(),
                        })
                        .collect(),
                })
                .collect(),
        };
        let payload = serde_json::to_vec(&record)?;

        let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
        frame.extend_from_slice(MAGIC);
        frame.extend_from_slice(&VERSION.to_le_bytes());
        frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        frame.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        frame.extend_from_slice(&payload);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension(format!("{SNAPSHOT_EXTENSION}.tmp"));
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)?;
            file.write_all(&frame)?;
            if sync {
                file.sync_all()?;
            }
        }
        fs::rename(&tmp, &self.path)?;
        if sync {
            sync_parent(&self.path)?;
        }
        Ok(payload.len())
    }

    /// Reads the stored definition and rebuilds the snapshot, or `None` when
    /// no file exists.
    pub(crate) fn read(&self, types: &TypeSystem) -> Result<Option<(IndexDefinition, Snapshot)>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let payload = unframe(&bytes, &self.path)?;
        let record: SnapshotRecord = serde_json::from_slice(payload)?;

        let definition = record.definition;
        let mut snapshot = Snapshot::empty(&definition);
        for row in record.rows {
            for property in row.properties {
                let column = definition.column(&property.name).ok_or_else(|| {
                    IndexError::Corruption(format!(
                        "{} stores undeclared property '{}'",
                        self.path.display(),
                        property.name
                    ))
                })?;
                let factory = types.factory(column.property_type());
                let values = property
                    .values
                    .iter()
                    .map(|text| factory.from_canonical(text))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                snapshot.apply(Change::set(row.key.clone(), property.name, values));
            }
        }
        Ok(Some((definition, snapshot)))
    }

}

fn unframe<'b>(bytes: &'b [u8], path: &Path) -> Result<&'b [u8]> {
    let corrupt = |what: &str| IndexError::Corruption(format!("{}: {what}", path.display()));
    if bytes.len() < HEADER_LEN {
        return Err(corrupt("truncated header"));
    }
    let (header, payload) = bytes.split_at(HEADER_LEN);
    if &header[0..4] != MAGIC {
        return Err(corrupt("bad magic"));
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != VERSION {
        return Err(corrupt(&format!("unsupported version {version}")));
    }
    let crc = u32::from_le_bytes([header[6], header[7], header[8], header[9]]);
    let mut len = [0u8; 8];
    len.copy_from_slice(&header[10..18]);
    if u64::from_le_bytes(len) != payload.len() as u64 {
        return Err(corrupt("payload length mismatch"));
    }
    if crc32fast::hash(payload) != crc {
        return Err(corrupt("checksum mismatch"));
    }
    Ok(payload)
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> Result<()> {
    Ok(())
}
