//! Saving and loading run snapshots.
//!
//! Snapshots are pretty JSON. A path ending in `.gz` is gzip-compressed.
//! Writes land in a sibling `.tmp` file first and are renamed into place.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use cooprings_data::SystemSnapshot;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{IoError, Result};

fn is_compressed(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

pub fn save_snapshot<P: AsRef<Path>>(snapshot: &SystemSnapshot, path: P) -> Result<()> {
    let path = path.as_ref();
    let tmp = tmp_path(path);
    let context = || format!("saving snapshot to {:?}", path);
    {
        let file = File::create(&tmp).map_err(|e| IoError::from(e).with_context(context()))?;
        let writer = BufWriter::new(file);
        if is_compressed(path) {
            let mut encoder = GzEncoder::new(writer, Compression::default());
            serde_json::to_writer_pretty(&mut encoder, snapshot)?;
            encoder
                .finish()
                .map_err(|e| IoError::compression(e.to_string()).with_context(context()))?
                .flush()?;
        } else {
            let mut writer = writer;
            serde_json::to_writer_pretty(&mut writer, snapshot)?;
            writer.flush()?;
        }
    }
    std::fs::rename(&tmp, path).map_err(|e| IoError::from(e).with_context(context()))?;
    tracing::info!(
        path = %path.display(),
        coins = snapshot.coins.len(),
        fractals = snapshot.fractals.len(),
        "Snapshot saved"
    );
    Ok(())
}

/// Loads a snapshot and checks it is internally consistent.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<SystemSnapshot> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::not_found(path.display().to_string()));
    }
    let context = || format!("loading snapshot from {:?}", path);
    let file = File::open(path).map_err(|e| IoError::from(e).with_context(context()))?;
    let mut reader = BufReader::new(file);

    let mut raw = Vec::new();
    if is_compressed(path) {
        GzDecoder::new(reader)
            .read_to_end(&mut raw)
            .map_err(|e| IoError::compression(e.to_string()).with_context(context()))?;
    } else {
        reader.read_to_end(&mut raw)?;
    }

    let snapshot: SystemSnapshot =
        serde_json::from_slice(&raw).map_err(|e| IoError::from(e).with_context(context()))?;
    snapshot
        .check_invariants()
        .map_err(|e| IoError::validation(e.to_string()).with_context(context()))?;
    Ok(snapshot)
}
