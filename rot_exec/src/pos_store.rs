//! # Position Store
//!
//! Durable record of the last commanded orientation, so that the dead-reckoned position survives
//! a restart of the executable.
//!
//! The record is a versioned JSON object:
//!
//! ```json
//! {"version":1,"azimuth_deg":123.4,"elevation_deg":-5.0}
//! ```
//!
//! Saves go through a sibling temporary file which is renamed over the record, so a reader only
//! ever sees a complete old record or a complete new one.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::orientation::Orientation;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Version of the record format written by this store.
pub const RECORD_VERSION: u32 = 1;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// File backed store for the rotator orientation.
#[derive(Debug, Clone)]
pub struct PositionStore {
    path: PathBuf,
}

/// The on-disk record.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PersistedState {
    version: u32,
    azimuth_deg: f64,
    elevation_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors reading or writing the position record.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Position record I/O failed on {0:?}: {1}")]
    Io(PathBuf, io::Error),

    #[error("Position record is malformed: {0}")]
    Malformed(serde_json::Error),

    #[error("Position record has version {0}, expected {}", RECORD_VERSION)]
    UnsupportedVersion(u32),

    #[error("Position record holds a non-finite angle ({0}, {1})")]
    NonFinite(f64, f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PositionStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored orientation.
    ///
    /// A missing record is created at (0, 0). A record which cannot be read or parsed is logged
    /// and (0, 0) is returned instead, without touching the file.
    pub fn load(&self) -> Orientation {
        match self.try_load() {
            Ok(Some(o)) => {
                debug!("Loaded orientation {:?} from {:?}", o, self.path);
                o
            }
            Ok(None) => {
                let o = Orientation::default();
                info!("No position record at {:?}, starting from {:?}", self.path, o);
                if let Err(e) = self.save(&o) {
                    warn!("Could not create the position record: {}", e);
                }
                o
            }
            Err(e) => {
                warn!("{}, falling back to the zero orientation", e);
                Orientation::default()
            }
        }
    }

    /// Load the stored orientation, returning `None` if there is no record yet.
    pub fn try_load(&self) -> Result<Option<Orientation>, PersistenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PersistenceError::Io(self.path.clone(), e)),
        };

        let record: PersistedState = serde_json::from_str(&contents)
            .map_err(PersistenceError::Malformed)?;

        if record.version != RECORD_VERSION {
            return Err(PersistenceError::UnsupportedVersion(record.version));
        }

        check_finite(record.azimuth_deg, record.elevation_deg)?;

        Ok(Some(Orientation::new(record.azimuth_deg, record.elevation_deg)))
    }

    /// Replace the stored orientation.
    pub fn save(&self, orientation: &Orientation) -> Result<(), PersistenceError> {
        check_finite(orientation.azimuth_deg, orientation.elevation_deg)?;

        let record = PersistedState {
            version: RECORD_VERSION,
            azimuth_deg: orientation.azimuth_deg,
            elevation_deg: orientation.elevation_deg,
        };

        // Serialising plain numbers cannot fail
        let mut contents = serde_json::to_string(&record).map_err(PersistenceError::Malformed)?;
        contents.push('\n');

        let io_err = |e| PersistenceError::Io(self.path.clone(), e);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let tmp_path = self.tmp_path();
        let result = write_synced(&tmp_path, contents.as_bytes())
            .and_then(|_| fs::rename(&tmp_path, &self.path));

        if let Err(e) = result {
            // Never leave a partial record behind
            if let Err(rm_err) = fs::remove_file(&tmp_path) {
                if rm_err.kind() != io::ErrorKind::NotFound {
                    warn!("Could not remove {:?}: {}", tmp_path, rm_err);
                }
            }
            return Err(io_err(e));
        }

        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut p = self.path.clone().into_os_string();
        p.push(".tmp");
        PathBuf::from(p)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

fn check_finite(az: f64, el: f64) -> Result<(), PersistenceError> {
    if az.is_finite() && el.is_finite() {
        Ok(())
    }
    else {
        Err(PersistenceError::NonFinite(az, el))
    }
}
