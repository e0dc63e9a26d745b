// Motion primitive files and playback
//
// A primitive is a raw binary file: a flat stream of little-endian u16
// goal positions grouped in 18-value frames, already in bus ID order.
// No header, no magic, no length field; the frame count is inferred from
// the file size and a trailing partial frame is silently ignored.

use std::path::PathBuf;
use std::{fs, io, thread};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::STEP_INTERVAL;
use crate::servo::{ServoBus, ServoDriver, NUM_JOINTS};

#[derive(Debug, Error)]
pub enum PrimitiveError {
    #[error("motion primitive {0:?} not found")]
    NotFound(String),

    #[error("failed to read motion primitive {name:?}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// One prerecorded motion, loaded fully into memory before playback.
pub struct MotionPrimitive {
    pub name: String,
    pub frames: Vec<[u16; NUM_JOINTS]>,
}

/// Group a raw byte stream into full-body frames. A trailing odd byte and
/// a trailing incomplete frame are both dropped.
fn parse_frames(bytes: &[u8]) -> Vec<[u16; NUM_JOINTS]> {
    let values: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    values
        .chunks_exact(NUM_JOINTS)
        .map(|chunk| {
            let mut frame = [0u16; NUM_JOINTS];
            frame.copy_from_slice(chunk);
            frame
        })
        .collect()
}

/// Named primitive files under a fixed root directory.
pub struct PrimitiveLibrary {
    root: PathBuf,
}

impl PrimitiveLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Names of all files in the library, sorted.
    pub fn list(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Read and parse one named primitive.
    pub fn load(&self, name: &str) -> Result<MotionPrimitive, PrimitiveError> {
        let path = self.root.join(name);
        let bytes = fs::read(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                PrimitiveError::NotFound(name.to_string())
            } else {
                PrimitiveError::Io {
                    name: name.to_string(),
                    source,
                }
            }
        })?;

        Ok(MotionPrimitive {
            name: name.to_string(),
            frames: parse_frames(&bytes),
        })
    }
}

/// Replay a primitive frame by frame at a fixed cadence. An abandoned
/// frame (a servo that kept rejecting its write) is logged and playback
/// moves on to the next frame.
pub fn play<B: ServoBus>(driver: &mut ServoDriver<B>, primitive: &MotionPrimitive) {
    info!(
        "Playing primitive {:?}: {} frames",
        primitive.name,
        primitive.frames.len()
    );

    for (index, frame) in primitive.frames.iter().enumerate() {
        if let Err(e) = driver.apply_frame(frame) {
            warn!("Frame {} of {:?} abandoned: {}", index, primitive.name, e);
        }
        thread::sleep(STEP_INTERVAL);
    }
}
