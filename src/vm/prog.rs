use std::{
    fmt::{self, Display, Formatter},
    fs, io,
    path::Path,
};

use super::interp::{MEMORY_SIZE, PROGRAM_STARTING_ADDRESS};

/// Bytes available for a program image behind the reserved interpreter area.
pub const PROGRAM_MAX_SIZE: usize = MEMORY_SIZE - PROGRAM_STARTING_ADDRESS as usize;

#[derive(Debug)]
pub enum LoadError {
    Io(io::Error),
    Oversize { size: usize, max: usize },
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "failed to read program: {}", e),
            LoadError::Oversize { size, max } => {
                write!(f, "program is {} bytes but at most {} fit in memory", size, max)
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Oversize { .. } => None,
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(e: io::Error) -> Self {
        LoadError::Io(e)
    }
}

/// A program image read from disk, validated to fit in interpreter memory.
#[derive(Debug, Clone)]
pub struct Program {
    pub name: String,
    pub data: Vec<u8>,
}

impl Program {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Program, LoadError> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        if data.len() > PROGRAM_MAX_SIZE {
            return Err(LoadError::Oversize {
                size: data.len(),
                max: PROGRAM_MAX_SIZE,
            });
        }

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "program".into());

        log::info!("read {} ({} bytes)", name, data.len());
        Ok(Program { name, data })
    }
}
