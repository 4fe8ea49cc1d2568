//! Blockchain persistence layer
//!
//! Saves the chain as pretty-printed JSON (`{"blocks": [...]}`) and loads
//! it back, re-checking every prev-link on the way in.

use crate::core::Blockchain;
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub blockchain_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".ledger_data"),
            blockchain_file: "blockchain.json".to_string(),
        }
    }
}

/// Blockchain storage manager
#[derive(Debug)]
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    /// Get the blockchain file path
    pub fn blockchain_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.blockchain_file)
    }

    /// Save the blockchain to disk via a temp file and rename
    pub fn save(&self, blockchain: &Blockchain) -> Result<(), StorageError> {
        let path = self.blockchain_path();
        let temp_path = self
            .config
            .data_dir
            .join(format!("{}.tmp", self.config.blockchain_file));

        save_to_file(blockchain, &temp_path)?;
        fs::rename(&temp_path, &path)?;

        Ok(())
    }

    /// Load the blockchain from disk
    pub fn load(&self) -> Result<Blockchain, StorageError> {
        let path = self.blockchain_path();

        if !path.exists() {
            return Err(StorageError::InvalidData(format!(
                "Blockchain file not found: {}",
                path.display()
            )));
        }

        load_from_file(&path)
    }

    /// Check if a saved blockchain exists
    pub fn exists(&self) -> bool {
        self.blockchain_path().exists()
    }
}

/// Save blockchain to a specific file path
pub fn save_to_file(blockchain: &Blockchain, path: &Path) -> Result<(), StorageError> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, blockchain)?;
    writer.flush()?;
    Ok(())
}

/// Load blockchain from a specific file path
pub fn load_from_file(path: &Path) -> Result<Blockchain, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}
