// src/dataset/mod.rs
//
// Reads processed artifacts back and flattens them into one record per
// filing, the shape the modelling side expects.

use crate::extractors::SectionKind;
use crate::storage::{FilingId, StorageManager};
use crate::utils::error::StorageError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub filing_id: String,
    pub ticker: String,
    pub year: u32,
    pub item1: String,
    pub item1a: String,
    pub item7: String,
    pub has_item1: bool,
    pub has_item1a: bool,
    pub has_item7: bool,
}

pub struct DatasetBuilder {
    processed: StorageManager,
}

impl DatasetBuilder {
    pub fn new(processed: StorageManager) -> Self {
        Self { processed }
    }

    fn record_for(path: &Path) -> Result<DatasetRecord, StorageError> {
        let id = FilingId::from_path(path)?;
        let doc = StorageManager::load_processed(path)?;
        let field = |kind| doc.section(kind).unwrap_or_default().to_string();

        Ok(DatasetRecord {
            filing_id: id.stem(),
            ticker: id.ticker.clone(),
            year: id.year,
            item1: field(SectionKind::Business),
            item1a: field(SectionKind::RiskFactors),
            item7: field(SectionKind::Mda),
            has_item1: doc.is_present(SectionKind::Business),
            has_item1a: doc.is_present(SectionKind::RiskFactors),
            has_item7: doc.is_present(SectionKind::Mda),
        })
    }

    /// One record per readable artifact, in file name order.
    /// Files that fail to parse are logged and left out.
    pub fn build(&self) -> Result<Vec<DatasetRecord>, StorageError> {
        let mut records = Vec::new();
        for path in self.processed.list_filings()? {
            match Self::record_for(&path) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(records)
    }

    /// Builds the dataset and writes it as a JSON array.
    pub fn save(&self, output: &Path) -> Result<(PathBuf, usize), StorageError> {
        let records = self.build()?;
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&records)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(output, json)?;
        tracing::info!("Dataset with {} records saved to {}", records.len(), output.display());
        Ok((output.to_path_buf(), records.len()))
    }
}
