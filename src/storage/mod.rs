// src/storage/mod.rs
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use crate::extractors::{ProcessedDocument, SectionExtractor, SectionKind};
use crate::utils::error::StorageError;

/// Ticker and filing year, carried in file names as `TICKER_10K_YEAR.txt`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilingId {
    pub ticker: String,
    pub year: u32,
}

impl FilingId {
    pub fn new(ticker: &str, year: u32) -> Self {
        Self { ticker: ticker.to_uppercase(), year }
    }

    pub fn stem(&self) -> String {
        format!("{}_10K_{}", self.ticker, self.year)
    }

    pub fn file_name(&self) -> String {
        format!("{}.txt", self.stem())
    }

    /// Parses `TICKER_10K_YEAR` (any extension). The ticker is the part
    /// before the first underscore, the year the part after the last.
    pub fn from_path(path: &Path) -> Result<Self, StorageError> {
        let bad = || StorageError::BadFileName(path.display().to_string());
        let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(bad)?;
        let parts: Vec<&str> = stem.split('_').collect();
        if parts.len() < 2 || parts[0].is_empty() {
            return Err(bad());
        }
        let year = parts[parts.len() - 1].parse::<u32>().map_err(|_| bad())?;
        Ok(Self::new(parts[0], year))
    }
}

impl fmt::Display for FilingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ticker, self.year)
    }
}

/// A flat directory of filings, raw or processed.
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, id: &FilingId) -> PathBuf {
        self.base_dir.join(id.file_name())
    }

    /// Filing files (`.txt`/`.htm`/`.html`) in the directory, sorted by name.
    pub fn list_filings(&self) -> Result<Vec<PathBuf>, StorageError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            let is_filing = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e.to_ascii_lowercase().as_str(), "txt" | "htm" | "html"))
                .unwrap_or(false);
            if path.is_file() && is_filing {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Reads a filing as text, replacing undecodable bytes.
    pub fn read_filing(path: &Path) -> Result<String, StorageError> {
        let bytes = fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn save_raw(&self, id: &FilingId, content: &str) -> Result<PathBuf, StorageError> {
        let file_path = self.path_for(id);
        fs::write(&file_path, content)?;
        tracing::info!("Saved raw filing to {}", file_path.display());
        Ok(file_path)
    }

    /// Writes the three-field artifact. An existing file is replaced.
    pub fn save_processed(&self, id: &FilingId, doc: &ProcessedDocument) -> Result<PathBuf, StorageError> {
        let file_path = self.path_for(id);
        fs::write(&file_path, doc.to_artifact())?;
        tracing::info!("Saved processed filing to {}", file_path.display());
        Ok(file_path)
    }

    /// Writes a JSON sidecar recording which sections are present.
    pub fn save_processed_metadata(
        &self,
        id: &FilingId,
        doc: &ProcessedDocument,
        extractor: &SectionExtractor,
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(format!("{}_meta.json", id.stem()));

        let sections: serde_json::Map<String, serde_json::Value> = SectionKind::ALL
            .iter()
            .map(|kind| {
                let text = doc.section(*kind);
                (
                    kind.field_name().to_string(),
                    serde_json::json!({
                        "present": text.is_some(),
                        "chars": text.map(|t| t.chars().count()).unwrap_or(0),
                    }),
                )
            })
            .collect();

        let metadata = serde_json::json!({
            "ticker": id.ticker,
            "filing_year": id.year,
            "pattern_table_version": extractor.table_version(),
            "body_policy": extractor.body_policy(),
            "sections": sections,
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, metadata_str)?;

        tracing::debug!("Saved metadata to {}", file_path.display());
        Ok(file_path)
    }

    pub fn load_processed(path: &Path) -> Result<ProcessedDocument, StorageError> {
        let content = fs::read_to_string(path)?;
        ProcessedDocument::from_artifact(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> ProcessedDocument {
        ProcessedDocument {
            item1_business: Some("we design and sell consumer electronics".to_string()),
            item1a_risk_factors: None,
            item7_mda: Some("net sales increased 8.1 % year over year".to_string()),
        }
    }

    #[test]
    fn filing_id_parses_file_names() {
        let id = FilingId::from_path(Path::new("/data/raw/aapl_10K_2023.txt")).unwrap();
        assert_eq!(id, FilingId::new("AAPL", 2023));
        assert_eq!(id.file_name(), "AAPL_10K_2023.txt");

        assert!(FilingId::from_path(Path::new("notes.txt")).is_err());
        assert!(FilingId::from_path(Path::new("AAPL_10K_latest.txt")).is_err());
    }

    #[test]
    fn processed_document_survives_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path().join("processed")).unwrap();
        let id = FilingId::new("aapl", 2023);

        let path = storage.save_processed(&id, &sample_doc()).unwrap();
        assert_eq!(path.file_name().unwrap(), "AAPL_10K_2023.txt");
        assert_eq!(StorageManager::load_processed(&path).unwrap(), sample_doc());
    }

    #[test]
    fn metadata_records_presence() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let id = FilingId::new("MSFT", 2022);

        let path = storage
            .save_processed_metadata(&id, &sample_doc(), &SectionExtractor::new())
            .unwrap();
        let meta: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(meta["ticker"], "MSFT");
        assert_eq!(meta["body_policy"], "first");
        assert_eq!(meta["sections"]["item1_business"]["present"], true);
        assert_eq!(meta["sections"]["item1a_risk_factors"]["present"], false);
        assert_eq!(meta["sections"]["item1a_risk_factors"]["chars"], 0);
    }

    #[test]
    fn list_filings_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        for name in ["TSLA_10K_2021.txt", "AAPL_10K_2023.htm", "AAPL_10K_2023_meta.json"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let names: Vec<String> = storage
            .list_filings()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["AAPL_10K_2023.htm", "TSLA_10K_2021.txt"]);
    }

    #[test]
    fn read_filing_tolerates_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BAD_10K_2020.txt");
        fs::write(&path, b"<TEXT>caf\xe9 item</TEXT>").unwrap();
        let text = StorageManager::read_filing(&path).unwrap();
        assert!(text.starts_with("<TEXT>caf"));
        assert!(text.contains('\u{FFFD}'));
    }
}
