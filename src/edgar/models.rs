// src/edgar/models.rs
#![allow(non_snake_case)]
use serde::{Deserialize, Serialize};

/// The parts of the EDGAR submissions index this tool reads.
/// Example: https://data.sec.gov/submissions/CIK0000320193.json
#[derive(Debug, Deserialize)]
pub struct CompanySubmission {
    pub cik: String,
    pub name: String,
    pub filings: Filings,
}

#[derive(Debug, Deserialize)]
pub struct Filings {
    pub recent: FilingsList,
}

/// Column-oriented: index `i` of every vector describes the same filing.
#[derive(Debug, Deserialize)]
pub struct FilingsList {
    pub accessionNumber: Vec<String>,
    pub filingDate: Vec<String>,
    #[serde(default)]
    pub reportDate: Vec<String>,
    pub form: Vec<String>,
    pub primaryDocument: Vec<String>,
}

/// Simple struct representing a specific filing we want to process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingInfo {
    pub accession_number: String,
    pub filing_date: String,
    pub ticker: String,
    pub company_name: String,
    pub cik: String,
    pub primary_doc: String,
    pub year: u32, // Fiscal year of the report
}

impl FilingInfo {
    fn archive_dir(&self) -> String {
        let cik = self.cik.trim_start_matches('0');
        let acc_no_dashes = self.accession_number.replace('-', "");
        format!("https://www.sec.gov/Archives/edgar/data/{}/{}", cik, acc_no_dashes)
    }

    /// Complete submission archive, with every document wrapped in `<TEXT>`.
    pub fn full_submission_url(&self) -> String {
        format!("{}/{}.txt", self.archive_dir(), self.accession_number)
    }

    /// Constructs the URL to access the primary document of this filing
    pub fn primary_doc_url(&self) -> String {
        format!("{}/{}", self.archive_dir(), self.primary_doc)
    }

    /// URLs to try in order when downloading.
    pub fn candidate_urls(&self) -> Vec<String> {
        vec![self.full_submission_url(), self.primary_doc_url()]
    }
}
