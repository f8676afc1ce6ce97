// src/edgar/client.rs
use crate::edgar::models::{CompanySubmission, FilingInfo};
use crate::utils::error::EdgarError;
use reqwest::header;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "tenk-sections research contact@example.com";
// SEC asks for 10 requests/second max. Be conservative. >100ms delay.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 150;

const TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// Client plus the politeness settings EDGAR requires.
pub struct EdgarClient {
    http: reqwest::Client,
    delay: Duration,
}

impl EdgarClient {
    /// EDGAR rejects requests without a descriptive User-Agent.
    pub fn new(user_agent: &str, delay_ms: u64) -> Result<Self, EdgarError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            delay: Duration::from_millis(delay_ms),
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, EdgarError> {
        // --- Basic Rate Limiting ---
        tokio::time::sleep(self.delay).await;

        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, "application/json,text/html,text/plain,*/*")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for URL: {}", status, url);
            if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!("Received {} - check User-Agent and rate limits.", status);
                return Err(EdgarError::RateLimited);
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(EdgarError::FilingDocNotFound(url.to_string()));
            }
            return Err(EdgarError::Http(status));
        }
        Ok(response)
    }

    /// Gets the zero-padded CIK (Central Index Key) for a ticker symbol
    pub async fn get_cik_from_ticker(&self, ticker: &str) -> Result<String, EdgarError> {
        let json: serde_json::Value = self.get(TICKERS_URL).await?.json().await?;
        find_cik(&json, ticker)
    }

    /// Fetches the company submission data for a given CIK
    pub async fn get_company_submissions(&self, cik: &str) -> Result<CompanySubmission, EdgarError> {
        let url = format!("https://data.sec.gov/submissions/CIK{}.json", cik);
        let submission: CompanySubmission = self.get(&url).await?.json().await?;
        Ok(submission)
    }

    /// Finds 10-K filings for a ticker within an optional year range, newest first.
    pub async fn find_10k_filings(
        &self,
        ticker: &str,
        start_year: Option<u32>,
        end_year: Option<u32>,
    ) -> Result<Vec<FilingInfo>, EdgarError> {
        let cik = self.get_cik_from_ticker(ticker).await?;
        tracing::info!("Ticker {} -> CIK {}", ticker.to_uppercase(), cik);
        let submissions = self.get_company_submissions(&cik).await?;
        select_10k_filings(&submissions, ticker, &cik, start_year, end_year)
    }

    /// Downloads the first URL that succeeds, in order.
    pub async fn download_first_available(&self, urls: &[String]) -> Result<String, EdgarError> {
        let mut last_err = None;
        for url in urls {
            tracing::info!("Downloading document from: {}", url);
            match self.get(url).await {
                Ok(response) => {
                    let body = response.text().await?;
                    tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
                    return Ok(body);
                }
                Err(e) => {
                    tracing::warn!("Download failed for {}: {}", url, e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| EdgarError::FilingDocNotFound("no candidate URLs".to_string())))
    }

    /// Downloads a filing, preferring the full submission archive. A bare
    /// primary document is wrapped in `<TEXT>` so preprocessing treats both alike.
    pub async fn download_filing(&self, filing: &FilingInfo) -> Result<String, EdgarError> {
        let body = self.download_first_available(&filing.candidate_urls()).await?;
        Ok(ensure_text_body(body))
    }
}

fn ensure_text_body(body: String) -> String {
    if body.to_ascii_lowercase().contains("<text>") {
        body
    } else {
        format!("<TEXT>\n{}\n</TEXT>\n", body)
    }
}

fn find_cik(json: &serde_json::Value, ticker: &str) -> Result<String, EdgarError> {
    let ticker = ticker.to_uppercase();
    let companies = json
        .as_object()
        .ok_or_else(|| EdgarError::Parse("Invalid JSON structure".to_string()))?;

    for company in companies.values() {
        let matches = company
            .get("ticker")
            .and_then(|t| t.as_str())
            .map(|t| t.eq_ignore_ascii_case(&ticker))
            .unwrap_or(false);
        if matches {
            let cik_num = company
                .get("cik_str")
                .and_then(|c| c.as_u64())
                .ok_or_else(|| EdgarError::Parse("Invalid CIK format".to_string()))?;
            return Ok(format!("{:010}", cik_num));
        }
    }

    Err(EdgarError::CikNotFound(ticker))
}

/// Picks the 10-K rows out of a submissions index. The year comes from the
/// report date (fiscal period) when present, else from the filing date.
pub fn select_10k_filings(
    submissions: &CompanySubmission,
    ticker: &str,
    cik: &str,
    start_year: Option<u32>,
    end_year: Option<u32>,
) -> Result<Vec<FilingInfo>, EdgarError> {
    let recent = &submissions.filings.recent;
    let mut filings = Vec::new();

    for (i, form) in recent.form.iter().enumerate() {
        if form != "10-K" {
            continue;
        }
        let missing = |field: &str| EdgarError::Parse(format!("Missing {} for row {}", field, i));

        let filing_date = recent.filingDate.get(i).ok_or_else(|| missing("filing date"))?;
        let year_source = recent
            .reportDate
            .get(i)
            .filter(|d| d.len() >= 4)
            .unwrap_or(filing_date);
        let year = year_source
            .get(0..4)
            .and_then(|y| y.parse::<u32>().ok())
            .ok_or_else(|| EdgarError::Parse(format!("Invalid date format: {}", year_source)))?;

        if start_year.map_or(false, |s| year < s) || end_year.map_or(false, |e| year > e) {
            continue;
        }

        filings.push(FilingInfo {
            accession_number: recent.accessionNumber.get(i).ok_or_else(|| missing("accession number"))?.clone(),
            filing_date: filing_date.clone(),
            ticker: ticker.to_uppercase(),
            company_name: submissions.name.clone(),
            cik: cik.to_string(),
            primary_doc: recent.primaryDocument.get(i).ok_or_else(|| missing("primary document"))?.clone(),
            year,
        });
    }

    // Sort by year (newest first)
    filings.sort_by(|a, b| b.year.cmp(&a.year));
    Ok(filings)
}
