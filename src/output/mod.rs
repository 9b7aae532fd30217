//! Output module for persisting crawl results
//!
//! This module handles:
//! - The result writer task and its request/acknowledgement protocol
//! - Per-domain and aggregate product files
//! - The run report and the console summary

mod records;
mod report;
pub mod stats;
mod writer;

pub use records::{
    all_records, domain_file_name, domain_records, DomainProductRecord, ProductRecord,
    ALL_PRODUCTS_FILE, REPORT_FILE,
};
pub use report::CrawlReport;
pub use stats::{pages_by_state, print_summary};
pub use writer::{OutputError, ResultWriter, WriterAck, WriterRequest};

use crate::crawler::CrawlOutcome;
use serde::Serialize;
use std::path::Path;

/// Builds the persist requests for a finished crawl
///
/// One file per domain (empty domains included), the aggregate file and the
/// report, in that order.
pub fn outcome_requests(outcome: &CrawlOutcome) -> Result<Vec<WriterRequest>, OutputError> {
    let mut requests = Vec::with_capacity(outcome.products.len() + 2);

    for (domain, urls) in &outcome.products {
        requests.push(persist(domain_file_name(domain), &domain_records(urls))?);
    }
    requests.push(persist(
        ALL_PRODUCTS_FILE.to_string(),
        &all_records(&outcome.products),
    )?);
    requests.push(persist(
        REPORT_FILE.to_string(),
        &CrawlReport::from_outcome(outcome),
    )?);

    Ok(requests)
}

fn persist<T: Serialize>(key: String, payload: &T) -> Result<WriterRequest, OutputError> {
    Ok(WriterRequest::Persist {
        key,
        payload: serde_json::to_value(payload)?,
    })
}

/// Sends every result file of `outcome` to a writer task and collects the acks
///
/// Write failures are logged and returned as error acknowledgements; they never
/// abort the run.
pub async fn persist_outcome(outcome: &CrawlOutcome, directory: &Path) -> Vec<WriterAck> {
    let requests = match outcome_requests(outcome) {
        Ok(requests) => requests,
        Err(e) => {
            tracing::error!("Failed to prepare results: {}", e);
            return Vec::new();
        }
    };

    let (writer, mut acks) = ResultWriter::spawn(directory.to_path_buf());
    for request in requests {
        if let Err(e) = writer.submit(request).await {
            tracing::error!("{}", e);
            break;
        }
    }
    writer.finish().await;

    let mut received = Vec::new();
    while let Some(ack) = acks.recv().await {
        match &ack {
            WriterAck::Ok { key, size } => {
                tracing::info!("Wrote {} ({} records)", directory.join(key).display(), size)
            }
            WriterAck::Error { key, message } => {
                tracing::error!("Failed to write {}: {}", key, message)
            }
        }
        received.push(ack);
    }
    received
}
