//! Uploaded Jira ticket set and its cached status summary.

mod ingest;
mod status;

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use log::info;
use serde::Serialize;

use crate::cache::{CacheInfo, Clock, TtlCache};
use crate::error::{DashboardError, Result};
use crate::pagination::{Page, PageRequest};
pub use ingest::{RowWarning, Ticket};
use ingest::{ingest, RawTable};
pub use status::StatusCategory;

pub const SUMMARY_TTL: TimeDelta = TimeDelta::minutes(15);
pub const TICKET_PAGE_SIZE: usize = 10;
/// Summary key before anything was uploaded.
const NO_UPLOAD: u64 = 0;

#[derive(Debug)]
struct TicketDataset {
    /// Increments with every successful upload.
    generation: u64,
    tickets: Vec<Ticket>,
    filename: String,
    uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSummary {
    pub accepted: usize,
    pub warnings: usize,
    pub warning_details: Vec<RowWarning>,
    pub uploaded_at: DateTime<Utc>,
}

/// Ticket counts per status category, every category present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JiraSummary {
    #[serde(flatten)]
    pub counts: IndexMap<&'static str, usize>,
    pub total: usize,
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl JiraSummary {
    fn from_tickets(tickets: &[Ticket], uploaded_at: Option<DateTime<Utc>>) -> Self {
        let mut counts: IndexMap<&'static str, usize> = StatusCategory::ALL
            .iter()
            .map(|category| (category.slug(), 0))
            .collect();

        for ticket in tickets {
            *counts.entry(ticket.category.slug()).or_insert(0) += 1;
        }

        Self {
            counts,
            total: tickets.len(),
            uploaded_at,
        }
    }
}

pub struct JiraService {
    dataset: RwLock<Option<Arc<TicketDataset>>>,
    /// Keyed by upload generation, so a summary of a replaced dataset is
    /// never served for its successor.
    summaries: TtlCache<u64, Arc<JiraSummary>>,
    clock: Arc<dyn Clock>,
}

impl JiraService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            dataset: RwLock::new(None),
            summaries: TtlCache::new(SUMMARY_TTL, clock.clone()),
            clock,
        }
    }

    fn current(&self) -> Option<Arc<TicketDataset>> {
        self.dataset
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Parses an export and, when at least one row is valid, replaces the
    /// current ticket set with it.
    pub fn upload(&self, filename: &str, bytes: &[u8]) -> Result<UploadSummary> {
        let table = RawTable::read(filename, bytes)?;
        let report = ingest(&table)?;

        if report.tickets.is_empty() {
            return Err(DashboardError::validation(format!(
                "no valid ticket rows in {filename} ({} skipped)",
                report.warnings.len()
            )));
        }

        let uploaded_at = self.clock.now();
        let summary = UploadSummary {
            accepted: report.tickets.len(),
            warnings: report.warnings.len(),
            warning_details: report.warnings,
            uploaded_at,
        };

        {
            let mut current = self.dataset.write().unwrap_or_else(PoisonError::into_inner);
            let generation = current.as_ref().map_or(NO_UPLOAD, |d| d.generation) + 1;
            *current = Some(Arc::new(TicketDataset {
                generation,
                tickets: report.tickets,
                filename: filename.to_string(),
                uploaded_at,
            }));
        }
        self.summaries.clear();

        info!(
            "Loaded {} tickets from {filename} ({} rows skipped)",
            summary.accepted, summary.warnings
        );
        Ok(summary)
    }

    /// Cached status summary; all-zero before the first upload.
    pub fn status_summary(&self) -> Arc<JiraSummary> {
        let dataset = self.current();
        let generation = dataset.as_ref().map_or(NO_UPLOAD, |d| d.generation);
        if let Some(summary) = self.summaries.get(&generation) {
            return summary;
        }

        let summary = Arc::new(match dataset {
            Some(dataset) => {
                info!("Summarizing {} tickets from {}", dataset.tickets.len(), dataset.filename);
                JiraSummary::from_tickets(&dataset.tickets, Some(dataset.uploaded_at))
            }
            None => JiraSummary::from_tickets(&[], None),
        });
        self.summaries.insert(generation, summary.clone());
        summary
    }

    /// Tickets in upload order, optionally narrowed to one category.
    pub fn tickets(&self, category: Option<StatusCategory>, page: PageRequest) -> Page<Ticket> {
        let Some(dataset) = self.current() else {
            return page.slice::<Ticket>(&[]);
        };

        match category {
            Some(category) => {
                let matching: Vec<Ticket> = dataset
                    .tickets
                    .iter()
                    .filter(|t| t.category == category)
                    .cloned()
                    .collect();
                page.slice(&matching)
            }
            None => page.slice(&dataset.tickets),
        }
    }

    /// Drops the cached summary only; the ticket set stays.
    pub fn refresh(&self) -> bool {
        let dropped = self.summaries.clear();
        info!("Ticket summary cache refresh (dropped: {dropped})");
        dropped > 0
    }

    pub fn cache_info(&self) -> CacheInfo {
        self.summaries.info()
    }
}
