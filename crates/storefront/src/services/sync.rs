//! Full export of all orders to the spreadsheet.
//!
//! Individual order changes are pushed as they happen; a full sync re-sends
//! everything, e.g. after the sheet was edited by hand. It runs in the
//! background, one at a time: a trigger while a sync is running is refused
//! rather than queued or run twice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;

use super::ports::{OrderSheet, SheetRow};
use crate::db::OrderRepository;

/// Orders sent per request.
pub const PAGE_SIZE: usize = 100;

/// Errors from triggering a sync.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("a full sync is already running")]
    AlreadyRunning,

    #[error("spreadsheet export is not configured")]
    NotConfigured,
}

/// Outcome of a finished run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub orders_synced: u64,
    pub pages_failed: u64,
}

/// What the admin sees when asking about syncs.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub running: bool,
    pub last_report: Option<SyncReport>,
}

/// Clears the running flag however the task ends.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Spreadsheet sync service.
#[derive(Clone)]
pub struct SyncService {
    pool: SqlitePool,
    sheet: Option<Arc<dyn OrderSheet>>,
    running: Arc<AtomicBool>,
    last_report: Arc<Mutex<Option<SyncReport>>>,
}

impl SyncService {
    #[must_use]
    pub fn new(pool: SqlitePool, sheet: Option<Arc<dyn OrderSheet>>) -> Self {
        Self {
            pool,
            sheet,
            running: Arc::new(AtomicBool::new(false)),
            last_report: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a full sync in the background and return immediately.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::NotConfigured` without a sheet endpoint and
    /// `SyncError::AlreadyRunning` while a previous sync is still going.
    pub fn trigger_full_sync(&self) -> Result<tokio::task::JoinHandle<SyncReport>, SyncError> {
        let sheet = self.sheet.clone().ok_or(SyncError::NotConfigured)?;
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SyncError::AlreadyRunning);
        }
        let guard = RunningGuard(Arc::clone(&self.running));

        let service = self.clone();
        Ok(tokio::spawn(async move {
            let _guard = guard;
            let report = service.run(sheet.as_ref()).await;
            *service
                .last_report
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(report.clone());
            report
        }))
    }

    /// Whether a sync is running, and how the last one went.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            running: self.running.load(Ordering::Acquire),
            last_report: self.last_report(),
        }
    }

    /// The last finished run, if any.
    #[must_use]
    pub fn last_report(&self) -> Option<SyncReport> {
        self.last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn run(&self, sheet: &dyn OrderSheet) -> SyncReport {
        let started_at = Utc::now();
        let orders = OrderRepository::new(&self.pool);
        let mut offset = 0;
        let mut orders_synced = 0;
        let mut pages_failed = 0;

        tracing::info!("Full spreadsheet sync started");
        loop {
            let page = match orders.page_oldest_first(offset, PAGE_SIZE as i64).await {
                Ok(page) => page,
                Err(e) => {
                    // Cannot know what comes next without the page; stop here.
                    tracing::error!(offset, error = %e, "Failed to read orders for sync");
                    pages_failed += 1;
                    break;
                }
            };
            if page.is_empty() {
                break;
            }

            let rows: Vec<SheetRow> = page.iter().map(SheetRow::from).collect();
            match sheet.upsert_rows(&rows).await {
                Ok(()) => orders_synced += rows.len() as u64,
                Err(e) => {
                    tracing::warn!(offset, error = %e, "Spreadsheet page failed");
                    pages_failed += 1;
                }
            }

            if page.len() < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE as i64;
        }

        let report = SyncReport {
            started_at,
            finished_at: Utc::now(),
            orders_synced,
            pages_failed,
        };
        tracing::info!(orders_synced, pages_failed, "Full spreadsheet sync finished");
        report
    }
}
