//! Full-attribute detail adapter
//!
//! The expensive phase of the crawl: exactly one detail call per unique
//! place ID, dispatched with bounded parallelism. A failure for one ID is
//! recorded and the rest of the batch continues.

use crate::places::api::PlacesApi;
use crate::places::gateway::RequestGate;
use crate::places::types::{AttributeSet, PlaceRecord};
use crate::state::CancellationFlag;
use crate::{ApiError, ApiResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::{self, JoinSet};

/// Result of a detail batch
#[derive(Debug, Default)]
pub struct DetailOutcome {
    /// Records in the order their IDs were given
    pub records: Vec<PlaceRecord>,

    /// IDs whose fetch failed, with the final error
    pub failures: Vec<(String, ApiError)>,

    /// Detail calls dispatched
    pub calls: usize,

    /// True if cancellation stopped dispatch before every ID was fetched
    pub cancelled: bool,
}

/// Fetches place details through the shared request gate
pub struct DetailFetcher {
    api: Arc<dyn PlacesApi>,
    gate: RequestGate,
    concurrency: usize,
}

impl DetailFetcher {
    pub fn new(api: Arc<dyn PlacesApi>, gate: RequestGate, concurrency: usize) -> Self {
        Self {
            api,
            gate,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetches `attributes` for every ID
    ///
    /// `on_progress` receives the number of completed fetches after each
    /// one finishes. Only a fatal error (bad credentials) fails the batch.
    pub async fn fetch_details(
        &self,
        ids: &[String],
        attributes: &AttributeSet,
        cancel: &CancellationFlag,
        mut on_progress: impl FnMut(usize),
    ) -> ApiResult<DetailOutcome> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = ids.iter().filter(|id| seen.insert(id.as_str())).collect();

        let mut slots: Vec<Option<PlaceRecord>> = vec![None; unique.len()];
        let mut outcome = DetailOutcome::default();
        let mut in_flight = JoinSet::new();
        let mut tasks: HashMap<task::Id, usize> = HashMap::new();
        let mut next = 0;
        let mut completed = 0;

        loop {
            while in_flight.len() < self.concurrency && next < unique.len() {
                if cancel.is_cancelled() {
                    outcome.cancelled = true;
                    break;
                }
                let index = next;
                let id = unique[index].clone();
                let api = Arc::clone(&self.api);
                let gate = self.gate.clone();
                let attributes = *attributes;
                let handle = in_flight.spawn(async move {
                    gate.call("details", || api.fetch_place_details(&id, &attributes))
                        .await
                });
                tasks.insert(handle.id(), index);
                next += 1;
                outcome.calls += 1;
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };

            completed += 1;
            let (index, result) = match joined {
                Ok((task_id, result)) => (tasks.remove(&task_id), result),
                Err(join_err) => {
                    tracing::error!(error = %join_err, "detail task panicked");
                    let failed = ApiError::TaskFailed {
                        task: "details",
                        message: join_err.to_string(),
                    };
                    (tasks.remove(&join_err.id()), Err(failed))
                }
            };
            let Some(index) = index else {
                continue;
            };
            let id = unique[index].clone();

            match result {
                Ok(mut record) => {
                    if record.place_id.is_empty() {
                        record.place_id = id;
                    }
                    slots[index] = Some(record);
                }
                Err(err) if err.is_fatal() => {
                    tracing::error!(place_id = %id, error = %err, "fatal error fetching details");
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(place_id = %id, error = %err, "detail fetch failed");
                    outcome.failures.push((id, err));
                }
            }
            on_progress(completed);
        }

        outcome.records = slots.into_iter().flatten().collect();
        Ok(outcome)
    }
}
