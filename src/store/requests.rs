use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::pickup_code::generate_pickup_code;
use crate::error::AppError;
use crate::models::pickup::{PickupDraft, PickupRequest, RequestStatus, StatusUpdate};
use crate::storage::{load_all, put_json, Storage, REQUESTS_PREFIX};

struct Entry {
    seq: u64,
    request: PickupRequest,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct PartnerStats {
    pub pending: usize,
    pub assigned: usize,
    pub completed: usize,
}

/// All pickup requests, indexed by id and written through to storage one
/// record at a time. Reads come back in insertion order.
pub struct RequestStore {
    requests: DashMap<Uuid, Entry>,
    next_seq: AtomicU64,
    storage: Arc<dyn Storage>,
}

fn request_key(id: Uuid) -> String {
    format!("{REQUESTS_PREFIX}{id}")
}

impl RequestStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            requests: DashMap::new(),
            next_seq: AtomicU64::new(0),
            storage,
        }
    }

    /// Rebuilds the collection from storage, ordering by creation time.
    pub fn load(storage: Arc<dyn Storage>) -> Result<Self, AppError> {
        let mut records: Vec<PickupRequest> =
            load_all::<PickupRequest>(storage.as_ref(), REQUESTS_PREFIX)?
                .into_iter()
                .map(|(_, request)| request)
                .collect();
        records.sort_by_key(|request| request.created_at);

        let store = Self::new(storage);
        for request in records {
            let seq = store.next_seq.fetch_add(1, Ordering::Relaxed);
            store.requests.insert(request.id, Entry { seq, request });
        }

        info!(requests = store.len(), "pickup requests loaded");
        Ok(store)
    }

    pub fn create(&self, draft: PickupDraft) -> Result<PickupRequest, AppError> {
        let request = PickupRequest {
            id: Uuid::new_v4(),
            customer_id: draft.customer_id,
            customer_name: draft.customer_name,
            customer_phone: draft.customer_phone,
            partner_id: None,
            partner_name: None,
            pickup_date: draft.pickup_date,
            time_slot: draft.time_slot,
            address: draft.address,
            map_link: draft.map_link,
            status: RequestStatus::Pending,
            pickup_code: None,
            items: None,
            total_amount: None,
            created_at: Utc::now(),
        };

        put_json(self.storage.as_ref(), &request_key(request.id), &request)?;

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.requests.insert(
            request.id,
            Entry {
                seq,
                request: request.clone(),
            },
        );

        Ok(request)
    }

    pub fn get(&self, id: Uuid) -> Result<PickupRequest, AppError> {
        self.requests
            .get(&id)
            .map(|entry| entry.request.clone())
            .ok_or_else(|| not_found(id))
    }

    pub fn set_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        update: StatusUpdate,
    ) -> Result<PickupRequest, AppError> {
        self.transition(id, |_| Ok((status, update)))
    }

    /// Runs `step` against the current record; the status and update it
    /// returns are merged into the record. The record stays locked for the
    /// whole step, and memory is only updated once the write to storage
    /// succeeded. Nothing is written if `step` fails.
    pub fn transition<F>(&self, id: Uuid, step: F) -> Result<PickupRequest, AppError>
    where
        F: FnOnce(&PickupRequest) -> Result<(RequestStatus, StatusUpdate), AppError>,
    {
        let mut entry = self.requests.get_mut(&id).ok_or_else(|| not_found(id))?;
        let (status, update) = step(&entry.request)?;

        let mut updated = entry.request.clone();
        merge(&mut updated, status, update);

        put_json(self.storage.as_ref(), &request_key(id), &updated)?;
        entry.request = updated.clone();

        debug!(request_id = %id, status = %status, "pickup request updated");
        Ok(updated)
    }

    pub fn filter_by_customer(&self, customer_id: Uuid) -> Vec<PickupRequest> {
        self.collect(|request| request.customer_id == customer_id)
    }

    pub fn filter_by_partner(&self, partner_id: Uuid) -> Vec<PickupRequest> {
        self.collect(|request| request.partner_id == Some(partner_id))
    }

    pub fn filter_pending(&self) -> Vec<PickupRequest> {
        self.collect(|request| request.status == RequestStatus::Pending)
    }

    /// What a partner's dashboard shows: their own jobs plus everything still open.
    pub fn partner_feed(&self, partner_id: Uuid) -> Vec<PickupRequest> {
        self.collect(|request| {
            request.partner_id == Some(partner_id) || request.status == RequestStatus::Pending
        })
    }

    pub fn partner_stats(&self, partner_id: Uuid) -> PartnerStats {
        let mut stats = PartnerStats::default();
        for entry in self.requests.iter() {
            let request = &entry.request;
            if request.status == RequestStatus::Pending {
                stats.pending += 1;
            }
            if request.partner_id == Some(partner_id) {
                stats.assigned += 1;
                if request.status == RequestStatus::Completed {
                    stats.completed += 1;
                }
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn collect<P>(&self, predicate: P) -> Vec<PickupRequest>
    where
        P: Fn(&PickupRequest) -> bool,
    {
        let mut matched: Vec<(u64, PickupRequest)> = self
            .requests
            .iter()
            .filter(|entry| predicate(&entry.request))
            .map(|entry| (entry.seq, entry.request.clone()))
            .collect();
        matched.sort_by_key(|(seq, _)| *seq);
        matched.into_iter().map(|(_, request)| request).collect()
    }
}

/// Sorts by creation time, most recent first. Ties go to the later insertion.
pub fn newest_first(mut requests: Vec<PickupRequest>) -> Vec<PickupRequest> {
    requests.reverse();
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    requests
}

fn merge(request: &mut PickupRequest, status: RequestStatus, update: StatusUpdate) {
    request.status = status;

    if let Some(partner_id) = update.partner_id {
        request.partner_id = Some(partner_id);
    }
    if let Some(partner_name) = update.partner_name {
        request.partner_name = Some(partner_name);
    }
    if let Some(items) = update.items {
        request.items = Some(items);
    }
    if let Some(total_amount) = update.total_amount {
        request.total_amount = Some(total_amount);
    }

    if status == RequestStatus::Accepted && request.pickup_code.is_none() {
        request.pickup_code = Some(generate_pickup_code());
    }

    if !status.carries_items() {
        request.items = None;
        request.total_amount = None;
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("pickup request {id} not found"))
}
