//! Collection fetch with loading/error bookkeeping.
//!
//! # Design
//! `ResourceFetch` owns the canonical snapshot of one collection. It issues
//! a ticket on start, whenever the query changes by value, and on
//! `refetch`. Only the completion for the most recently issued ticket is
//! applied; anything older is stale and leaves the state untouched. A
//! failed fetch records the error but keeps the previous data on screen.

use tracing::{debug, warn};

use crate::client::PowerGuardClient;
use crate::error::ApiError;
use crate::query::ListQuery;
use crate::resource::Resource;
use crate::ticket::{Completion, RequestId, Sequence, Ticket};

/// Result of handing a completion to the fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response replaced `data`.
    Applied,
    /// The request failed; `error` is set and `data` kept.
    Failed,
    /// The completion belonged to a superseded or cancelled request.
    Stale,
}

#[derive(Debug)]
pub struct ResourceFetch<R: Resource> {
    query: ListQuery,
    data: Option<Vec<R>>,
    loading: bool,
    error: Option<ApiError>,
    seq: Sequence,
    awaiting: Option<RequestId>,
}

impl<R: Resource> ResourceFetch<R> {
    pub fn new(query: ListQuery) -> Self {
        Self {
            query,
            data: None,
            loading: false,
            error: None,
            seq: Sequence::default(),
            awaiting: None,
        }
    }

    /// Initial load.
    pub fn start(&mut self, client: &PowerGuardClient) -> Ticket {
        self.issue(client)
    }

    /// Replace the query. Returns a ticket only if the query changed.
    pub fn set_query(&mut self, client: &PowerGuardClient, query: ListQuery) -> Option<Ticket> {
        if query == self.query {
            return None;
        }
        self.query = query;
        Some(self.issue(client))
    }

    /// Re-run the current query. Any request still in flight becomes stale.
    pub fn refetch(&mut self, client: &PowerGuardClient) -> Ticket {
        self.issue(client)
    }

    /// Stop waiting for the in-flight request, if any.
    pub fn cancel(&mut self) {
        if let Some(id) = self.awaiting.take() {
            debug!(endpoint = %R::ENDPOINT, request = id.get(), "fetch cancelled");
        }
        self.loading = false;
    }

    pub fn complete(
        &mut self,
        client: &PowerGuardClient,
        id: RequestId,
        completion: Completion,
    ) -> FetchOutcome {
        if self.awaiting != Some(id) {
            debug!(endpoint = %R::ENDPOINT, request = id.get(), "discarding stale response");
            return FetchOutcome::Stale;
        }
        self.awaiting = None;
        self.loading = false;

        match completion.and_then(|response| client.parse_list::<R>(response)) {
            Ok(rows) => {
                self.data = Some(rows);
                self.error = None;
                FetchOutcome::Applied
            }
            Err(err) => {
                warn!(endpoint = %R::ENDPOINT, error = %err, "error fetching data");
                self.error = Some(err);
                FetchOutcome::Failed
            }
        }
    }

    pub fn data(&self) -> Option<&[R]> {
        self.data.as_deref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    fn issue(&mut self, client: &PowerGuardClient) -> Ticket {
        let ticket = self.seq.issue(client.build_list::<R>(&self.query));
        self.awaiting = Some(ticket.id);
        self.loading = true;
        ticket
    }
}
