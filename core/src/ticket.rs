//! Request sequencing.
//!
//! Every request a controller hands to the host is wrapped in a `Ticket`
//! carrying a monotonically increasing `RequestId`. When the host reports
//! back, the controller compares the id against the one it is waiting for
//! and discards anything older. Dropping the awaited id is how a controller
//! cancels: the eventual completion no longer matches and is ignored.

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A request the host must execute, tagged with its id.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub id: RequestId,
    pub request: HttpRequest,
}

/// What the host hands back: the response, or the transport failure mapped
/// to `ApiError::Transport`.
pub type Completion = Result<HttpResponse, ApiError>;

/// Per-controller id generator.
#[derive(Debug, Default)]
pub(crate) struct Sequence {
    last: u64,
}

impl Sequence {
    pub(crate) fn issue(&mut self, request: HttpRequest) -> Ticket {
        self.last += 1;
        Ticket {
            id: RequestId(self.last),
            request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    #[test]
    fn ids_increase() {
        let mut seq = Sequence::default();
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "http://x/core/a/".into(),
            headers: Vec::new(),
            body: None,
        };
        let a = seq.issue(req.clone());
        let b = seq.issue(req);
        assert!(b.id > a.id);
        assert_eq!(a.id.get() + 1, b.id.get());
    }
}
