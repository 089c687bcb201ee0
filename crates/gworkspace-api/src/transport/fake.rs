//! In-memory transport for tests.
//!
//! Responses are queued per `(service, path)` and served in FIFO order; every
//! call is recorded so tests can assert on the requests a client issued.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::Value;

use super::{BoxFuture, Media, Request, Service, Transport};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Get,
    Create,
    Update,
    Delete,
    Upload,
}

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub op: Op,
    pub request: Request,
    pub body: Option<Value>,
    pub media: Option<Media>,
}

#[derive(Default)]
struct State {
    responses: HashMap<(Service, String), VecDeque<ApiResult<Value>>>,
    calls: Vec<Call>,
}

#[derive(Default)]
pub(crate) struct FakeTransport {
    state: Mutex<State>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the next call to `path`.
    pub fn push_response(&self, service: Service, path: &str, response: Value) {
        self.push(service, path, Ok(response));
    }

    /// Queues one page of a list response. Same as `push_response`, reads better in tests.
    pub fn push_page(&self, service: Service, path: &str, page: Value) {
        self.push(service, path, Ok(page));
    }

    pub fn push_error(&self, service: Service, path: &str, error: ApiError) {
        self.push(service, path, Err(error));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Returns the recorded calls against one path, in order.
    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.request.path == path)
            .collect()
    }

    fn push(&self, service: Service, path: &str, response: ApiResult<Value>) {
        self.state
            .lock()
            .unwrap()
            .responses
            .entry((service, path.to_string()))
            .or_default()
            .push_back(response);
    }

    fn respond(
        &self,
        op: Op,
        request: &Request,
        body: Option<Value>,
        media: Option<Media>,
    ) -> ApiResult<Value> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            op,
            request: request.clone(),
            body,
            media,
        });
        state
            .responses
            .get_mut(&(request.service, request.path.clone()))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(ApiError::resource_missing(format!(
                    "no canned response for {}",
                    request.path
                )))
            })
    }
}

impl Transport for FakeTransport {
    fn get<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, ApiResult<Value>> {
        Box::pin(async move { self.respond(Op::Get, request, None, None) })
    }

    fn create<'a>(&'a self, request: &'a Request, body: Value) -> BoxFuture<'a, ApiResult<Value>> {
        Box::pin(async move { self.respond(Op::Create, request, Some(body), None) })
    }

    fn update<'a>(&'a self, request: &'a Request, body: Value) -> BoxFuture<'a, ApiResult<Value>> {
        Box::pin(async move { self.respond(Op::Update, request, Some(body), None) })
    }

    fn delete<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, ApiResult<Value>> {
        Box::pin(async move { self.respond(Op::Delete, request, None, None) })
    }

    fn upload<'a>(
        &'a self,
        request: &'a Request,
        metadata: Value,
        media: Media,
    ) -> BoxFuture<'a, ApiResult<Value>> {
        Box::pin(async move { self.respond(Op::Upload, request, Some(metadata), Some(media)) })
    }
}
