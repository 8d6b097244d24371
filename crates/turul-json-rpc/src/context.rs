//! Call context: the correlation state machine for one HTTP exchange
//!
//! A [`CallContext`] is filled in step by step while a call is in flight and
//! validates the JSON-RPC correlation rules at every step, so a failure names
//! the step that broke and carries everything gathered so far.
//!
//! States advance strictly in order:
//!
//! ```text
//! Empty -> UrlSet (optional) -> CallSet -> HttpResponseReceived
//!       -> HttpBodyCaptured -> ResponseParsed
//! ```
//!
//! Once an error is on record the context is terminal: every later step
//! fails with [`CallError::ContextFailed`] and the state stays at the last
//! step that succeeded.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::envelope::{Envelope, EnvelopeError};
use crate::error::{CallError, ProtocolViolation};
use crate::request::JsonRpcCall;
use crate::response::JsonRpcMessage;
use crate::types::RequestId;

const BODY_PREVIEW_LIMIT: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum CallState {
    #[default]
    Empty,
    UrlSet,
    CallSet,
    HttpResponseReceived,
    HttpBodyCaptured,
    ResponseParsed,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::Empty => "Empty",
            CallState::UrlSet => "UrlSet",
            CallState::CallSet => "CallSet",
            CallState::HttpResponseReceived => "HttpResponseReceived",
            CallState::HttpBodyCaptured => "HttpBodyCaptured",
            CallState::ResponseParsed => "ResponseParsed",
        };
        f.write_str(name)
    }
}

/// Transport metadata of the HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponseInfo {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl HttpResponseInfo {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Accumulated state of a single JSON-RPC exchange.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    state: CallState,
    request_url: Option<String>,
    call: Option<Envelope<JsonRpcCall>>,
    expected_response_count: usize,
    http_response: Option<HttpResponseInfo>,
    http_body: Option<String>,
    response: Option<Envelope<JsonRpcMessage>>,
    first_error: Option<String>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn request_url(&self) -> Option<&str> {
        self.request_url.as_deref()
    }

    pub fn call(&self) -> Option<&Envelope<JsonRpcCall>> {
        self.call.as_ref()
    }

    /// Number of responses the server owes: one per request, none per notification
    pub fn expected_response_count(&self) -> usize {
        self.expected_response_count
    }

    pub fn http_response(&self) -> Option<&HttpResponseInfo> {
        self.http_response.as_ref()
    }

    pub fn http_body(&self) -> Option<&str> {
        self.http_body.as_deref()
    }

    pub fn response(&self) -> Option<&Envelope<JsonRpcMessage>> {
        self.response.as_ref()
    }

    pub fn first_error(&self) -> Option<&str> {
        self.first_error.as_deref()
    }

    /// True once the exchange is over: a response was parsed, or the body
    /// was captured and no response was owed.
    pub fn is_complete(&self) -> bool {
        if self.is_failed() {
            return false;
        }
        match self.state {
            CallState::ResponseParsed => true,
            CallState::HttpBodyCaptured => self.expected_response_count == 0,
            _ => false,
        }
    }

    /// True once an error is on record; no further step is accepted
    pub fn is_failed(&self) -> bool {
        self.first_error.is_some()
    }

    /// Ids of the outgoing requests, in call order
    pub fn request_ids(&self) -> Vec<&RequestId> {
        self.call
            .iter()
            .flat_map(|call| call.iter())
            .filter_map(JsonRpcCall::request_id)
            .collect()
    }

    pub fn with_request_url(&mut self, url: impl Into<String>) -> Result<&mut Self, CallError> {
        self.ensure_live()?;
        let url = url.into();
        if url.starts_with('/') {
            let err = CallError::InvalidUrl(url);
            self.with_error(err.to_string());
            return Err(err);
        }
        self.advance(CallState::UrlSet, &[CallState::Empty])?;
        self.request_url = Some(url);
        Ok(self)
    }

    pub fn with_single_call(&mut self, call: JsonRpcCall) -> Result<&mut Self, CallError> {
        self.ensure_live()?;
        if matches!(self.call, Some(Envelope::Batch(_))) {
            return Err(self.caller_error(CallError::ConflictingCallShape));
        }
        self.advance(CallState::CallSet, &[CallState::Empty, CallState::UrlSet])?;
        self.expected_response_count = usize::from(call.is_request());
        self.call = Some(Envelope::Single(call));
        Ok(self)
    }

    pub fn with_batch_call(&mut self, calls: Vec<JsonRpcCall>) -> Result<&mut Self, CallError> {
        self.ensure_live()?;
        if matches!(self.call, Some(Envelope::Single(_))) {
            return Err(self.caller_error(CallError::ConflictingCallShape));
        }
        if calls.is_empty() {
            return Err(self.caller_error(CallError::EmptyBatch));
        }
        self.advance(CallState::CallSet, &[CallState::Empty, CallState::UrlSet])?;
        self.expected_response_count = calls.iter().filter(|c| c.is_request()).count();
        self.call = Some(Envelope::Batch(calls));
        Ok(self)
    }

    /// Record the HTTP status line and headers.
    ///
    /// Anything but 200 means the call never reached JSON-RPC aware logic on
    /// the server and fails here, after the metadata is recorded.
    pub fn with_http_response(&mut self, info: HttpResponseInfo) -> Result<&mut Self, CallError> {
        self.advance(CallState::HttpResponseReceived, &[CallState::CallSet])?;
        let status = info.status;
        self.http_response = Some(info);
        if status != 200 {
            self.with_error(format!("Unexpected HTTP status {}", status));
            return Err(CallError::UnexpectedHttpStatus {
                status,
                context: Box::new(self.clone()),
            });
        }
        Ok(self)
    }

    pub fn with_http_body(&mut self, body: impl Into<String>) -> Result<&mut Self, CallError> {
        self.advance(
            CallState::HttpBodyCaptured,
            &[CallState::HttpResponseReceived],
        )?;
        self.http_body = Some(body.into());
        Ok(self)
    }

    /// Record a single parsed response; `None` stands for a body that parsed
    /// to nothing (`null` or empty).
    pub fn with_single_response(
        &mut self,
        response: Option<JsonRpcMessage>,
    ) -> Result<&mut Self, CallError> {
        self.ensure_live()?;
        if matches!(self.response, Some(Envelope::Batch(_))) {
            return Err(self.caller_error(CallError::ConflictingResponseShape));
        }
        self.ensure_state(CallState::HttpBodyCaptured, CallState::ResponseParsed)?;

        let Some(response) = response else {
            return Err(self.violation(ProtocolViolation::UnparsableBody));
        };
        self.response = Some(Envelope::Single(response.clone()));

        let single_call = match &self.call {
            Some(Envelope::Single(call)) => Some(call.clone()),
            _ => None,
        };
        let Some(call) = single_call else {
            return Err(self.violation(ProtocolViolation::ResponseShapeMismatch {
                expected: "batch",
                actual: "single",
            }));
        };

        let JsonRpcCall::Request(request) = call else {
            return Err(self.violation(ProtocolViolation::UnexpectedResponse));
        };

        if response.version() != crate::JSONRPC_VERSION {
            return Err(self.violation(ProtocolViolation::VersionMismatch {
                actual: response.version().to_string(),
            }));
        }

        // A null id on an error response means the server could not read ours
        let null_id_error = response.is_error() && response.id().is_null();
        if response.id() != &request.id && !null_id_error {
            return Err(self.violation(ProtocolViolation::IdMismatch {
                expected: request.id.clone(),
                actual: response.id().clone(),
            }));
        }

        debug!(id = %response.id(), is_error = response.is_error(), "Single response correlated");
        self.state = CallState::ResponseParsed;
        Ok(self)
    }

    /// Record a parsed batch response and correlate it against the batch call.
    pub fn with_batch_response(
        &mut self,
        responses: Vec<JsonRpcMessage>,
    ) -> Result<&mut Self, CallError> {
        self.ensure_live()?;
        if matches!(self.response, Some(Envelope::Single(_))) {
            return Err(self.caller_error(CallError::ConflictingResponseShape));
        }
        self.ensure_state(CallState::HttpBodyCaptured, CallState::ResponseParsed)?;
        self.response = Some(Envelope::Batch(responses.clone()));

        if !matches!(self.call, Some(Envelope::Batch(_))) {
            return Err(self.violation(ProtocolViolation::ResponseShapeMismatch {
                expected: "single",
                actual: "batch",
            }));
        }
        if self.expected_response_count == 0 {
            return Err(self.violation(ProtocolViolation::UnexpectedBatchResponse));
        }
        if responses.is_empty() {
            return Err(self.violation(ProtocolViolation::EmptyBatchViolation));
        }
        if responses.len() != self.expected_response_count {
            return Err(self.violation(ProtocolViolation::BatchCountMismatch {
                expected: self.expected_response_count,
                actual: responses.len(),
            }));
        }
        if let Some(bad) = responses
            .iter()
            .find(|r| r.version() != crate::JSONRPC_VERSION)
        {
            return Err(self.violation(ProtocolViolation::VersionMismatch {
                actual: bad.version().to_string(),
            }));
        }

        let request_ids: HashSet<RequestId> = self.request_ids().into_iter().cloned().collect();
        let mut seen = HashSet::new();
        for response in &responses {
            let id = response.id();
            if id.is_null() && response.is_error() {
                continue;
            }
            if !request_ids.contains(id) {
                return Err(self.violation(ProtocolViolation::UnknownResponseId(id.clone())));
            }
            if !seen.insert(id.clone()) {
                return Err(self.violation(ProtocolViolation::DuplicateResponseId(id.clone())));
            }
        }

        debug!(count = responses.len(), "Batch response correlated");
        self.state = CallState::ResponseParsed;
        Ok(self)
    }

    /// Record the first error seen during this exchange.
    ///
    /// Only the first error is kept; returns `false` if one was already on
    /// record and this call changed nothing.
    pub fn with_error(&mut self, message: impl Into<String>) -> bool {
        if self.first_error.is_some() {
            return false;
        }
        self.first_error = Some(message.into());
        true
    }

    /// Wrap a framing error with a snapshot of this context
    pub fn framing_error(&mut self, source: EnvelopeError) -> CallError {
        self.with_error(source.to_string());
        CallError::Framing {
            source,
            context: Box::new(self.clone()),
        }
    }

    fn violation(&mut self, violation: ProtocolViolation) -> CallError {
        self.with_error(violation.to_string());
        CallError::Protocol {
            violation,
            context: Box::new(self.clone()),
        }
    }

    fn caller_error(&mut self, err: CallError) -> CallError {
        self.with_error(err.to_string());
        err
    }

    fn ensure_live(&self) -> Result<(), CallError> {
        match &self.first_error {
            Some(first_error) => Err(CallError::ContextFailed {
                first_error: first_error.clone(),
            }),
            None => Ok(()),
        }
    }

    fn ensure_state(&mut self, expected: CallState, to: CallState) -> Result<(), CallError> {
        self.ensure_live()?;
        if self.state != expected {
            return Err(self.caller_error(CallError::InvalidTransition {
                from: self.state,
                to,
            }));
        }
        Ok(())
    }

    fn advance(&mut self, to: CallState, allowed_from: &[CallState]) -> Result<(), CallError> {
        self.ensure_live()?;
        if !allowed_from.contains(&self.state) {
            return Err(self.caller_error(CallError::InvalidTransition {
                from: self.state,
                to,
            }));
        }
        self.state = to;
        Ok(())
    }
}

fn describe_call(call: &JsonRpcCall) -> String {
    match call {
        JsonRpcCall::Request(req) => format!("request '{}' (id {})", req.method, req.id),
        JsonRpcCall::Notification(notif) => format!("notification '{}'", notif.method),
    }
}

fn describe_response(response: &JsonRpcMessage) -> String {
    match response {
        JsonRpcMessage::Response(resp) => format!("result (id {})", resp.id),
        JsonRpcMessage::Error(err) => format!(
            "error {} '{}' (id {})",
            err.error.code, err.error.message, err.id
        ),
    }
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CallContext [state: {}]", self.state)?;
        writeln!(
            f,
            "  url: {}",
            self.request_url.as_deref().unwrap_or("<base>")
        )?;

        match &self.call {
            None => writeln!(f, "  call: <none>")?,
            Some(Envelope::Single(call)) => writeln!(f, "  call: {}", describe_call(call))?,
            Some(Envelope::Batch(calls)) => {
                writeln!(
                    f,
                    "  call: batch of {} ({} expected responses)",
                    calls.len(),
                    self.expected_response_count
                )?;
                for call in calls {
                    writeln!(f, "    - {}", describe_call(call))?;
                }
            }
        }

        match &self.http_response {
            None => writeln!(f, "  http: <none>")?,
            Some(info) => writeln!(
                f,
                "  http: status {} ({} headers)",
                info.status,
                info.headers.len()
            )?,
        }

        match &self.http_body {
            None => writeln!(f, "  body: <none>")?,
            Some(body) if body.len() > BODY_PREVIEW_LIMIT => {
                let mut cut = BODY_PREVIEW_LIMIT;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                writeln!(f, "  body: {}... ({} bytes)", &body[..cut], body.len())?
            }
            Some(body) => writeln!(f, "  body: {}", body)?,
        }

        match &self.response {
            None => writeln!(f, "  response: <none>")?,
            Some(Envelope::Single(resp)) => writeln!(f, "  response: {}", describe_response(resp))?,
            Some(Envelope::Batch(responses)) => {
                writeln!(f, "  response: batch of {}", responses.len())?;
                for resp in responses {
                    writeln!(f, "    - {}", describe_response(resp))?;
                }
            }
        }

        write!(
            f,
            "  first error: {}",
            self.first_error.as_deref().unwrap_or("<none>")
        )
    }
}
