//! Request id generation

use uuid::Uuid;

use crate::types::RequestId;

/// Produce a fresh request id.
///
/// Ids are random v4 UUIDs rendered as strings, so concurrent callers never
/// need to coordinate.
pub fn generate_id() -> RequestId {
    RequestId::String(Uuid::new_v4().to_string())
}

/// Endless source of fresh ids
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl Iterator for IdGenerator {
    type Item = RequestId;

    fn next(&mut self) -> Option<RequestId> {
        Some(generate_id())
    }
}
