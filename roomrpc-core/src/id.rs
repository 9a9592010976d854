//! Request id generation.
//!
//! Every invocation gets a fresh id. Uniqueness is the generator's guarantee; the binder
//! never checks for collisions.
use std::fmt::Debug;
use uuid::Uuid;

/// Produces a fresh, process-unique id for every request envelope.
pub trait IdGenerator: Send + Sync + Debug {
    fn generate_id(&self) -> String;
}

/// The default generator: random (v4) UUIDs in their 36 character hyphenated form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4;

impl IdGenerator for UuidV4 {
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
