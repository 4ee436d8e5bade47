//! Sequential identifier generator
//!
//! The counter starts at `RecordId::FIRST_USER` and only moves forward:
//! - `next_id` issues the counter value and advances it by one
//! - `update_on_sync` advances it past identifiers observed in
//!   synchronized events, never rewinding it
//!
//! A generator is per-session state. Callers serialize access per
//! partition, mirroring the single writer per partition log.

use std::fmt;

use crate::appdef::TypeDef;

use super::errors::{HookError, IdError, IdResult};
use super::record_id::RecordId;

/// Resolves raw identifiers to storage identifiers.
pub trait IdGenerator {
    /// Issues the storage identifier for a raw identifier of the given type.
    fn next_id(&mut self, raw_id: RecordId, def: &TypeDef) -> IdResult<RecordId>;

    /// Advances the generator past an identifier observed in a synchronized event.
    fn update_on_sync(&mut self, observed: RecordId, def: &TypeDef);
}

/// Hook invoked with (raw id, storage id) before an identifier is issued.
pub type GenerationHook = Box<dyn FnMut(RecordId, RecordId) -> Result<(), HookError> + Send>;

/// Monotonic counter-based generator.
pub struct SequentialIdGenerator {
    next: u64,
    hook: Option<GenerationHook>,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(RecordId::FIRST_USER)
    }

    /// Creates a generator whose first issued identifier is `first`.
    pub fn starting_at(first: RecordId) -> Self {
        Self {
            next: first.value().max(RecordId::FIRST_USER.value()),
            hook: None,
        }
    }

    /// Registers a hook that may reject generation.
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(RecordId, RecordId) -> Result<(), HookError> + Send + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Returns the identifier the next `next_id` call would issue.
    pub fn peek(&self) -> RecordId {
        RecordId::new(self.next)
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SequentialIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequentialIdGenerator")
            .field("next", &self.next)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self, raw_id: RecordId, _def: &TypeDef) -> IdResult<RecordId> {
        let storage_id = RecordId::new(self.next);
        let advanced = self.next.checked_add(1).ok_or(IdError::Exhausted)?;

        if let Some(hook) = self.hook.as_mut() {
            hook(raw_id, storage_id).map_err(|source| IdError::Rejected {
                raw_id,
                storage_id,
                source,
            })?;
        }

        self.next = advanced;
        Ok(storage_id)
    }

    fn update_on_sync(&mut self, observed: RecordId, _def: &TypeDef) {
        if !observed.is_user() {
            return;
        }
        if observed.value() >= self.next {
            self.next = observed.value().saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appdef::{QName, TypeKind};

    fn def() -> TypeDef {
        TypeDef::new(QName::new("test", "Doc"), TypeKind::Document)
    }

    #[test]
    fn test_ids_increase_by_one() {
        let mut gen = SequentialIdGenerator::new();
        let def = def();
        let mut prev = gen.next_id(RecordId::new(1), &def).unwrap();
        assert_eq!(prev, RecordId::FIRST_USER);
        for raw in 2..100 {
            let id = gen.next_id(RecordId::new(raw), &def).unwrap();
            assert_eq!(id.value(), prev.value() + 1);
            prev = id;
        }
    }

    #[test]
    fn test_update_on_sync_moves_forward() {
        let mut gen = SequentialIdGenerator::new();
        let def = def();
        let observed = RecordId::new(RecordId::FIRST_USER.value() + 1000);
        gen.update_on_sync(observed, &def);
        assert_eq!(gen.next_id(RecordId::new(1), &def).unwrap().value(), observed.value() + 1);
    }

    #[test]
    fn test_update_on_sync_never_rewinds() {
        let mut gen = SequentialIdGenerator::new();
        let def = def();
        for raw in 1..=10 {
            gen.next_id(RecordId::new(raw), &def).unwrap();
        }
        let before = gen.peek();
        gen.update_on_sync(RecordId::FIRST_USER, &def);
        assert_eq!(gen.peek(), before);
    }

    #[test]
    fn test_update_on_sync_ignores_reserved_ranges() {
        let mut gen = SequentialIdGenerator::new();
        let def = def();
        gen.update_on_sync(RecordId::MAX_RAW, &def);
        gen.update_on_sync(RecordId::FIRST_SINGLETON, &def);
        assert_eq!(gen.peek(), RecordId::FIRST_USER);
    }

    #[test]
    fn test_hook_rejection_propagates() {
        let mut gen = SequentialIdGenerator::new().with_hook(|raw, _storage| {
            if raw.value() == 2 {
                Err("allocation failed".into())
            } else {
                Ok(())
            }
        });
        let def = def();

        assert!(gen.next_id(RecordId::new(1), &def).is_ok());
        let err = gen.next_id(RecordId::new(2), &def).unwrap_err();
        assert!(matches!(err, IdError::Rejected { .. }));
        assert!(err.to_string().contains("allocation failed"));

        // rejected id is not consumed
        let next = gen.next_id(RecordId::new(3), &def).unwrap();
        assert_eq!(next.value(), RecordId::FIRST_USER.value() + 1);
    }
}
