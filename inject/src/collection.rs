//! Per-key registration collections and the weak/normal merge rules.

use crate::core::TypeKey;
use crate::error::{Error, RegistrationError, Result};
use crate::registration::Registration;
use std::sync::Arc;

/// The outcome of adding a registration to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Merge {
  Added,
  /// A normal registration replaced this many weak ones.
  Replaced(usize),
  /// A weak registration lost to what was already there.
  Ignored,
}

/// The registrations bound to one `TypeKey`.
#[derive(Clone)]
pub(crate) enum RegistrationCollection {
  Single(Arc<dyn Registration>),
  Multiple(Vec<Arc<dyn Registration>>),
}

impl RegistrationCollection {
  pub(crate) fn new(registration: Arc<dyn Registration>) -> Self {
    Self::Single(registration)
  }

  pub(crate) fn registrations(&self) -> &[Arc<dyn Registration>] {
    match self {
      Self::Single(registration) => std::slice::from_ref(registration),
      Self::Multiple(registrations) => registrations,
    }
  }

  pub(crate) fn len(&self) -> usize {
    self.registrations().len()
  }

  /// Returns the only registration, failing when there are several.
  pub(crate) fn single(&self, key: &TypeKey) -> Result<&Arc<dyn Registration>> {
    match self.registrations() {
      [registration] => Ok(registration),
      [] => Err(Error::NotFound { key: key.clone() }),
      many => Err(Error::Ambiguous {
        key: key.clone(),
        count: many.len(),
      }),
    }
  }

  /// Adds `registration` under the weak/normal merge rules.
  ///
  /// - A weak registration never displaces a normal one, and is dropped if a
  ///   weak registration of the same implementation is already present.
  /// - A normal registration replaces every existing registration when they
  ///   are all weak.
  /// - Two normal registrations of the same implementation are a
  ///   `RegistrationError::Duplicate`.
  pub(crate) fn add(&mut self, registration: Arc<dyn Registration>) -> Result<Merge> {
    let existing = self.registrations();
    let all_weak = existing.iter().all(|r| r.is_weak());
    let implementation = registration.implementation();

    let (mut next, merge) = if registration.is_weak() {
      if !all_weak || existing.iter().any(|r| r.implementation() == implementation) {
        return Ok(Merge::Ignored);
      }
      let mut next = existing.to_vec();
      next.push(registration);
      (next, Merge::Added)
    } else if all_weak {
      (vec![registration], Merge::Replaced(existing.len()))
    } else {
      if existing
        .iter()
        .any(|r| !r.is_weak() && r.implementation() == implementation)
      {
        return Err(
          RegistrationError::Duplicate {
            key: registration.key().clone(),
            implementation: implementation.name(),
          }
          .into(),
        );
      }
      let mut next = existing.to_vec();
      next.push(registration);
      (next, Merge::Added)
    };

    *self = match next.len() {
      1 => Self::Single(next.remove(0)),
      _ => Self::Multiple(next),
    };
    Ok(merge)
  }
}
