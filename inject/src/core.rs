//! Core data structures shared by every part of the engine: service identity,
//! erased instances and the circular-dependency guard.

use crate::error::{Error, Result};
use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

thread_local! {
  // The registrations currently being instantiated on this thread, in order.
  // Re-entering one of them means the object graph is circular.
  static RESOLVING_STACK: RefCell<Vec<(usize, TypeKey)>> = const { RefCell::new(Vec::new()) };
}

/// An RAII guard that turns a circular dependency into an [`Error::Cycle`].
///
/// Entering pushes a registration onto the thread-local resolution stack and
/// fails if it is already there. Dropping the guard pops it again.
pub(crate) struct ResolutionGuard {
  id: usize,
}

impl ResolutionGuard {
  pub(crate) fn enter(id: usize, key: &TypeKey) -> Result<Self> {
    RESOLVING_STACK.with(|stack| {
      let mut stack = stack.borrow_mut();
      if let Some(start) = stack.iter().position(|(entry, _)| *entry == id) {
        let mut path: Vec<String> = stack[start..].iter().map(|(_, key)| key.to_string()).collect();
        path.push(key.to_string());
        return Err(Error::Cycle { path });
      }
      stack.push((id, key.clone()));
      Ok(Self { id })
    })
  }
}

impl Drop for ResolutionGuard {
  fn drop(&mut self) {
    RESOLVING_STACK.with(|stack| {
      let mut stack = stack.borrow_mut();
      if let Some(index) = stack.iter().rposition(|(entry, _)| *entry == self.id) {
        stack.remove(index);
      }
    });
  }
}

/// The runtime identity of a Rust type, carrying its name for diagnostics.
///
/// Two `ServiceType`s are equal when their `TypeId`s are equal.
#[derive(Clone, Copy)]
pub struct ServiceType {
  id: TypeId,
  name: &'static str,
}

impl ServiceType {
  pub fn of<T: ?Sized + 'static>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: type_name::<T>(),
    }
  }

  pub fn id(&self) -> TypeId {
    self.id
  }

  pub fn name(&self) -> &'static str {
    self.name
  }
}

impl PartialEq for ServiceType {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

impl fmt::Debug for ServiceType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}

impl fmt::Display for ServiceType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}

/// The identity of a bindable and resolvable slot: a service type plus an
/// optional string key.
///
/// An unkeyed `TypeKey` is a slot of its own. It is never matched by a keyed
/// request, and vice versa.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeKey {
  service: ServiceType,
  key: Option<String>,
}

impl TypeKey {
  pub fn new(service: ServiceType, key: Option<String>) -> Self {
    Self { service, key }
  }

  pub fn of<T: ?Sized + 'static>(key: Option<&str>) -> Self {
    Self::new(ServiceType::of::<T>(), key.map(str::to_owned))
  }

  pub fn service(&self) -> ServiceType {
    self.service
  }

  pub fn key(&self) -> Option<&str> {
    self.key.as_deref()
  }

  pub(crate) fn with_key(mut self, key: impl Into<String>) -> Self {
    self.key = Some(key.into());
    self
  }
}

impl fmt::Debug for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.key {
      Some(key) => write!(f, "Key(Type({}), Name({}))", self.service.name, key),
      None => write!(f, "Key(Type({}))", self.service.name),
    }
  }
}

impl fmt::Display for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.key {
      Some(key) => write!(f, "{} (key \"{}\")", self.service.name, key),
      None => f.write_str(self.service.name),
    }
  }
}

/// A type-erased service instance. It always holds an `Arc<S>` where `S` is
/// the service type of the `TypeKey` it was produced for.
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

/// Runs an instance's dispose hook.
pub(crate) type Teardown = Box<dyn FnOnce() + Send>;

/// The output of a compiled creation plan.
pub(crate) struct Created {
  pub(crate) instance: Instance,
  pub(crate) teardown: Option<Teardown>,
}

pub(crate) fn erase<S: ?Sized + Send + Sync + 'static>(service: Arc<S>) -> Instance {
  Arc::new(service)
}

pub(crate) fn downcast<S: ?Sized + Send + Sync + 'static>(
  instance: &Instance,
  key: &TypeKey,
) -> Result<Arc<S>> {
  instance
    .downcast_ref::<Arc<S>>()
    .cloned()
    .ok_or_else(|| Error::TypeMismatch {
      key: key.clone(),
      expected: type_name::<S>(),
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Alpha;
  struct Beta;

  #[test]
  fn test_keyed_and_unkeyed_keys_are_distinct() {
    let unkeyed = TypeKey::of::<Alpha>(None);
    let keyed = TypeKey::of::<Alpha>(Some("primary"));

    assert_ne!(unkeyed, keyed);
    assert_eq!(keyed, TypeKey::of::<Alpha>(Some("primary")));
    assert_ne!(keyed, TypeKey::of::<Beta>(Some("primary")));
  }

  #[test]
  fn test_guard_reports_the_cycle_path() {
    let a = TypeKey::of::<Alpha>(None);
    let b = TypeKey::of::<Beta>(None);

    let _outer = ResolutionGuard::enter(1, &a).unwrap();
    let _inner = ResolutionGuard::enter(2, &b).unwrap();
    let err = ResolutionGuard::enter(1, &a).err().unwrap();

    match err {
      Error::Cycle { path } => assert_eq!(path.len(), 3),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn test_guard_pops_on_drop() {
    let a = TypeKey::of::<Alpha>(None);
    {
      let _guard = ResolutionGuard::enter(7, &a).unwrap();
    }
    assert!(ResolutionGuard::enter(7, &a).is_ok());
  }
}
