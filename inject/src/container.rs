//! The `Container`: the resolution root owning the registration graph.

use crate::build_up::BuilderUpperCache;
use crate::builder::ContainerBuilder;
use crate::collection::RegistrationCollection;
use crate::core::{downcast, Instance, ResolutionGuard, TypeKey};
use crate::error::{Error, Result};
use crate::factory::Factory;
use crate::generic::UnboundGeneric;
use crate::injectable::{Injectable, ParameterKind};
use crate::options::{ContainerOptions, DisposeOrder};
use crate::registration::{GetAllRegistration, Registration};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

type Subscriber = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct DisposeState {
  fired: bool,
  subscribers: Vec<Subscriber>,
}

/// The "disposing" notification of a container. Fires once; subscribing
/// afterwards runs the callback immediately.
#[derive(Default)]
struct DisposeNotifier {
  state: Mutex<DisposeState>,
}

impl DisposeNotifier {
  fn subscribe(&self, subscriber: Subscriber) {
    let mut state = self.state.lock();
    if state.fired {
      drop(state);
      subscriber();
    } else {
      state.subscribers.push(subscriber);
    }
  }

  /// Returns `false` if the notification had already fired.
  fn fire(&self, order: DisposeOrder) -> bool {
    let mut subscribers = {
      let mut state = self.state.lock();
      if state.fired {
        return false;
      }
      state.fired = true;
      std::mem::take(&mut state.subscribers)
    };
    if order == DisposeOrder::Reverse {
      subscribers.reverse();
    }
    for subscriber in subscribers {
      subscriber();
    }
    true
  }

  fn is_fired(&self) -> bool {
    self.state.lock().fired
  }
}

pub(crate) struct ContainerInner {
  graph: DashMap<TypeKey, RegistrationCollection>,
  unbound: HashMap<TypeKey, Vec<Arc<UnboundGeneric>>>,
  // Closed key -> every open binding able to serve it, in binding order.
  closable: HashMap<TypeKey, Vec<Arc<UnboundGeneric>>>,
  builder_uppers: BuilderUpperCache,
  parent: Option<Container>,
  children: Mutex<Vec<Weak<ContainerInner>>>,
  disposing: DisposeNotifier,
  options: ContainerOptions,
}

impl Drop for ContainerInner {
  fn drop(&mut self) {
    if self.disposing.fire(self.options.dispose_order) {
      tracing::debug!(registrations = self.graph.len(), "Container dropped and disposed.");
    }
  }
}

/// The dependency-injection container.
///
/// A `Container` is a cheap, cloneable handle. Clones share the same
/// registrations and singletons. The container is disposed by
/// [`dispose`](Container::dispose) or when its last handle is dropped.
///
/// Containers are assembled with a [`ContainerBuilder`] and can be nested:
/// a child built from [`create_child_builder`](Container::create_child_builder)
/// resolves its own bindings first and falls back to its parent.
#[derive(Clone)]
pub struct Container {
  inner: Arc<ContainerInner>,
}

impl Container {
  pub(crate) fn assemble(
    graph: DashMap<TypeKey, RegistrationCollection>,
    generics: Vec<UnboundGeneric>,
    parent: Option<Container>,
    options: ContainerOptions,
  ) -> Self {
    let mut unbound: HashMap<TypeKey, Vec<Arc<UnboundGeneric>>> = HashMap::new();
    let mut closable: HashMap<TypeKey, Vec<Arc<UnboundGeneric>>> = HashMap::new();
    for generic in generics {
      let generic = Arc::new(generic);
      for closed in generic.closed_keys() {
        let servers = closable.entry(closed).or_default();
        if !servers.iter().any(|server| Arc::ptr_eq(server, &generic)) {
          servers.push(generic.clone());
        }
      }
      unbound.entry(generic.key().clone()).or_default().push(generic);
    }

    Self {
      inner: Arc::new(ContainerInner {
        graph,
        unbound,
        closable,
        builder_uppers: BuilderUpperCache::default(),
        parent,
        children: Mutex::new(Vec::new()),
        disposing: DisposeNotifier::default(),
        options,
      }),
    }
  }

  /// Resolves the single registration of `S` under `key`.
  ///
  /// Fails with [`Error::NotFound`] when nothing is registered and with
  /// [`Error::Ambiguous`] when several registrations share the key.
  pub fn get<S: ?Sized + Send + Sync + 'static>(&self, key: Option<&str>) -> Result<Arc<S>> {
    let key = TypeKey::of::<S>(key);
    let instance = self.resolve_erased(&key)?;
    downcast(&instance, &key)
  }

  /// Resolves every registration of `S` under `key`, in registration order.
  /// An unregistered key yields an empty list.
  pub fn get_all<S: ?Sized + Send + Sync + 'static>(&self, key: Option<&str>) -> Result<Vec<Arc<S>>> {
    let key = TypeKey::of::<S>(key);
    self
      .resolve_all_erased(&key)?
      .iter()
      .map(|instance| downcast(instance, &key))
      .collect()
  }

  /// Populates the empty injection points of a caller-owned value.
  pub fn build_up<T: Injectable>(&self, target: &mut T) -> Result<()> {
    self.ensure_live(&TypeKey::of::<T>(None))?;
    let plan = self.inner.builder_uppers.plan_for::<T>();
    plan.build_up(self, target)
  }

  /// Returns a handle that resolves `S` on each call, without keeping this
  /// container alive.
  pub fn factory<S: ?Sized + Send + Sync + 'static>(&self, key: Option<&str>) -> Factory<S> {
    Factory::new(self.downgrade(), TypeKey::of::<S>(key))
  }

  /// Starts configuring a child container. The child inherits this
  /// container's options.
  pub fn create_child_builder(&self) -> ContainerBuilder {
    ContainerBuilder::child_of(self.clone())
  }

  /// Compiles every registration of this container, closing every declared
  /// generic, and returns the first failure.
  pub fn compile(&self) -> Result<()> {
    self.compile_all(true)
  }

  pub(crate) fn compile_all(&self, strict: bool) -> Result<()> {
    let closable: Vec<TypeKey> = self.inner.closable.keys().cloned().collect();
    for key in &closable {
      if let Err(err) = self.close_generic(key) {
        if strict {
          return Err(err);
        }
        tracing::warn!(key = %key, error = %err, "Failed to close generic binding.");
      }
    }

    let registrations: Vec<Arc<dyn Registration>> = self
      .inner
      .graph
      .iter()
      .flat_map(|entry| entry.value().registrations().to_vec())
      .collect();
    for registration in registrations {
      if let Err(err) = registration.generator(self) {
        if strict {
          return Err(err);
        }
        tracing::warn!(key = %registration.key(), error = %err, "Failed to compile registration.");
      }
    }
    Ok(())
  }

  /// Disposes every singleton this container realized and fires its
  /// disposing notification. Children are not affected.
  ///
  /// Calling `dispose` more than once has no further effect.
  pub fn dispose(&self) {
    if self.inner.disposing.fire(self.inner.options.dispose_order) {
      tracing::debug!(registrations = self.inner.graph.len(), "Container disposed.");
    }
  }

  /// Registers a callback run when the container is disposed. If it already
  /// has been, the callback runs immediately.
  pub fn on_disposing(&self, callback: impl FnOnce() + Send + 'static) {
    self.subscribe_disposing(callback);
  }

  pub fn is_disposed(&self) -> bool {
    self.inner.disposing.is_fired()
  }

  pub fn parent(&self) -> Option<&Container> {
    self.inner.parent.as_ref()
  }

  /// The number of child containers still alive.
  pub fn live_children(&self) -> usize {
    let mut children = self.inner.children.lock();
    children.retain(|child| child.strong_count() > 0);
    children.len()
  }

  pub fn options(&self) -> ContainerOptions {
    self.inner.options
  }

  // --- Crate-internal resolution ---

  pub(crate) fn downgrade(&self) -> Weak<ContainerInner> {
    Arc::downgrade(&self.inner)
  }

  pub(crate) fn upgrade(inner: &Weak<ContainerInner>) -> Option<Container> {
    inner.upgrade().map(|inner| Container { inner })
  }

  pub(crate) fn builder_uppers(&self) -> &BuilderUpperCache {
    &self.inner.builder_uppers
  }

  pub(crate) fn subscribe_disposing(&self, callback: impl FnOnce() + Send + 'static) {
    self.inner.disposing.subscribe(Box::new(callback));
  }

  pub(crate) fn adopt(&self, child: &Container) {
    let mut children = self.inner.children.lock();
    children.retain(|child| child.strong_count() > 0);
    children.push(child.downgrade());
  }

  fn ensure_live(&self, key: &TypeKey) -> Result<()> {
    if self.is_disposed() {
      return Err(Error::AlreadyDisposed { key: key.clone() });
    }
    Ok(())
  }

  /// Finds the collection for `key`: this container's graph first, then its
  /// closable generics, then the parent chain. Returns the owning container
  /// alongside the collection.
  pub(crate) fn find(&self, key: &TypeKey) -> Result<Option<(Container, RegistrationCollection)>> {
    let own = self.inner.graph.get(key).map(|entry| entry.value().clone());
    if let Some(collection) = own {
      return Ok(Some((self.clone(), collection)));
    }
    if let Some(collection) = self.close_generic(key)? {
      return Ok(Some((self.clone(), collection)));
    }
    match &self.inner.parent {
      Some(parent) => parent.find(key),
      None => Ok(None),
    }
  }

  /// Closes the open bindings able to serve `key` and inserts the result
  /// into the graph. When another thread closed it first, its collection
  /// wins and ours is discarded.
  fn close_generic(&self, key: &TypeKey) -> Result<Option<RegistrationCollection>> {
    let Some(bindings) = self.inner.closable.get(key) else {
      return Ok(None);
    };

    let mut closed: Option<RegistrationCollection> = None;
    for binding in bindings {
      let Some(registration) = binding.close(key) else {
        continue;
      };
      match closed.as_mut() {
        Some(collection) => {
          collection.add(registration)?;
        }
        None => closed = Some(RegistrationCollection::new(registration)),
      }
    }
    let Some(closed) = closed else {
      return Ok(None);
    };

    let collection = match self.inner.graph.entry(key.clone()) {
      Entry::Occupied(existing) => existing.get().clone(),
      Entry::Vacant(slot) => {
        tracing::debug!(key = %key, registrations = closed.len(), "Closed generic binding.");
        slot.insert(closed.clone());
        closed
      }
    };
    Ok(Some(collection))
  }

  fn lookup(&self, key: &TypeKey) -> Result<(Container, Arc<dyn Registration>)> {
    let (owner, collection) = self
      .find(key)?
      .ok_or_else(|| Error::NotFound { key: key.clone() })?;
    let registration = collection.single(key)?.clone();
    Ok((owner, registration))
  }

  /// Whether a parameter of `kind` for `key` would be injected.
  pub(crate) fn can_satisfy(&self, kind: ParameterKind, key: &TypeKey) -> bool {
    let count = match self.find(key) {
      Ok(found) => found.map_or(0, |(_, collection)| collection.len()),
      Err(err) => {
        tracing::debug!(key = %key, error = %err, "Treating key as unresolvable.");
        0
      }
    };
    match kind {
      ParameterKind::Collection => count > 0,
      ParameterKind::Service | ParameterKind::Factory => count == 1,
    }
  }

  pub(crate) fn resolve_erased(&self, key: &TypeKey) -> Result<Instance> {
    self.ensure_live(key)?;
    tracing::trace!(key = %key, "Resolving service.");
    let (owner, registration) = self.lookup(key)?;
    owner.invoke(&registration)
  }

  pub(crate) fn resolve_all_erased(&self, key: &TypeKey) -> Result<Vec<Instance>> {
    self.ensure_live(key)?;
    tracing::trace!(key = %key, "Resolving all services.");
    GetAllRegistration::new(key.clone()).instances(self)
  }

  /// Runs `registration`'s generator against this container, which must be
  /// the container owning the registration.
  pub(crate) fn invoke(&self, registration: &Arc<dyn Registration>) -> Result<Instance> {
    self.ensure_live(registration.key())?;
    let id = Arc::as_ptr(registration) as *const () as usize;
    let _guard = ResolutionGuard::enter(id, registration.key())?;
    let generator = registration.generator(self)?;
    generator(self)
  }
}

impl fmt::Debug for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Container")
      .field("registrations", &self.inner.graph.len())
      .field("open_generics", &self.inner.unbound.len())
      .field("has_parent", &self.inner.parent.is_some())
      .field("disposed", &self.is_disposed())
      .finish_non_exhaustive()
  }
}
