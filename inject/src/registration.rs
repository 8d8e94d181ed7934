//! Lifetime policies. A registration owns a creator and hands out a compiled
//! generator that produces instances for its `TypeKey`.

use crate::container::Container;
use crate::core::{Instance, ServiceType, Teardown, TypeKey};
use crate::creator::{Creator, Plan};
use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A compiled resolution routine for one registration.
pub(crate) type Generator = Arc<dyn Fn(&Container) -> Result<Instance> + Send + Sync>;

pub(crate) trait Registration: Send + Sync {
  fn key(&self) -> &TypeKey;

  /// The concrete type this registration produces, used by the merge rules.
  fn implementation(&self) -> ServiceType;

  fn is_weak(&self) -> bool;

  /// Returns the generator, compiling it on first call. Compilation happens
  /// at most once even under concurrent first requests.
  fn generator(&self, container: &Container) -> Result<Generator>;
}

/// Produces a fresh instance on every resolution.
pub(crate) struct TransientRegistration {
  key: TypeKey,
  weak: bool,
  creator: Arc<dyn Creator>,
  generator: OnceCell<Generator>,
}

impl TransientRegistration {
  pub(crate) fn new(key: TypeKey, creator: Arc<dyn Creator>, weak: bool) -> Self {
    Self {
      key,
      weak,
      creator,
      generator: OnceCell::new(),
    }
  }
}

impl Registration for TransientRegistration {
  fn key(&self) -> &TypeKey {
    &self.key
  }

  fn implementation(&self) -> ServiceType {
    self.creator.implementation()
  }

  fn is_weak(&self) -> bool {
    self.weak
  }

  fn generator(&self, container: &Container) -> Result<Generator> {
    self
      .generator
      .get_or_try_init(|| {
        let plan = self.creator.compile(container)?;
        tracing::debug!(key = %self.key, implementation = %self.implementation(), "Compiled transient generator.");
        let generator: Generator = Arc::new(move |container: &Container| plan(container).map(|created| created.instance));
        Ok(generator)
      })
      .cloned()
  }
}

/// The realized state of a singleton, shared between its registration and
/// the disposing subscription on the owning container.
struct SingletonSlot {
  key: TypeKey,
  instance: RwLock<OnceCell<Instance>>,
  teardown: Mutex<Option<Teardown>>,
  disposed: AtomicBool,
}

impl SingletonSlot {
  fn realize(self: &Arc<Self>, container: &Container, plan: &Plan) -> Result<Instance> {
    let mut realized_now = false;
    let instance = {
      let cell = self.instance.read();
      if self.disposed.load(Ordering::Acquire) {
        return Err(Error::AlreadyDisposed { key: self.key.clone() });
      }
      cell
        .get_or_try_init(|| {
          let created = plan(container)?;
          *self.teardown.lock() = created.teardown;
          realized_now = true;
          Ok::<_, Error>(created.instance)
        })?
        .clone()
    };

    // Subscribing may dispose the slot on the spot if the container is
    // already going away, so the read lock must be released first.
    if realized_now {
      tracing::debug!(key = %self.key, "Realized singleton.");
      let slot = Arc::clone(self);
      container.subscribe_disposing(move || slot.dispose());
    }
    Ok(instance)
  }

  fn dispose(&self) {
    self.disposed.store(true, Ordering::Release);
    let instance = self.instance.write().take();
    let teardown = self.teardown.lock().take();
    if let Some(teardown) = teardown {
      tracing::debug!(key = %self.key, "Disposing singleton.");
      teardown();
    }
    drop(instance);
  }
}

/// Produces one instance per owning container and caches it until the
/// container is disposed.
pub(crate) struct SingletonRegistration {
  key: TypeKey,
  weak: bool,
  creator: Arc<dyn Creator>,
  slot: Arc<SingletonSlot>,
  generator: OnceCell<Generator>,
}

impl SingletonRegistration {
  pub(crate) fn new(key: TypeKey, creator: Arc<dyn Creator>, weak: bool) -> Self {
    Self {
      slot: Arc::new(SingletonSlot {
        key: key.clone(),
        instance: RwLock::new(OnceCell::new()),
        teardown: Mutex::new(None),
        disposed: AtomicBool::new(false),
      }),
      key,
      weak,
      creator,
      generator: OnceCell::new(),
    }
  }
}

impl Registration for SingletonRegistration {
  fn key(&self) -> &TypeKey {
    &self.key
  }

  fn implementation(&self) -> ServiceType {
    self.creator.implementation()
  }

  fn is_weak(&self) -> bool {
    self.weak
  }

  fn generator(&self, container: &Container) -> Result<Generator> {
    self
      .generator
      .get_or_try_init(|| {
        let plan = self.creator.compile(container)?;
        tracing::debug!(key = %self.key, implementation = %self.implementation(), "Compiled singleton generator.");
        let slot = self.slot.clone();
        let generator: Generator = Arc::new(move |container: &Container| slot.realize(container, &plan));
        Ok(generator)
      })
      .cloned()
  }
}

/// Returns a caller-supplied value. The container never disposes it.
pub(crate) struct InstanceRegistration {
  key: TypeKey,
  weak: bool,
  implementation: ServiceType,
  instance: Instance,
}

impl InstanceRegistration {
  pub(crate) fn new(key: TypeKey, implementation: ServiceType, instance: Instance, weak: bool) -> Self {
    Self {
      key,
      weak,
      implementation,
      instance,
    }
  }
}

impl Registration for InstanceRegistration {
  fn key(&self) -> &TypeKey {
    &self.key
  }

  fn implementation(&self) -> ServiceType {
    self.implementation
  }

  fn is_weak(&self) -> bool {
    self.weak
  }

  fn generator(&self, _container: &Container) -> Result<Generator> {
    let instance = self.instance.clone();
    Ok(Arc::new(move |_: &Container| Ok(instance.clone())))
  }
}

/// Resolves every registration sharing a `TypeKey`, in registration order.
///
/// Nothing is cached: the collection is re-queried on each call, so
/// transient members yield fresh instances every time while singleton
/// members yield the same ones.
pub(crate) struct GetAllRegistration {
  key: TypeKey,
}

impl GetAllRegistration {
  pub(crate) fn new(key: TypeKey) -> Self {
    Self { key }
  }

  pub(crate) fn instances(&self, container: &Container) -> Result<Vec<Instance>> {
    let Some((owner, collection)) = container.find(&self.key)? else {
      return Ok(Vec::new());
    };
    collection
      .registrations()
      .iter()
      .map(|registration| owner.invoke(registration))
      .collect()
  }
}
