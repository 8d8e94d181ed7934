//! The fluent configuration surface.

use crate::catalog::TypeCatalog;
use crate::collection::{Merge, RegistrationCollection};
use crate::container::Container;
use crate::core::{erase, Instance, ServiceType, TypeKey};
use crate::creator::{AbstractFactoryCreator, Creator, FactoryCreator, TypeCreator};
use crate::error::{RegistrationError, Result};
use crate::factory::AbstractFactory;
use crate::generic::{Closer, GenericImplementation, GenericService, OpenGeneric, TypeArgs, UnboundGeneric};
use crate::injectable::{Implements, Injectable};
use crate::options::{CompileMode, ContainerOptions};
use crate::registration::{InstanceRegistration, Registration, SingletonRegistration, TransientRegistration};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A reusable group of bindings.
pub trait Module {
  fn load(&self, builder: &mut ContainerBuilder);
}

enum BindingTarget {
  Unset,
  Creator(Arc<dyn Creator>),
  Instance {
    instance: Instance,
    implementation: ServiceType,
  },
  Candidates(Vec<Arc<dyn Creator>>),
  Open {
    service_arity: usize,
    implementation: &'static str,
    implementation_arity: usize,
    closers: Vec<Closer>,
  },
}

struct PendingBinding {
  service: ServiceType,
  key: Option<String>,
  target: BindingTarget,
  singleton: bool,
  weak: bool,
  allow_zero: bool,
}

impl PendingBinding {
  fn new(service: ServiceType) -> Self {
    Self {
      service,
      key: None,
      target: BindingTarget::Unset,
      singleton: false,
      weak: false,
      allow_zero: false,
    }
  }

  fn type_key(&self) -> TypeKey {
    TypeKey::new(self.service, self.key.clone())
  }
}

/// Accumulates bindings and builds a [`Container`].
///
/// Bindings are validated and merged only in [`build`](Self::build), so the
/// order they are declared in matters only for `get_all` ordering.
pub struct ContainerBuilder {
  parent: Option<Container>,
  options: ContainerOptions,
  bindings: Vec<PendingBinding>,
}

impl Default for ContainerBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for ContainerBuilder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ContainerBuilder")
      .field("options", &self.options)
      .field("bindings", &self.bindings.len())
      .field("has_parent", &self.parent.is_some())
      .finish()
  }
}

impl ContainerBuilder {
  pub fn new() -> Self {
    Self {
      parent: None,
      options: ContainerOptions::default(),
      bindings: Vec::new(),
    }
  }

  pub(crate) fn child_of(parent: Container) -> Self {
    Self {
      options: parent.options(),
      parent: Some(parent),
      bindings: Vec::new(),
    }
  }

  pub fn with_options(mut self, options: ContainerOptions) -> Self {
    self.options = options;
    self
  }

  pub fn options(&self) -> ContainerOptions {
    self.options
  }

  fn push(&mut self, binding: PendingBinding) -> &mut PendingBinding {
    self.bindings.push(binding);
    let last = self.bindings.len() - 1;
    &mut self.bindings[last]
  }

  /// Starts a binding for the service `S`.
  pub fn bind<S: ?Sized + Send + Sync + 'static>(&mut self) -> BindTo<'_, S> {
    BindTo {
      binding: self.push(PendingBinding::new(ServiceType::of::<S>())),
      _marker: PhantomData,
    }
  }

  /// Starts a binding for the open service family `SF`.
  pub fn bind_open<SF: OpenGeneric>(&mut self) -> OpenBindTo<'_, SF> {
    OpenBindTo {
      binding: self.push(PendingBinding::new(ServiceType::of::<SF>())),
      _marker: PhantomData,
    }
  }

  /// Binds every type in `catalogs` to itself as a weak binding. Types that
  /// cannot be constructed are skipped.
  pub fn autobind(&mut self, catalogs: &[&TypeCatalog]) -> &mut Self {
    let mut seen = Vec::new();
    for entry in catalogs.iter().flat_map(|catalog| catalog.implementations()) {
      if seen.contains(&entry.implementation) {
        continue;
      }
      seen.push(entry.implementation);
      let binding = self.push(PendingBinding::new(entry.service));
      binding.target = BindingTarget::Candidates(vec![(entry.make)()]);
      binding.weak = true;
      binding.allow_zero = true;
    }
    self
  }

  pub fn add_module(&mut self, module: &dyn Module) -> &mut Self {
    module.load(self);
    self
  }

  /// Validates every binding, merges them into a new container and, for a
  /// child builder, attaches the container to its parent.
  pub fn build(self) -> Result<Container> {
    let graph = DashMap::new();
    let mut generics = Vec::new();

    for binding in self.bindings {
      let key = binding.type_key();
      match binding.target {
        BindingTarget::Unset => return Err(RegistrationError::Incomplete { key }.into()),
        BindingTarget::Creator(creator) => {
          creator.validate(&key)?;
          insert(&graph, lifetime(key, creator, binding.singleton, binding.weak))?;
        }
        BindingTarget::Instance {
          instance,
          implementation,
        } => {
          let registration = InstanceRegistration::new(key, implementation, instance, binding.weak);
          insert(&graph, Arc::new(registration))?;
        }
        BindingTarget::Candidates(creators) => {
          let mut bound = 0;
          for creator in creators {
            let implementation = creator.implementation();
            let registration = lifetime(key.clone(), creator.clone(), binding.singleton, binding.weak);
            match creator
              .validate(&key)
              .and_then(|()| insert(&graph, registration))
            {
              Ok(_) => bound += 1,
              Err(err) => {
                tracing::warn!(key = %key, implementation = %implementation, error = %err, "Skipping candidate implementation.");
              }
            }
          }
          if bound == 0 && !binding.allow_zero {
            return Err(RegistrationError::NoImplementations { key }.into());
          }
        }
        BindingTarget::Open {
          service_arity,
          implementation,
          implementation_arity,
          closers,
        } => {
          let generic = UnboundGeneric::new(
            key,
            service_arity,
            implementation,
            implementation_arity,
            binding.weak,
            closers,
          );
          generic.validate(binding.singleton)?;
          merge_open(&mut generics, generic)?;
        }
      }
    }

    let container = Container::assemble(graph, generics, self.parent.clone(), self.options);
    if let Some(parent) = &self.parent {
      parent.adopt(&container);
    }
    match self.options.compile {
      CompileMode::Lazy => {}
      CompileMode::Eager => container.compile_all(true)?,
      CompileMode::EagerLenient => container.compile_all(false)?,
    }
    tracing::debug!(options = ?self.options, child = self.parent.is_some(), "Container built.");
    Ok(container)
  }
}

/// Adds an open binding under the same weak/normal rules as closed ones,
/// compared per open key and implementation family.
fn merge_open(generics: &mut Vec<UnboundGeneric>, generic: UnboundGeneric) -> Result<()> {
  let key = generic.key().clone();
  let implementation = generic.implementation();
  let same_key: Vec<&UnboundGeneric> = generics.iter().filter(|existing| existing.key() == &key).collect();
  let has_normal = same_key.iter().any(|existing| !existing.is_weak());
  let same_family = same_key.iter().any(|existing| existing.implementation() == implementation);
  let normal_family = same_key
    .iter()
    .any(|existing| !existing.is_weak() && existing.implementation() == implementation);

  if generic.is_weak() {
    if has_normal || same_family {
      tracing::debug!(key = %key, implementation, "Weak open binding ignored.");
      return Ok(());
    }
  } else if !has_normal {
    let before = generics.len();
    generics.retain(|existing| existing.key() != &key);
    let replaced = before - generics.len();
    if replaced > 0 {
      tracing::debug!(key = %key, implementation, replaced, "Normal open binding superseded weak bindings.");
    }
  } else if normal_family {
    return Err(RegistrationError::Duplicate { key, implementation }.into());
  }

  tracing::debug!(key = %key, implementation, "Registered open binding.");
  generics.push(generic);
  Ok(())
}

fn lifetime(key: TypeKey, creator: Arc<dyn Creator>, singleton: bool, weak: bool) -> Arc<dyn Registration> {
  if singleton {
    Arc::new(SingletonRegistration::new(key, creator, weak))
  } else {
    Arc::new(TransientRegistration::new(key, creator, weak))
  }
}

fn insert(graph: &DashMap<TypeKey, RegistrationCollection>, registration: Arc<dyn Registration>) -> Result<Merge> {
  let key = registration.key().clone();
  let implementation = registration.implementation();
  let merge = match graph.entry(key.clone()) {
    Entry::Occupied(mut existing) => existing.get_mut().add(registration)?,
    Entry::Vacant(slot) => {
      slot.insert(RegistrationCollection::new(registration));
      Merge::Added
    }
  };
  match merge {
    Merge::Added => tracing::debug!(key = %key, implementation = %implementation, "Registered binding."),
    Merge::Replaced(count) => {
      tracing::debug!(key = %key, implementation = %implementation, replaced = count, "Normal binding superseded weak bindings.")
    }
    Merge::Ignored => tracing::debug!(key = %key, implementation = %implementation, "Weak binding ignored."),
  }
  Ok(merge)
}

/// Chooses what a binding for `S` resolves to.
pub struct BindTo<'a, S: ?Sized> {
  binding: &'a mut PendingBinding,
  _marker: PhantomData<fn() -> Arc<S>>,
}

impl<'a, S: ?Sized + Send + Sync + 'static> BindTo<'a, S> {
  fn target(self, target: BindingTarget) -> BindingOptions<'a> {
    self.binding.target = target;
    BindingOptions { binding: self.binding }
  }

  /// Constructs `S` itself.
  pub fn to_self(self) -> BindingOptions<'a>
  where
    S: Injectable,
  {
    self.to::<S>()
  }

  /// Constructs the implementation `I`.
  pub fn to<I: Injectable + Implements<S>>(self) -> BindingOptions<'a> {
    self.target(BindingTarget::Creator(Arc::new(TypeCreator::<S, I>::new())))
  }

  /// Calls `factory` to produce each instance. The value is still built up
  /// before it is handed out.
  pub fn to_factory<I, F>(self, factory: F) -> BindingOptions<'a>
  where
    I: Injectable + Implements<S>,
    F: Fn(&Container) -> Result<I> + Send + Sync + 'static,
  {
    self.target(BindingTarget::Creator(Arc::new(FactoryCreator::<S, I>::new(factory))))
  }

  /// Always resolves to `value`. The container never disposes it.
  pub fn to_instance<I: Implements<S>>(self, value: I) -> BindingOptions<'a> {
    let instance = erase::<S>(<I as Implements<S>>::upcast(Arc::new(value)));
    self.target(BindingTarget::Instance {
      instance,
      implementation: ServiceType::of::<I>(),
    })
  }

  /// Resolves to the implementation `F` of an abstract factory trait.
  pub fn to_abstract_factory<F: AbstractFactory + Implements<S>>(self) -> BindingOptions<'a> {
    self.target(BindingTarget::Creator(Arc::new(AbstractFactoryCreator::<S, F>::new())))
  }

  /// Binds every catalogued implementation of `S`. Candidates that fail
  /// validation are logged and skipped.
  pub fn to_all_implementations(self, catalogs: &[&TypeCatalog]) -> BindingOptions<'a> {
    let service = ServiceType::of::<S>();
    let mut seen = Vec::new();
    let mut creators = Vec::new();
    for entry in catalogs.iter().flat_map(|catalog| catalog.providers(service)) {
      if !seen.contains(&entry.implementation) {
        seen.push(entry.implementation);
        creators.push((entry.make)());
      }
    }
    self.target(BindingTarget::Candidates(creators))
  }
}

/// Modifiers applied to a binding after its target is chosen.
pub struct BindingOptions<'a> {
  binding: &'a mut PendingBinding,
}

impl BindingOptions<'_> {
  pub fn with_key(self, key: impl Into<String>) -> Self {
    self.binding.key = Some(key.into());
    self
  }

  pub fn in_singleton_scope(self) -> Self {
    self.binding.singleton = true;
    self
  }

  /// Marks the binding as a default that any normal binding for the same
  /// key replaces.
  pub fn as_weak_binding(self) -> Self {
    self.binding.weak = true;
    self
  }

  /// Lets `to_all_implementations` bind nothing without failing the build.
  pub fn allow_zero_implementations(self) -> Self {
    self.binding.allow_zero = true;
    self
  }
}

/// Chooses the implementation family of an open generic binding.
pub struct OpenBindTo<'a, SF> {
  binding: &'a mut PendingBinding,
  _marker: PhantomData<fn() -> SF>,
}

impl<'a, SF: OpenGeneric> OpenBindTo<'a, SF> {
  pub fn to_open<IF: OpenGeneric>(self) -> OpenBindingOptions<'a, SF, IF> {
    self.binding.target = BindingTarget::Open {
      service_arity: SF::ARITY,
      implementation: type_name::<IF>(),
      implementation_arity: IF::ARITY,
      closers: Vec::new(),
    };
    OpenBindingOptions {
      binding: self.binding,
      _marker: PhantomData,
    }
  }
}

/// Modifiers of an open generic binding.
pub struct OpenBindingOptions<'a, SF, IF> {
  binding: &'a mut PendingBinding,
  _marker: PhantomData<fn() -> (SF, IF)>,
}

impl<SF: OpenGeneric, IF: OpenGeneric> OpenBindingOptions<'_, SF, IF> {
  /// Allows the binding to be closed over the type arguments `A`.
  pub fn closing_over<A>(self) -> Self
  where
    A: TypeArgs,
    SF: GenericService<A>,
    IF: GenericImplementation<SF, A>,
  {
    if let BindingTarget::Open { closers, .. } = &mut self.binding.target {
      closers.push(Closer::of::<SF, IF, A>());
    }
    self
  }

  pub fn with_key(self, key: impl Into<String>) -> Self {
    self.binding.key = Some(key.into());
    self
  }

  /// Open bindings cannot be singletons; `build()` rejects this.
  pub fn in_singleton_scope(self) -> Self {
    self.binding.singleton = true;
    self
  }

  pub fn as_weak_binding(self) -> Self {
    self.binding.weak = true;
    self
  }
}
