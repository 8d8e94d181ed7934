//! The declarations a type makes so the container can construct and populate it.
//!
//! Rust has no runtime reflection, so instead of scanning constructors and
//! attributes the container asks the type itself: an [`Injectable`] type lists
//! its [`Constructor`]s (with their [`Parameter`]s) and its
//! [`InjectionPoint`]s, and may opt into a post-injection hook and disposal.

use crate::container::ContainerInner;
use crate::core::{downcast, Instance, TypeKey};
use crate::error::{Error, Result};
use crate::factory::Factory;
use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::{Arc, Weak};

/// A type the container knows how to construct and populate.
///
/// Every method has a default, so `impl Injectable for Config {}` is a valid
/// (if unconstructible) declaration: such a type can still be bound with
/// `to_factory` or `to_instance` and populated with `build_up`.
///
/// # Examples
///
/// ```
/// use fibre_inject::{Constructor, ContainerBuilder, Injectable, Parameter};
/// use std::sync::Arc;
///
/// struct Engine;
/// impl Injectable for Engine {
///   fn constructors() -> Vec<Constructor<Self>> {
///     vec![Constructor::new(|_| Ok(Engine))]
///   }
/// }
///
/// struct Car {
///   engine: Arc<Engine>,
/// }
/// impl Injectable for Car {
///   fn constructors() -> Vec<Constructor<Self>> {
///     vec![Constructor::new(|args| Ok(Car { engine: args.service()? }))
///       .param(Parameter::service::<Engine>())]
///   }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.bind::<Engine>().to_self().in_singleton_scope();
/// builder.bind::<Car>().to_self();
/// let container = builder.build().unwrap();
///
/// let car = container.get::<Car>(None).unwrap();
/// assert!(Arc::ptr_eq(&car.engine, &container.get::<Engine>(None).unwrap()));
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
  /// The constructors the container may choose from.
  fn constructors() -> Vec<Constructor<Self>> {
    Vec::new()
  }

  /// Members populated after construction and by `Container::build_up`.
  fn injection_points() -> Vec<InjectionPoint<Self>> {
    Vec::new()
  }

  /// Called once all constructor parameters and members have been injected.
  fn parameters_injected(&self) {}

  /// Returns the dispose hook run when a singleton of this type is disposed
  /// together with its container.
  fn as_disposable(&self) -> Option<&dyn Disposable> {
    None
  }
}

/// A service that releases resources when its owning container is disposed.
pub trait Disposable: Send + Sync {
  fn dispose(&self);
}

/// Declares that `Self` can be handed out as the service `S`.
///
/// Every type implements `Implements<Self>`. Trait-object services need an
/// explicit upcast, most easily written with the [`implements!`](crate::implements)
/// macro.
pub trait Implements<S: ?Sized + 'static>: Send + Sync + 'static {
  fn upcast(self: Arc<Self>) -> Arc<S>;
}

impl<T: Send + Sync + 'static> Implements<T> for T {
  fn upcast(self: Arc<Self>) -> Arc<T> {
    self
  }
}

macro_rules! plain_injectable {
  ($($type:ty),* $(,)?) => {
    $(impl Injectable for $type {})*
  };
}

// Plain values carry no constructors or members but can be produced by
// factories and bound as instances.
plain_injectable!(
  String,
  &'static str,
  bool,
  char,
  i8,
  i16,
  i32,
  i64,
  i128,
  isize,
  u8,
  u16,
  u32,
  u64,
  u128,
  usize,
  f32,
  f64,
  std::path::PathBuf,
  std::time::Duration,
);

/// How a constructor parameter is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParameterKind {
  /// A single instance, `Arc<S>`.
  Service,
  /// Every registration for the key, `Vec<Arc<S>>`.
  Collection,
  /// A lazy handle, `Factory<S>`.
  Factory,
}

/// One parameter of a [`Constructor`].
#[derive(Debug, Clone)]
pub struct Parameter {
  pub(crate) key: TypeKey,
  pub(crate) kind: ParameterKind,
  pub(crate) optional: bool,
}

impl Parameter {
  fn new<S: ?Sized + Send + Sync + 'static>(kind: ParameterKind) -> Self {
    Self {
      key: TypeKey::of::<S>(None),
      kind,
      optional: false,
    }
  }

  /// A parameter receiving one instance of `S`.
  pub fn service<S: ?Sized + Send + Sync + 'static>() -> Self {
    Self::new::<S>(ParameterKind::Service)
  }

  /// A parameter receiving every instance registered for `S`.
  pub fn collection<S: ?Sized + Send + Sync + 'static>() -> Self {
    Self::new::<S>(ParameterKind::Collection)
  }

  /// A parameter receiving a [`Factory`] that resolves `S` on demand.
  pub fn factory<S: ?Sized + Send + Sync + 'static>() -> Self {
    Self::new::<S>(ParameterKind::Factory)
  }

  pub fn keyed(mut self, key: impl Into<String>) -> Self {
    self.key = self.key.with_key(key);
    self
  }

  /// Marks the parameter as having a default. When it cannot be resolved the
  /// constructor is still eligible and receives `None`.
  pub fn optional(mut self) -> Self {
    self.optional = true;
    self
  }

  pub fn key(&self) -> &TypeKey {
    &self.key
  }
}

type BuildFn<T> = dyn Fn(&mut Arguments) -> Result<T> + Send + Sync;

/// A constructor declaration: the parameters it needs and the closure that
/// builds the value from them.
pub struct Constructor<T> {
  pub(crate) parameters: Vec<Parameter>,
  pub(crate) marked: bool,
  pub(crate) build: Arc<BuildFn<T>>,
}

impl<T> Constructor<T> {
  pub fn new(build: impl Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static) -> Self {
    Self {
      parameters: Vec::new(),
      marked: false,
      build: Arc::new(build),
    }
  }

  /// Appends a parameter. Arguments are handed to the build closure in the
  /// order parameters were declared.
  pub fn param(mut self, parameter: Parameter) -> Self {
    self.parameters.push(parameter);
    self
  }

  /// Shorthand for `.param(Parameter::service::<S>())`.
  pub fn service<S: ?Sized + Send + Sync + 'static>(self) -> Self {
    self.param(Parameter::service::<S>())
  }

  /// Marks this constructor as the one to use. Its parameters must all be
  /// resolvable or optional.
  pub fn inject(mut self) -> Self {
    self.marked = true;
    self
  }

  pub fn parameters(&self) -> &[Parameter] {
    &self.parameters
  }
}

impl<T> fmt::Debug for Constructor<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Constructor")
      .field("parameters", &self.parameters)
      .field("marked", &self.marked)
      .finish_non_exhaustive()
  }
}

pub(crate) enum Argument {
  /// The parameter fell back to its default.
  Default,
  Service(Instance),
  Collection(Vec<Instance>),
  Factory(Weak<ContainerInner>),
}

/// The resolved arguments passed to a constructor's build closure.
pub struct Arguments {
  implementation: &'static str,
  values: std::vec::IntoIter<(TypeKey, Argument)>,
  position: usize,
}

impl Arguments {
  pub(crate) fn new(implementation: &'static str, values: Vec<(TypeKey, Argument)>) -> Self {
    Self {
      implementation,
      values: values.into_iter(),
      position: 0,
    }
  }

  fn next_for<S: ?Sized + 'static>(&mut self) -> Result<(TypeKey, Argument)> {
    let position = self.position;
    self.position += 1;
    let (key, argument) = self.values.next().ok_or_else(|| Error::Argument {
      implementation: self.implementation,
      position,
      reason: format!("no parameter was declared for {}", type_name::<S>()),
    })?;
    if key.service().id() != TypeId::of::<S>() {
      return Err(Error::Argument {
        implementation: self.implementation,
        position,
        reason: format!("declared as {} but read as {}", key, type_name::<S>()),
      });
    }
    Ok((key, argument))
  }

  fn mismatch(&self, key: &TypeKey, expected: &str) -> Error {
    Error::Argument {
      implementation: self.implementation,
      position: self.position - 1,
      reason: format!("{key} was not declared as {expected}"),
    }
  }

  /// Takes the next argument as a required service.
  pub fn service<S: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<S>> {
    match self.next_for::<S>()? {
      (key, Argument::Service(instance)) => downcast(&instance, &key),
      (key, Argument::Default) => Err(Error::NotFound { key }),
      (key, _) => Err(self.mismatch(&key, "a service parameter")),
    }
  }

  /// Takes the next argument, yielding `None` when the parameter was
  /// optional and could not be resolved.
  pub fn optional<S: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Option<Arc<S>>> {
    match self.next_for::<S>()? {
      (key, Argument::Service(instance)) => downcast(&instance, &key).map(Some),
      (_, Argument::Default) => Ok(None),
      (key, _) => Err(self.mismatch(&key, "a service parameter")),
    }
  }

  /// Takes the next argument as a collection of every registered instance.
  pub fn collection<S: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Vec<Arc<S>>> {
    match self.next_for::<S>()? {
      (key, Argument::Collection(instances)) => instances
        .iter()
        .map(|instance| downcast(instance, &key))
        .collect(),
      (_, Argument::Default) => Ok(Vec::new()),
      (key, _) => Err(self.mismatch(&key, "a collection parameter")),
    }
  }

  /// Takes the next argument as a lazy factory.
  pub fn factory<S: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Factory<S>> {
    match self.next_for::<S>()? {
      (key, Argument::Factory(container)) => Ok(Factory::new(container, key)),
      (key, Argument::Default) => Err(Error::NotFound { key }),
      (key, _) => Err(self.mismatch(&key, "a factory parameter")),
    }
  }
}

type IsEmptyFn<T> = dyn Fn(&mut T) -> bool + Send + Sync;
type AssignFn<T> = dyn Fn(&mut T, &Instance, &TypeKey) -> Result<()> + Send + Sync;

/// A member populated by build-up: an `Option<Arc<S>>` slot on `T`.
///
/// The slot is only filled while it is `None`, so building up the same value
/// twice leaves already-populated members untouched.
pub struct InjectionPoint<T> {
  pub(crate) name: &'static str,
  pub(crate) key: TypeKey,
  pub(crate) optional: bool,
  pub(crate) is_empty: Box<IsEmptyFn<T>>,
  pub(crate) assign: Box<AssignFn<T>>,
}

impl<T: 'static> InjectionPoint<T> {
  /// Declares the member `name`, reached through `slot`.
  ///
  /// ```
  /// use fibre_inject::{InjectionPoint, Injectable};
  /// use std::sync::Arc;
  ///
  /// struct Settings;
  /// struct Page {
  ///   settings: Option<Arc<Settings>>,
  /// }
  ///
  /// impl Injectable for Page {
  ///   fn injection_points() -> Vec<InjectionPoint<Self>> {
  ///     vec![InjectionPoint::new("settings", |page: &mut Page| &mut page.settings)]
  ///   }
  /// }
  /// ```
  pub fn new<S: ?Sized + Send + Sync + 'static>(
    name: &'static str,
    slot: fn(&mut T) -> &mut Option<Arc<S>>,
  ) -> Self {
    Self {
      name,
      key: TypeKey::of::<S>(None),
      optional: false,
      is_empty: Box::new(move |target| slot(target).is_none()),
      assign: Box::new(move |target, instance, key| {
        *slot(target) = Some(downcast::<S>(instance, key)?);
        Ok(())
      }),
    }
  }

  pub fn keyed(mut self, key: impl Into<String>) -> Self {
    self.key = self.key.with_key(key);
    self
  }

  /// Leaves the member empty instead of failing when it cannot be resolved.
  pub fn optional(mut self) -> Self {
    self.optional = true;
    self
  }
}

impl<T> fmt::Debug for InjectionPoint<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("InjectionPoint")
      .field("name", &self.name)
      .field("key", &self.key)
      .field("optional", &self.optional)
      .finish_non_exhaustive()
  }
}
