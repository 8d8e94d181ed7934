//! Factory adapters: lazily-resolving handles and abstract factory contracts.

use crate::container::{Container, ContainerInner};
use crate::core::TypeKey;
use crate::error::{Error, FactoryContractError, Result};
use std::any::{type_name, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

fn upgrade(container: &Weak<ContainerInner>, key: &TypeKey) -> Result<Container> {
  Container::upgrade(container).ok_or_else(|| Error::AlreadyDisposed { key: key.clone() })
}

/// A handle that resolves `S` from its container each time it is called.
///
/// The handle does not keep the container alive. Calling it after the
/// container has been dropped fails with [`Error::AlreadyDisposed`].
pub struct Factory<S: ?Sized> {
  container: Weak<ContainerInner>,
  key: TypeKey,
  _marker: PhantomData<fn() -> Arc<S>>,
}

impl<S: ?Sized + Send + Sync + 'static> Factory<S> {
  pub(crate) fn new(container: Weak<ContainerInner>, key: TypeKey) -> Self {
    Self {
      container,
      key,
      _marker: PhantomData,
    }
  }

  pub fn create(&self) -> Result<Arc<S>> {
    upgrade(&self.container, &self.key)?.get::<S>(self.key.key())
  }

  pub fn key(&self) -> &TypeKey {
    &self.key
  }
}

impl<S: ?Sized> Clone for Factory<S> {
  fn clone(&self) -> Self {
    Self {
      container: self.container.clone(),
      key: self.key.clone(),
      _marker: PhantomData,
    }
  }
}

impl<S: ?Sized> fmt::Debug for Factory<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Factory").field("key", &self.key).finish()
  }
}

/// The container access given to an abstract factory implementation.
#[derive(Clone)]
pub struct FactoryResolver {
  container: Weak<ContainerInner>,
}

impl FactoryResolver {
  pub(crate) fn new(container: Weak<ContainerInner>) -> Self {
    Self { container }
  }

  pub fn get<S: ?Sized + Send + Sync + 'static>(&self, key: Option<&str>) -> Result<Arc<S>> {
    let container = upgrade(&self.container, &TypeKey::of::<S>(key))?;
    container.get::<S>(key)
  }
}

impl fmt::Debug for FactoryResolver {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FactoryResolver")
      .field("live", &(self.container.strong_count() > 0))
      .finish()
  }
}

/// A method of an abstract factory contract.
#[derive(Debug, Clone)]
pub struct FactoryMethod {
  name: &'static str,
  returns: Option<&'static str>,
  parameters: Vec<(&'static str, TypeId, &'static str)>,
}

impl FactoryMethod {
  /// A method returning `R`. A unit return type is recorded as returning
  /// nothing.
  pub fn returning<R: ?Sized + 'static>(name: &'static str) -> Self {
    Self {
      name,
      returns: (TypeId::of::<R>() != TypeId::of::<()>()).then(type_name::<R>),
      parameters: Vec::new(),
    }
  }

  /// Adds a string key parameter.
  pub fn key_parameter(self, name: &'static str) -> Self {
    self.parameter::<str>(name)
  }

  pub fn parameter<P: ?Sized + 'static>(mut self, name: &'static str) -> Self {
    self.parameters.push((name, TypeId::of::<P>(), type_name::<P>()));
    self
  }

  pub fn name(&self) -> &'static str {
    self.name
  }
}

fn is_string(id: TypeId) -> bool {
  id == TypeId::of::<str>() || id == TypeId::of::<&'static str>() || id == TypeId::of::<String>()
}

/// The shape of an abstract factory, checked when the container is built.
#[derive(Debug, Clone)]
pub struct FactoryContract {
  name: &'static str,
  public: bool,
  methods: Vec<FactoryMethod>,
}

impl FactoryContract {
  pub fn new(name: &'static str) -> Self {
    Self {
      name,
      public: true,
      methods: Vec::new(),
    }
  }

  pub fn public(mut self, public: bool) -> Self {
    self.public = public;
    self
  }

  pub fn method(mut self, method: FactoryMethod) -> Self {
    self.methods.push(method);
    self
  }

  pub fn methods(&self) -> &[FactoryMethod] {
    &self.methods
  }

  /// Every method must return a service and take at most one string key.
  pub fn validate(&self) -> Result<(), FactoryContractError> {
    let factory = self.name;
    if !self.public {
      return Err(FactoryContractError::NotPublic { factory });
    }
    for method in &self.methods {
      if method.returns.is_none() {
        return Err(FactoryContractError::UnitReturn {
          factory,
          method: method.name,
        });
      }
      if method.parameters.len() > 1 {
        return Err(FactoryContractError::TooManyParameters {
          factory,
          method: method.name,
          count: method.parameters.len(),
        });
      }
      if let Some(&(parameter, id, type_name)) = method.parameters.first() {
        if !is_string(id) {
          return Err(FactoryContractError::NonStringParameter {
            factory,
            method: method.name,
            parameter,
            type_name,
          });
        }
      }
    }
    Ok(())
  }
}

/// An implementation of a factory trait whose methods resolve services.
///
/// Usually generated by [`abstract_factory!`](crate::abstract_factory), but
/// can be written by hand; the contract is validated either way.
pub trait AbstractFactory: Send + Sync + 'static {
  fn contract() -> FactoryContract;

  fn from_resolver(resolver: FactoryResolver) -> Self;
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  trait Widget {}

  #[test]
  fn test_valid_contract_passes() {
    let contract = FactoryContract::new("Widgets")
      .method(FactoryMethod::returning::<dyn Widget>("widget"))
      .method(FactoryMethod::returning::<dyn Widget>("named").key_parameter("key"));

    assert_eq!(contract.validate(), Ok(()));
  }

  #[test]
  fn test_private_contract_is_rejected_first() {
    let contract = FactoryContract::new("Widgets")
      .public(false)
      .method(FactoryMethod::returning::<()>("nothing"));

    assert_eq!(
      contract.validate(),
      Err(FactoryContractError::NotPublic { factory: "Widgets" })
    );
  }

  #[test]
  fn test_method_shapes_are_checked() {
    let unit = FactoryContract::new("Widgets").method(FactoryMethod::returning::<()>("nothing"));
    assert!(matches!(unit.validate(), Err(FactoryContractError::UnitReturn { .. })));

    let two = FactoryContract::new("Widgets").method(
      FactoryMethod::returning::<dyn Widget>("widget")
        .key_parameter("a")
        .key_parameter("b"),
    );
    assert!(matches!(
      two.validate(),
      Err(FactoryContractError::TooManyParameters { count: 2, .. })
    ));

    let numeric = FactoryContract::new("Widgets")
      .method(FactoryMethod::returning::<dyn Widget>("widget").parameter::<u32>("id"));
    assert_eq!(
      numeric.validate(),
      Err(FactoryContractError::NonStringParameter {
        factory: "Widgets",
        method: "widget",
        parameter: "id",
        type_name: "u32",
      })
    );
  }
}
