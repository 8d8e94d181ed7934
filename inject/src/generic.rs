//! Open generic bindings.
//!
//! A generic service such as `dyn Repository<T>` has no runtime
//! representation until `T` is chosen, so an open binding names *families*:
//! marker types that map a tuple of type arguments to the closed service and
//! implementation types. The binding lists the argument tuples it may be
//! closed over, and each one contributes a monomorphized closer. Nothing is
//! compiled until a closed key is first requested.
//!
//! ```
//! use fibre_inject::{
//!   Constructor, ContainerBuilder, GenericImplementation, GenericService, Implements, Injectable,
//!   OpenGeneric,
//! };
//! use std::marker::PhantomData;
//! use std::sync::Arc;
//!
//! trait Repository<T>: Send + Sync {
//!   fn name(&self) -> &'static str;
//! }
//!
//! struct MemoryRepository<T>(PhantomData<fn() -> T>);
//!
//! impl<T: 'static> Repository<T> for MemoryRepository<T> {
//!   fn name(&self) -> &'static str {
//!     std::any::type_name::<T>()
//!   }
//! }
//!
//! impl<T: 'static> Injectable for MemoryRepository<T> {
//!   fn constructors() -> Vec<Constructor<Self>> {
//!     vec![Constructor::new(|_| Ok(MemoryRepository(PhantomData)))]
//!   }
//! }
//!
//! impl<T: 'static> Implements<dyn Repository<T>> for MemoryRepository<T> {
//!   fn upcast(self: Arc<Self>) -> Arc<dyn Repository<T>> {
//!     self
//!   }
//! }
//!
//! struct Repositories;
//! impl OpenGeneric for Repositories {
//!   const ARITY: usize = 1;
//! }
//! impl<T: 'static> GenericService<(T,)> for Repositories {
//!   type Closed = dyn Repository<T>;
//! }
//!
//! struct MemoryRepositories;
//! impl OpenGeneric for MemoryRepositories {
//!   const ARITY: usize = 1;
//! }
//! impl<T: 'static> GenericImplementation<Repositories, (T,)> for MemoryRepositories {
//!   type Closed = MemoryRepository<T>;
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder
//!   .bind_open::<Repositories>()
//!   .to_open::<MemoryRepositories>()
//!   .closing_over::<(i32,)>()
//!   .closing_over::<(String,)>();
//! let container = builder.build().unwrap();
//!
//! let repository = container.get::<dyn Repository<i32>>(None).unwrap();
//! assert_eq!(repository.name(), "i32");
//! ```

use crate::core::{ServiceType, TypeKey};
use crate::creator::{Creator, TypeCreator};
use crate::error::{RegistrationError, Result};
use crate::injectable::{Implements, Injectable};
use crate::registration::{Registration, TransientRegistration};
use std::any::type_name;
use std::sync::Arc;

/// A marker type standing for an open generic definition.
pub trait OpenGeneric: 'static {
  /// The number of type parameters of the definition.
  const ARITY: usize;
}

/// A tuple of type arguments used to close an open generic.
pub trait TypeArgs: 'static {
  const ARITY: usize;
}

impl<A: 'static> TypeArgs for (A,) {
  const ARITY: usize = 1;
}

impl<A: 'static, B: 'static> TypeArgs for (A, B) {
  const ARITY: usize = 2;
}

impl<A: 'static, B: 'static, C: 'static> TypeArgs for (A, B, C) {
  const ARITY: usize = 3;
}

impl<A: 'static, B: 'static, C: 'static, D: 'static> TypeArgs for (A, B, C, D) {
  const ARITY: usize = 4;
}

/// An open service family: maps type arguments `A` to the closed service.
pub trait GenericService<A: TypeArgs>: OpenGeneric {
  type Closed: ?Sized + Send + Sync + 'static;
}

/// An open implementation family for the service family `SF`.
pub trait GenericImplementation<SF: GenericService<A>, A: TypeArgs>: OpenGeneric {
  type Closed: Injectable + Implements<SF::Closed>;
}

fn closed_creator<S, I>() -> Arc<dyn Creator>
where
  S: ?Sized + Send + Sync + 'static,
  I: Injectable + Implements<S>,
{
  Arc::new(TypeCreator::<S, I>::new())
}

/// One monomorphized closing of an open binding.
#[derive(Clone)]
pub(crate) struct Closer {
  service: ServiceType,
  implementation: &'static str,
  arity: usize,
  make: fn() -> Arc<dyn Creator>,
}

impl Closer {
  pub(crate) fn of<SF, IF, A>() -> Self
  where
    A: TypeArgs,
    SF: GenericService<A>,
    IF: GenericImplementation<SF, A>,
  {
    Self {
      service: ServiceType::of::<SF::Closed>(),
      implementation: type_name::<IF::Closed>(),
      arity: A::ARITY,
      make: closed_creator::<SF::Closed, IF::Closed>,
    }
  }
}

/// An open service family bound to an open implementation family.
pub(crate) struct UnboundGeneric {
  key: TypeKey,
  service_arity: usize,
  implementation: &'static str,
  implementation_arity: usize,
  weak: bool,
  closers: Vec<Closer>,
}

impl UnboundGeneric {
  pub(crate) fn new(
    key: TypeKey,
    service_arity: usize,
    implementation: &'static str,
    implementation_arity: usize,
    weak: bool,
    closers: Vec<Closer>,
  ) -> Self {
    Self {
      key,
      service_arity,
      implementation,
      implementation_arity,
      weak,
      closers,
    }
  }

  pub(crate) fn key(&self) -> &TypeKey {
    &self.key
  }

  pub(crate) fn implementation(&self) -> &'static str {
    self.implementation
  }

  pub(crate) fn is_weak(&self) -> bool {
    self.weak
  }

  /// Rejects singleton scope, arity mismatches and closings whose
  /// implementation cannot be constructed.
  pub(crate) fn validate(&self, singleton: bool) -> Result<()> {
    if singleton {
      return Err(RegistrationError::UnboundGenericSingleton { key: self.key.clone() }.into());
    }
    if self.service_arity != self.implementation_arity {
      return Err(self.arity_mismatch(self.implementation, self.implementation_arity));
    }
    for closer in &self.closers {
      if closer.arity != self.service_arity {
        return Err(self.arity_mismatch(closer.implementation, closer.arity));
      }
      (closer.make)().validate(&self.closed_key(closer))?;
    }
    Ok(())
  }

  fn arity_mismatch(&self, implementation: &'static str, arity: usize) -> crate::Error {
    RegistrationError::ArityMismatch {
      service: self.key.service().name(),
      service_arity: self.service_arity,
      implementation,
      implementation_arity: arity,
    }
    .into()
  }

  fn closed_key(&self, closer: &Closer) -> TypeKey {
    TypeKey::new(closer.service, self.key.key().map(str::to_owned))
  }

  /// The closed keys this binding can serve.
  pub(crate) fn closed_keys(&self) -> impl Iterator<Item = TypeKey> + '_ {
    self.closers.iter().map(|closer| self.closed_key(closer))
  }

  /// Builds a transient registration for `closed`, if this binding was
  /// declared closable over its type arguments.
  pub(crate) fn close(&self, closed: &TypeKey) -> Option<Arc<dyn Registration>> {
    let closer = self.closers.iter().find(|closer| closer.service == closed.service())?;
    Some(Arc::new(TransientRegistration::new(closed.clone(), (closer.make)(), self.weak)))
  }
}
