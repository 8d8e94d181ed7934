//! Type catalogs for implementation discovery.

use crate::core::ServiceType;
use crate::creator::{Creator, TypeCreator};
use crate::injectable::{Implements, Injectable};
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct CatalogEntry {
  pub(crate) service: ServiceType,
  pub(crate) implementation: ServiceType,
  pub(crate) make: fn() -> Arc<dyn Creator>,
}

fn creator_for<S, I>() -> Arc<dyn Creator>
where
  S: ?Sized + Send + Sync + 'static,
  I: Injectable + Implements<S>,
{
  Arc::new(TypeCreator::<S, I>::new())
}

/// A list of implementation types and the services they provide, used for
/// discovery by `to_all_implementations` and `autobind`.
///
/// ```
/// use fibre_inject::{implements, Constructor, ContainerBuilder, Injectable, TypeCatalog};
///
/// trait Plugin: Send + Sync {}
///
/// struct Audit;
/// impl Plugin for Audit {}
/// impl Injectable for Audit {
///   fn constructors() -> Vec<Constructor<Self>> {
///     vec![Constructor::new(|_| Ok(Audit))]
///   }
/// }
/// implements!(Audit => dyn Plugin);
///
/// let mut catalog = TypeCatalog::new();
/// catalog.register::<Audit>().implements::<dyn Plugin>();
///
/// let mut builder = ContainerBuilder::new();
/// builder.bind::<dyn Plugin>().to_all_implementations(&[&catalog]);
/// let container = builder.build().unwrap();
///
/// assert_eq!(container.get_all::<dyn Plugin>(None).unwrap().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct TypeCatalog {
  entries: Vec<CatalogEntry>,
}

impl TypeCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds `I`, which always provides itself.
  pub fn register<I: Injectable>(&mut self) -> CatalogRegistration<'_, I> {
    self.push::<I, I>();
    CatalogRegistration {
      catalog: self,
      _marker: PhantomData,
    }
  }

  fn push<S, I>(&mut self)
  where
    S: ?Sized + Send + Sync + 'static,
    I: Injectable + Implements<S>,
  {
    let service = ServiceType::of::<S>();
    let implementation = ServiceType::of::<I>();
    if self
      .entries
      .iter()
      .any(|e| e.service == service && e.implementation == implementation)
    {
      return;
    }
    self.entries.push(CatalogEntry {
      service,
      implementation,
      make: creator_for::<S, I>,
    });
  }

  pub fn len(&self) -> usize {
    self.entries.iter().filter(|e| e.service == e.implementation).count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Entries providing `service`, in registration order.
  pub(crate) fn providers(&self, service: ServiceType) -> impl Iterator<Item = &CatalogEntry> {
    self.entries.iter().filter(move |e| e.service == service)
  }

  /// The self-providing entry of every catalogued type.
  pub(crate) fn implementations(&self) -> impl Iterator<Item = &CatalogEntry> {
    self.entries.iter().filter(|e| e.service == e.implementation)
  }
}

/// Declares further services provided by a catalogued type.
pub struct CatalogRegistration<'a, I> {
  catalog: &'a mut TypeCatalog,
  _marker: PhantomData<fn() -> I>,
}

impl<I: Injectable> CatalogRegistration<'_, I> {
  pub fn implements<S: ?Sized + Send + Sync + 'static>(self) -> Self
  where
    I: Implements<S>,
  {
    self.catalog.push::<S, I>();
    self
  }
}
