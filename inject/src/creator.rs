//! Creators turn a binding's target into a compiled plan that produces fresh
//! instances.

use crate::build_up::BuildUpPlan;
use crate::container::Container;
use crate::core::{erase, Created, ServiceType, Teardown, TypeKey};
use crate::error::{ConstructorError, Error, RegistrationError, Result};
use crate::factory::{AbstractFactory, FactoryResolver};
use crate::injectable::{Argument, Arguments, Constructor, Implements, Injectable, ParameterKind};
use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

/// A compiled creation routine. Running it produces one new instance.
pub(crate) type Plan = Arc<dyn Fn(&Container) -> Result<Created> + Send + Sync>;

/// Produces instances of one implementation for one service.
pub(crate) trait Creator: Send + Sync {
  fn implementation(&self) -> ServiceType;

  /// Checks the binding is usable without touching the container's graph.
  fn validate(&self, key: &TypeKey) -> Result<()>;

  /// Builds the creation plan against `container`'s current registrations.
  fn compile(&self, container: &Container) -> Result<Plan>;
}

/// Completes a freshly constructed value: member injection, the
/// post-injection hook, dispose capture, then erasure as the service `S`.
pub(crate) fn finish<S, I>(container: &Container, plan: &BuildUpPlan<I>, mut value: I) -> Result<Created>
where
  S: ?Sized + Send + Sync + 'static,
  I: Injectable + Implements<S>,
{
  plan.build_up(container, &mut value)?;
  value.parameters_injected();

  let concrete = Arc::new(value);
  let teardown = concrete.as_disposable().is_some().then(|| {
    let held = concrete.clone();
    Box::new(move || {
      if let Some(disposable) = held.as_disposable() {
        disposable.dispose();
      }
    }) as Teardown
  });

  Ok(Created {
    instance: erase::<S>(<I as Implements<S>>::upcast(concrete)),
    teardown,
  })
}

/// Creates `I` through one of its declared constructors.
pub(crate) struct TypeCreator<S: ?Sized, I> {
  _marker: PhantomData<fn() -> (Arc<S>, I)>,
}

impl<S: ?Sized, I> TypeCreator<S, I> {
  pub(crate) fn new() -> Self {
    Self { _marker: PhantomData }
  }
}

impl<S, I> TypeCreator<S, I>
where
  S: ?Sized + Send + Sync + 'static,
  I: Injectable + Implements<S>,
{
  fn select(container: &Container) -> Result<Constructor<I>> {
    let implementation = type_name::<I>();
    let mut constructors = I::constructors();

    let marked = constructors.iter().filter(|c| c.marked).count();
    if marked > 1 {
      return Err(ConstructorError::MultipleMarked { implementation, count: marked }.into());
    }
    if marked == 1 {
      let index = constructors.iter().position(|c| c.marked).unwrap_or_default();
      let chosen = constructors.swap_remove(index);
      for (position, parameter) in chosen.parameters.iter().enumerate() {
        if !parameter.optional && !container.can_satisfy(parameter.kind, &parameter.key) {
          return Err(
            ConstructorError::UnresolvableParameter {
              implementation,
              parameter: parameter.key.clone(),
              position,
            }
            .into(),
          );
        }
      }
      return Ok(chosen);
    }

    let candidates = constructors.len();
    let mut best: Option<(usize, usize)> = None;
    let mut tied = false;
    for (index, constructor) in constructors.iter().enumerate() {
      let mut injected = 0;
      let mut eligible = true;
      for parameter in &constructor.parameters {
        if container.can_satisfy(parameter.kind, &parameter.key) {
          injected += 1;
        } else if !parameter.optional {
          eligible = false;
          break;
        }
      }
      if !eligible {
        continue;
      }
      match best {
        Some((_, score)) if injected < score => {}
        Some((_, score)) if injected == score => tied = true,
        _ => {
          best = Some((index, injected));
          tied = false;
        }
      }
    }

    match best {
      None => Err(ConstructorError::NoEligible { implementation, candidates }.into()),
      Some((_, injected)) if tied => Err(ConstructorError::Ambiguous { implementation, injected }.into()),
      Some((index, _)) => Ok(constructors.swap_remove(index)),
    }
  }
}

impl<S, I> Creator for TypeCreator<S, I>
where
  S: ?Sized + Send + Sync + 'static,
  I: Injectable + Implements<S>,
{
  fn implementation(&self) -> ServiceType {
    ServiceType::of::<I>()
  }

  fn validate(&self, key: &TypeKey) -> Result<()> {
    if I::constructors().is_empty() {
      return Err(
        RegistrationError::NotConstructible {
          key: key.clone(),
          implementation: type_name::<I>(),
        }
        .into(),
      );
    }
    Ok(())
  }

  fn compile(&self, container: &Container) -> Result<Plan> {
    let constructor = Self::select(container)?;
    let build_up = container.builder_uppers().plan_for::<I>();
    tracing::debug!(
      implementation = type_name::<I>(),
      parameters = constructor.parameters.len(),
      "Compiled constructor plan."
    );

    let Constructor { parameters, build, .. } = constructor;
    Ok(Arc::new(move |container: &Container| {
      let mut values = Vec::with_capacity(parameters.len());
      for parameter in &parameters {
        let key = &parameter.key;
        let argument = match parameter.kind {
          ParameterKind::Service => {
            if parameter.optional && !container.can_satisfy(ParameterKind::Service, key) {
              Argument::Default
            } else {
              Argument::Service(container.resolve_erased(key)?)
            }
          }
          ParameterKind::Collection => Argument::Collection(container.resolve_all_erased(key)?),
          ParameterKind::Factory => {
            if parameter.optional && !container.can_satisfy(ParameterKind::Factory, key) {
              Argument::Default
            } else {
              Argument::Factory(container.downgrade())
            }
          }
        };
        values.push((key.clone(), argument));
      }
      let mut arguments = Arguments::new(type_name::<I>(), values);
      let value = build(&mut arguments)?;
      finish::<S, I>(container, &build_up, value)
    }))
  }
}

type FactoryFn<I> = dyn Fn(&Container) -> Result<I> + Send + Sync;

/// Creates `I` by calling a user-supplied closure.
pub(crate) struct FactoryCreator<S: ?Sized, I> {
  factory: Arc<FactoryFn<I>>,
  _marker: PhantomData<fn() -> Arc<S>>,
}

impl<S: ?Sized, I> FactoryCreator<S, I> {
  pub(crate) fn new(factory: impl Fn(&Container) -> Result<I> + Send + Sync + 'static) -> Self {
    Self {
      factory: Arc::new(factory),
      _marker: PhantomData,
    }
  }
}

impl<S, I> Creator for FactoryCreator<S, I>
where
  S: ?Sized + Send + Sync + 'static,
  I: Injectable + Implements<S>,
{
  fn implementation(&self) -> ServiceType {
    ServiceType::of::<I>()
  }

  fn validate(&self, _key: &TypeKey) -> Result<()> {
    Ok(())
  }

  fn compile(&self, container: &Container) -> Result<Plan> {
    let factory = self.factory.clone();
    let build_up = container.builder_uppers().plan_for::<I>();
    Ok(Arc::new(move |container: &Container| {
      let value = factory(container)?;
      finish::<S, I>(container, &build_up, value)
    }))
  }
}

/// Creates the generated implementation `F` of an abstract factory contract.
pub(crate) struct AbstractFactoryCreator<S: ?Sized, F> {
  _marker: PhantomData<fn() -> (Arc<S>, F)>,
}

impl<S: ?Sized, F> AbstractFactoryCreator<S, F> {
  pub(crate) fn new() -> Self {
    Self { _marker: PhantomData }
  }
}

impl<S, F> Creator for AbstractFactoryCreator<S, F>
where
  S: ?Sized + Send + Sync + 'static,
  F: AbstractFactory + Implements<S>,
{
  fn implementation(&self) -> ServiceType {
    ServiceType::of::<F>()
  }

  fn validate(&self, _key: &TypeKey) -> Result<()> {
    F::contract().validate().map_err(Error::from)
  }

  fn compile(&self, _container: &Container) -> Result<Plan> {
    Ok(Arc::new(|container: &Container| {
      let factory = Arc::new(F::from_resolver(FactoryResolver::new(container.downgrade())));
      Ok(Created {
        instance: erase::<S>(<F as Implements<S>>::upcast(factory)),
        teardown: None,
      })
    }))
  }
}
