use crate::core::TypeKey;
use thiserror::Error;

/// The main error type for `fibre_inject`.
///
/// Every failure is either a configuration problem (raised by
/// `ContainerBuilder::build`) or a resolution problem (raised by `get`,
/// `get_all` and `build_up`). None of them are transient.
#[derive(Debug, Clone, Error)]
pub enum Error {
  #[error(transparent)]
  Registration(#[from] RegistrationError),

  #[error(transparent)]
  Constructor(#[from] ConstructorError),

  #[error(transparent)]
  FactoryContract(#[from] FactoryContractError),

  #[error("no registration found for {key}")]
  NotFound { key: TypeKey },

  #[error("{count} registrations found for {key}, expected exactly one")]
  Ambiguous { key: TypeKey, count: usize },

  #[error("cannot resolve {key}: its container has been disposed")]
  AlreadyDisposed { key: TypeKey },

  #[error("circular dependency detected: {}", .path.join(" -> "))]
  Cycle { path: Vec<String> },

  #[error("failed to inject member '{member}' of {owner}: {source}")]
  Member {
    owner: &'static str,
    member: &'static str,
    #[source]
    source: Box<Error>,
  },

  #[error("constructor argument {position} of {implementation}: {reason}")]
  Argument {
    implementation: &'static str,
    position: usize,
    reason: String,
  },

  #[error("instance resolved for {key} is not a {expected}")]
  TypeMismatch { key: TypeKey, expected: &'static str },
}

/// Binding problems detected while building a container or closing a generic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
  #[error("{implementation} is already bound to {key}")]
  Duplicate {
    key: TypeKey,
    implementation: &'static str,
  },

  #[error(
    "open generic {implementation} takes {implementation_arity} type argument(s) but {service} takes {service_arity}"
  )]
  ArityMismatch {
    service: &'static str,
    service_arity: usize,
    implementation: &'static str,
    implementation_arity: usize,
  },

  #[error("open generic binding for {key} cannot be registered in singleton scope")]
  UnboundGenericSingleton { key: TypeKey },

  #[error("{implementation} declares no constructors and cannot be bound to {key}")]
  NotConstructible {
    key: TypeKey,
    implementation: &'static str,
  },

  #[error("no implementations of {key} were found in the supplied catalogs")]
  NoImplementations { key: TypeKey },

  #[error("binding for {key} was never given a target")]
  Incomplete { key: TypeKey },
}

/// Constructor selection failures for a type-bound registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructorError {
  #[error("{implementation} marks {count} constructors for injection, at most one is allowed")]
  MultipleMarked {
    implementation: &'static str,
    count: usize,
  },

  #[error(
    "parameter {position} ({parameter}) of the injection constructor of {implementation} cannot be resolved and has no default"
  )]
  UnresolvableParameter {
    implementation: &'static str,
    parameter: TypeKey,
    position: usize,
  },

  #[error("none of the {candidates} constructor(s) of {implementation} can be satisfied")]
  NoEligible {
    implementation: &'static str,
    candidates: usize,
  },

  #[error(
    "{implementation} has several constructors that inject {injected} parameter(s); mark one for injection"
  )]
  Ambiguous {
    implementation: &'static str,
    injected: usize,
  },
}

/// Abstract factory contracts that cannot be implemented by delegating to the
/// container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryContractError {
  #[error("abstract factory {factory} must be public")]
  NotPublic { factory: &'static str },

  #[error("method {factory}::{method} must return a service")]
  UnitReturn {
    factory: &'static str,
    method: &'static str,
  },

  #[error("method {factory}::{method} takes {count} parameters, at most one key is allowed")]
  TooManyParameters {
    factory: &'static str,
    method: &'static str,
    count: usize,
  },

  #[error("parameter '{parameter}' of {factory}::{method} is a {type_name}, only string keys are allowed")]
  NonStringParameter {
    factory: &'static str,
    method: &'static str,
    parameter: &'static str,
    type_name: &'static str,
  },
}

/// A specialized `Result` type for `fibre_inject` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
