use fibre_inject::{
  CompileMode, Constructor, ContainerBuilder, ContainerOptions, DisposeOrder, Error, Injectable,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

// --- Test Fixtures ---

struct Clock;
impl Injectable for Clock {
  fn constructors() -> Vec<Constructor<Self>> {
    vec![Constructor::new(|_| Ok(Clock))]
  }
}

/// Needs a `Clock`, which the failing containers never register.
struct Scheduler {
  _clock: Arc<Clock>,
}
impl Injectable for Scheduler {
  fn constructors() -> Vec<Constructor<Self>> {
    vec![Constructor::new(|args| Ok(Scheduler { _clock: args.service()? })).service::<Clock>()]
  }
}

fn builder(options: ContainerOptions, register_clock: bool) -> ContainerBuilder {
  let mut builder = ContainerBuilder::new().with_options(options);
  if register_clock {
    builder.bind::<Clock>().to_self();
  }
  builder.bind::<Scheduler>().to_self().in_singleton_scope();
  builder
}

// --- Configuration Tests ---

#[test]
fn test_options_deserialize_from_yaml() {
  // Arrange
  let yaml = "compile: eager_lenient\ndispose_order: registration\n";

  // Act
  let options: ContainerOptions = serde_yaml::from_str(yaml).unwrap();

  // Assert
  assert_eq!(
    options,
    ContainerOptions {
      compile: CompileMode::EagerLenient,
      dispose_order: DisposeOrder::Registration,
    }
  );
}

#[test]
fn test_missing_option_fields_take_defaults() {
  let options: ContainerOptions = serde_yaml::from_str("compile: eager\n").unwrap();

  assert_eq!(options.compile, CompileMode::Eager);
  assert_eq!(options.dispose_order, DisposeOrder::Reverse);
}

#[test]
fn test_options_serialize_in_snake_case() {
  let options = ContainerOptions::default().compile(CompileMode::EagerLenient);

  let yaml = serde_yaml::to_string(&options).unwrap();

  assert!(yaml.contains("compile: eager_lenient"));
  assert!(yaml.contains("dispose_order: reverse"));
}

// --- Compile Modes ---

#[test]
fn test_lazy_compile_defers_failures_to_resolution() {
  // Arrange
  let container = builder(ContainerOptions::default(), false).build().unwrap();

  // Act
  let err = container.get::<Scheduler>(None).err().unwrap();

  // Assert
  assert!(matches!(err, Error::Constructor(_)));
  assert!(container.compile().is_err());
}

#[test]
fn test_eager_compile_fails_the_build() {
  let options = ContainerOptions::default().compile(CompileMode::Eager);

  let err = builder(options, false).build().unwrap_err();

  assert!(matches!(err, Error::Constructor(_)));
}

#[test]
fn test_lenient_compile_builds_and_fails_on_use() {
  let options = ContainerOptions::default().compile(CompileMode::EagerLenient);

  let container = builder(options, false).build().unwrap();

  assert!(container.get::<Scheduler>(None).is_err());
}

#[test]
fn test_eager_compile_of_a_valid_graph() {
  let options = ContainerOptions::default().compile(CompileMode::Eager);

  let container = builder(options, true).build().unwrap();

  assert!(container.compile().is_ok());
  assert!(container.get::<Scheduler>(None).is_ok());
  assert_eq!(container.options(), options);
}
