//! Tests for the public macros: `resolve!`, `implements!` and the
//! resolution side of `abstract_factory!`.

use fibre_inject::{abstract_factory, implements, resolve, Container, ContainerBuilder, Implements};
use std::sync::Arc;

// --- Test Fixtures ---

pub struct MacroTestService {
  value: i32,
}

trait MacroTestTrait: Send + Sync {
  fn value(&self) -> i32;
}

trait Describe: Send + Sync {
  fn describe(&self) -> String;
}

impl MacroTestTrait for MacroTestService {
  fn value(&self) -> i32 {
    self.value
  }
}

impl Describe for MacroTestService {
  fn describe(&self) -> String {
    format!("service({})", self.value)
  }
}

implements!(MacroTestService => dyn MacroTestTrait, dyn Describe);

struct UnregisteredService;

fn container() -> Container {
  let mut builder = ContainerBuilder::new();
  builder.bind::<MacroTestService>().to_instance(MacroTestService { value: 1 });
  builder
    .bind::<MacroTestService>()
    .to_instance(MacroTestService { value: 2 })
    .with_key("named");
  builder
    .bind::<dyn MacroTestTrait>()
    .to_instance(MacroTestService { value: 3 });
  builder
    .bind::<dyn MacroTestTrait>()
    .to_instance(MacroTestService { value: 4 })
    .with_key("named_trait");
  builder.build().unwrap()
}

// --- resolve! ---

#[test]
fn test_resolve_concrete() {
  let container = container();

  let service = resolve!(container, MacroTestService);

  assert_eq!(service.value, 1);
}

#[test]
fn test_resolve_concrete_with_key() {
  let container = container();

  let service = resolve!(container, MacroTestService, "named");

  assert_eq!(service.value, 2);
}

#[test]
fn test_resolve_trait() {
  let container = container();

  let service = resolve!(container, trait MacroTestTrait);

  assert_eq!(service.value(), 3);
}

#[test]
fn test_resolve_trait_with_key() {
  let container = container();

  let service = resolve!(container, trait MacroTestTrait, "named_trait");

  assert_eq!(service.value(), 4);
}

#[test]
#[should_panic(expected = "Failed to resolve required service")]
fn test_resolve_panics_on_missing_service() {
  let container = container();

  let _ = resolve!(container, UnregisteredService);
}

#[test]
#[should_panic(expected = "Failed to resolve required trait service with key 'missing'")]
fn test_resolve_panics_on_missing_key() {
  let container = container();

  let _ = resolve!(container, trait MacroTestTrait, "missing");
}

#[test]
#[should_panic(expected = "has been disposed")]
fn test_resolve_panics_after_dispose() {
  let container = container();
  container.dispose();

  let _ = resolve!(container, MacroTestService);
}

// --- implements! ---

#[test]
fn test_implements_declares_every_listed_service() {
  // Arrange
  let service = Arc::new(MacroTestService { value: 5 });

  // Act
  let as_trait = <MacroTestService as Implements<dyn MacroTestTrait>>::upcast(service.clone());
  let as_describe = <MacroTestService as Implements<dyn Describe>>::upcast(service);

  // Assert
  assert_eq!(as_trait.value(), 5);
  assert_eq!(as_describe.describe(), "service(5)");
}

#[test]
fn test_one_instance_bound_under_two_services() {
  let mut builder = ContainerBuilder::new();
  builder
    .bind::<dyn Describe>()
    .to_instance(MacroTestService { value: 6 });
  let container = builder.build().unwrap();

  assert_eq!(resolve!(container, trait Describe).describe(), "service(6)");
  assert!(container.get::<dyn MacroTestTrait>(None).is_err());
}

// --- abstract_factory! ---

abstract_factory! {
  pub trait ServiceFactory => ServiceFactoryImpl {
    fn primary(&self) -> MacroTestService;
    fn by_key(&self, key: &str) -> MacroTestService;
  }
}

#[test]
fn test_generated_factory_forwards_keys() {
  // Arrange
  let mut builder = ContainerBuilder::new();
  builder.bind::<MacroTestService>().to_instance(MacroTestService { value: 7 });
  builder
    .bind::<MacroTestService>()
    .to_instance(MacroTestService { value: 8 })
    .with_key("eight");
  builder
    .bind::<dyn ServiceFactory>()
    .to_abstract_factory::<ServiceFactoryImpl>();
  let container = builder.build().unwrap();

  // Act
  let factory = resolve!(container, trait ServiceFactory);

  // Assert
  assert_eq!(factory.primary().unwrap().value, 7);
  assert_eq!(factory.by_key("eight").unwrap().value, 8);
}
