use fibre_inject::{
  implements, CompileMode, Constructor, ContainerBuilder, ContainerOptions, Disposable, Error, Injectable,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// --- Test Fixtures ---

trait Storage: Send + Sync {
  fn name(&self) -> &'static str;
}

struct Foo;
impl Storage for Foo {
  fn name(&self) -> &'static str {
    "foo"
  }
}
impl Injectable for Foo {
  fn constructors() -> Vec<Constructor<Self>> {
    vec![Constructor::new(|_| Ok(Foo))]
  }
}

struct Bar;
impl Storage for Bar {
  fn name(&self) -> &'static str {
    "bar"
  }
}
impl Injectable for Bar {
  fn constructors() -> Vec<Constructor<Self>> {
    vec![Constructor::new(|_| Ok(Bar))]
  }
}

implements!(Foo => dyn Storage);
implements!(Bar => dyn Storage);

/// Counts its own disposals.
struct Session {
  disposals: Arc<AtomicUsize>,
}
impl Disposable for Session {
  fn dispose(&self) {
    self.disposals.fetch_add(1, Ordering::SeqCst);
  }
}
impl Injectable for Session {
  fn as_disposable(&self) -> Option<&dyn Disposable> {
    Some(self)
  }
}

// --- Hierarchy Tests ---

#[test]
fn test_child_override_is_isolated_from_parent() {
  // Arrange
  let mut builder = ContainerBuilder::new();
  builder.bind::<dyn Storage>().to::<Foo>();
  let parent = builder.build().unwrap();

  let mut child_builder = parent.create_child_builder();
  child_builder.bind::<dyn Storage>().to::<Bar>();
  let child = child_builder.build().unwrap();

  // Act & Assert
  assert_eq!(parent.get::<dyn Storage>(None).unwrap().name(), "foo");
  assert_eq!(child.get::<dyn Storage>(None).unwrap().name(), "bar");
}

#[test]
fn test_child_falls_back_to_parent() {
  // Arrange
  let mut builder = ContainerBuilder::new();
  builder.bind::<dyn Storage>().to::<Foo>().in_singleton_scope();
  let parent = builder.build().unwrap();
  let child = parent.create_child_builder().build().unwrap();

  // Act
  let from_child = child.get::<dyn Storage>(None).unwrap();
  let from_parent = parent.get::<dyn Storage>(None).unwrap();

  // Assert: the parent's registration runs against the parent.
  assert!(Arc::ptr_eq(&from_child, &from_parent));
  let via_parent = child.parent().unwrap().get::<dyn Storage>(None).unwrap();
  assert!(Arc::ptr_eq(&via_parent, &from_parent));
}

#[test]
fn test_child_entries_replace_parent_entries_for_get_all() {
  let mut builder = ContainerBuilder::new();
  builder.bind::<dyn Storage>().to::<Foo>();
  let parent = builder.build().unwrap();
  let mut child_builder = parent.create_child_builder();
  child_builder.bind::<dyn Storage>().to::<Bar>();
  let child = child_builder.build().unwrap();

  let names: Vec<&str> = child
    .get_all::<dyn Storage>(None)
    .unwrap()
    .iter()
    .map(|s| s.name())
    .collect();

  assert_eq!(names, vec!["bar"]);
}

#[test]
fn test_child_singletons_are_owned_by_the_child() {
  // Arrange
  let parent_disposals = Arc::new(AtomicUsize::new(0));
  let child_disposals = Arc::new(AtomicUsize::new(0));

  let mut builder = ContainerBuilder::new();
  let counter = parent_disposals.clone();
  builder
    .bind::<Session>()
    .to_factory(move |_| Ok(Session { disposals: counter.clone() }))
    .in_singleton_scope();
  let parent = builder.build().unwrap();

  let mut child_builder = parent.create_child_builder();
  let counter = child_disposals.clone();
  child_builder
    .bind::<Session>()
    .to_factory(move |_| Ok(Session { disposals: counter.clone() }))
    .in_singleton_scope();
  let child = child_builder.build().unwrap();

  let from_parent = parent.get::<Session>(None).unwrap();
  let from_child = child.get::<Session>(None).unwrap();
  assert!(!Arc::ptr_eq(&from_parent, &from_child));

  // Act: disposing the parent leaves the child alone.
  parent.dispose();

  // Assert
  assert_eq!(parent_disposals.load(Ordering::SeqCst), 1);
  assert_eq!(child_disposals.load(Ordering::SeqCst), 0);
  assert!(!child.is_disposed());
  assert!(child.get::<Session>(None).is_ok());

  child.dispose();
  assert_eq!(child_disposals.load(Ordering::SeqCst), 1);
}

#[test]
fn test_disposing_the_child_leaves_the_parent() {
  let disposals = Arc::new(AtomicUsize::new(0));
  let mut builder = ContainerBuilder::new();
  let counter = disposals.clone();
  builder
    .bind::<Session>()
    .to_factory(move |_| Ok(Session { disposals: counter.clone() }))
    .in_singleton_scope();
  let parent = builder.build().unwrap();
  let child = parent.create_child_builder().build().unwrap();
  let session = child.get::<Session>(None).unwrap();

  child.dispose();

  assert_eq!(disposals.load(Ordering::SeqCst), 0);
  assert!(Arc::ptr_eq(&session, &parent.get::<Session>(None).unwrap()));
}

#[test]
fn test_read_through_to_a_disposed_parent_fails() {
  let mut builder = ContainerBuilder::new();
  builder.bind::<dyn Storage>().to::<Foo>();
  let parent = builder.build().unwrap();
  let child = parent.create_child_builder().build().unwrap();

  parent.dispose();

  assert!(matches!(
    child.get::<dyn Storage>(None),
    Err(Error::AlreadyDisposed { .. })
  ));
}

#[test]
fn test_parent_tracks_live_children() {
  let parent = ContainerBuilder::new().build().unwrap();
  let first = parent.create_child_builder().build().unwrap();
  let second = parent.create_child_builder().build().unwrap();
  assert_eq!(parent.live_children(), 2);

  drop(first);
  assert_eq!(parent.live_children(), 1);

  drop(second);
  assert_eq!(parent.live_children(), 0);
}

#[test]
fn test_child_inherits_options() {
  let options = ContainerOptions::default().compile(CompileMode::Eager);
  let parent = ContainerBuilder::new().with_options(options).build().unwrap();

  let child_builder = parent.create_child_builder();

  assert_eq!(child_builder.options(), options);
}
