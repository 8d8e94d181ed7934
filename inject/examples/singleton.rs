use fibre_inject::{resolve, Constructor, ContainerBuilder, Disposable, Injectable};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

// A simple service that gets a unique ID upon creation.
struct RequestTracker {
  id: usize,
}

// A global, thread-safe counter to generate unique IDs.
static ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

impl Injectable for RequestTracker {
  fn constructors() -> Vec<Constructor<Self>> {
    vec![Constructor::new(|_| {
      println!("Creating RequestTracker...");
      Ok(RequestTracker {
        id: ID_COUNTER.fetch_add(1, Ordering::SeqCst),
      })
    })]
  }

  fn as_disposable(&self) -> Option<&dyn Disposable> {
    Some(self)
  }
}

impl Disposable for RequestTracker {
  fn dispose(&self) {
    println!("Disposing RequestTracker {}.", self.id);
  }
}

fn main() {
  let mut builder = ContainerBuilder::new();
  // Constructed once per container.
  builder
    .bind::<RequestTracker>()
    .to_self()
    .with_key("singleton_tracker")
    .in_singleton_scope();
  // Constructed on every resolution.
  builder
    .bind::<RequestTracker>()
    .to_self()
    .with_key("transient_tracker");
  let container = builder.build().expect("bindings are valid");

  println!("--- Resolving Singletons ---");
  let s1 = resolve!(container, RequestTracker, "singleton_tracker");
  let s2 = resolve!(container, RequestTracker, "singleton_tracker");
  println!("Singleton 1 ID: {}, Singleton 2 ID: {}", s1.id, s2.id);
  assert_eq!(s1.id, 0);
  assert_eq!(s2.id, 0);
  assert!(
    Arc::ptr_eq(&s1, &s2),
    "Singleton instances should be identical"
  );
  println!("Singleton instances are the same pointer, as expected.\n");

  println!("--- Resolving Transients ---");
  let t1 = resolve!(container, RequestTracker, "transient_tracker");
  let t2 = resolve!(container, RequestTracker, "transient_tracker");
  println!("Transient 1 ID: {}, Transient 2 ID: {}", t1.id, t2.id);
  assert_eq!(t1.id, 1);
  assert_eq!(t2.id, 2);
  assert!(
    !Arc::ptr_eq(&t1, &t2),
    "Transient instances should be different"
  );
  println!("Transient instances are different pointers, as expected.\n");

  // Only the singleton is disposed by the container.
  println!("--- Disposing the container ---");
  container.dispose();
  assert!(container.get::<RequestTracker>(Some("singleton_tracker")).is_err());
}
