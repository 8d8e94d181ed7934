use fibre_inject::{resolve, ContainerBuilder, Error};
use std::panic::{self, AssertUnwindSafe};

struct UnregisteredService;

fn main() {
  let container = ContainerBuilder::new()
    .build()
    .expect("an empty container always builds");

  // --- Using the panicking `resolve!` macro ---
  println!("Attempting to resolve a service that was never registered...");

  let result = panic::catch_unwind(AssertUnwindSafe(|| {
    // This line will panic!
    let _service = resolve!(container, UnregisteredService);
  }));

  assert!(result.is_err(), "resolve! should have panicked.");
  println!("Successfully caught the expected panic from resolve!.");

  // --- Using the fallible `get()` method ---
  println!("\nNow, attempting to resolve using the fallible `get()` method...");

  match container.get::<UnregisteredService>(None) {
    Ok(_) => panic!("Should not have found the service!"),
    Err(Error::NotFound { key }) => println!("Correctly received NotFound for {key}."),
    Err(other) => panic!("Unexpected error: {other}"),
  }
}
