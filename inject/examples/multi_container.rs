use fibre_inject::{Container, ContainerBuilder};

// Logic that only depends on what a container provides. By accepting a
// `&Container`, it can be run against a controlled environment.
fn process_data(container: &Container) -> String {
  let data = container
    .get::<String>(None)
    .expect("Data not found in container");
  format!("Processed: {}", data.to_uppercase())
}

fn main() {
  // --- Application container ---
  let mut builder = ContainerBuilder::new();
  builder.bind::<String>().to_instance("production data".to_string());
  builder
    .bind::<u16>()
    .to_instance(8080u16)
    .with_key("port");
  let app = builder.build().expect("application bindings are valid");

  // --- A child container overriding one binding for a test run ---
  println!("--- Running with a child container ---");
  let mut child_builder = app.create_child_builder();
  child_builder.bind::<String>().to_instance("test data".to_string());
  let test_container = child_builder.build().expect("test bindings are valid");

  let result = process_data(&test_container);
  println!("Result: {}", result);
  assert_eq!(result, "Processed: TEST DATA");

  // Bindings the child does not override are read through to the parent.
  let port = test_container.get::<u16>(Some("port")).expect("inherited from parent");
  assert_eq!(*port, 8080);

  // --- Verify Isolation ---
  // The override registered in the child does not leak into the parent.
  assert_eq!(process_data(&app), "Processed: PRODUCTION DATA");
  println!("\nVerified that the child container is isolated from its parent.");
}
