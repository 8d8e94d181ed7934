use fibre_inject::{implements, resolve, Constructor, ContainerBuilder, Injectable};
use std::sync::Arc;

// 1. Define the abstraction (the trait)
trait Logger: Send + Sync {
  fn log(&self, message: &str);
}

// 2. Define a concrete implementation
struct ConsoleLogger;
impl Logger for ConsoleLogger {
  fn log(&self, message: &str) {
    println!("[CONSOLE LOG]: {}", message);
  }
}
impl Injectable for ConsoleLogger {
  fn constructors() -> Vec<Constructor<Self>> {
    vec![Constructor::new(|_| Ok(ConsoleLogger))]
  }
}
implements!(ConsoleLogger => dyn Logger);

// 3. Define a service that depends on the abstraction
struct ReportService {
  logger: Arc<dyn Logger>,
}

impl ReportService {
  fn generate_report(&self) {
    self.logger.log("Starting report generation.");
    // ... logic to generate report ...
    self.logger.log("Finished report generation.");
  }
}

// The constructor declares the dependency; the container supplies it.
impl Injectable for ReportService {
  fn constructors() -> Vec<Constructor<Self>> {
    vec![Constructor::new(|args| Ok(ReportService { logger: args.service()? })).service::<dyn Logger>()]
  }
}

fn main() {
  // --- Registration ---
  let mut builder = ContainerBuilder::new();
  // The container stores an Arc<ConsoleLogger> and serves it as Arc<dyn Logger>.
  builder.bind::<dyn Logger>().to::<ConsoleLogger>().in_singleton_scope();
  builder.bind::<ReportService>().to_self().in_singleton_scope();
  let container = builder.build().expect("bindings are valid");

  // --- Resolution and Usage ---
  println!("Resolving the high-level service...");
  let report_service = resolve!(container, ReportService);

  println!("Using the service...");
  report_service.generate_report();
}
