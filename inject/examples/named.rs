use fibre_inject::{implements, resolve, Constructor, ContainerBuilder, Injectable};

// --- Abstraction and Implementations ---
trait MessageSender: Send + Sync {
  fn send(&self, to: &str, message: &str) -> String;
}

struct EmailSender;
impl MessageSender for EmailSender {
  fn send(&self, to: &str, message: &str) -> String {
    format!("Sending email to {}: '{}'", to, message)
  }
}
impl Injectable for EmailSender {
  fn constructors() -> Vec<Constructor<Self>> {
    vec![Constructor::new(|_| Ok(EmailSender))]
  }
}

struct SmsSender;
impl MessageSender for SmsSender {
  fn send(&self, to: &str, message: &str) -> String {
    format!("Sending SMS to {}: '{}'", to, message)
  }
}
impl Injectable for SmsSender {
  fn constructors() -> Vec<Constructor<Self>> {
    vec![Constructor::new(|_| Ok(SmsSender))]
  }
}

implements!(EmailSender => dyn MessageSender);
implements!(SmsSender => dyn MessageSender);

fn main() {
  // --- Registration ---
  // Bind both implementations to the same trait under different keys.
  let mut builder = ContainerBuilder::new();
  builder
    .bind::<dyn MessageSender>()
    .to::<EmailSender>()
    .with_key("email")
    .in_singleton_scope();
  builder
    .bind::<dyn MessageSender>()
    .to::<SmsSender>()
    .with_key("sms")
    .in_singleton_scope();
  let container = builder.build().expect("bindings are valid");

  // --- Resolution ---
  // Choose the implementation at the point of resolution.
  let email_notifier = resolve!(container, trait MessageSender, "email");
  let sms_notifier = resolve!(container, trait MessageSender, "sms");

  let result1 = email_notifier.send("test@example.com", "Hello from Fibre!");
  let result2 = sms_notifier.send("+123456789", "Hello from Fibre!");

  println!("{}", result1);
  println!("{}", result2);

  assert!(result1.contains("email"));
  assert!(result2.contains("SMS"));

  // The unkeyed service was never bound.
  assert!(container.get::<dyn MessageSender>(None).is_err());
}
