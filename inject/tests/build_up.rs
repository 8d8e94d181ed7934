use fibre_inject::{Constructor, ContainerBuilder, Error, Injectable, InjectionPoint};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// --- Test Fixtures ---

struct Settings {
  theme: &'static str,
}
impl Injectable for Settings {
  fn constructors() -> Vec<Constructor<Self>> {
    vec![Constructor::new(|_| Ok(Settings { theme: "dark" }))]
  }
}

struct Telemetry;
impl Injectable for Telemetry {
  fn constructors() -> Vec<Constructor<Self>> {
    vec![Constructor::new(|_| Ok(Telemetry))]
  }
}

/// A caller-owned object with injectable members.
#[derive(Default)]
struct Page {
  settings: Option<Arc<Settings>>,
  title: Option<Arc<String>>,
  telemetry: Option<Arc<Telemetry>>,
}

impl Injectable for Page {
  fn injection_points() -> Vec<InjectionPoint<Self>> {
    vec![
      InjectionPoint::new("settings", |p: &mut Page| &mut p.settings),
      InjectionPoint::new("title", |p: &mut Page| &mut p.title).keyed("title"),
      InjectionPoint::new("telemetry", |p: &mut Page| &mut p.telemetry).optional(),
    ]
  }
}

fn container() -> fibre_inject::Container {
  let mut builder = ContainerBuilder::new();
  builder.bind::<Settings>().to_self().in_singleton_scope();
  builder.bind::<String>().to_instance("Home".to_string()).with_key("title");
  builder.build().unwrap()
}

// --- Build-up Tests ---

#[test]
fn test_build_up_populates_empty_members() {
  // Arrange
  let container = container();
  let mut page = Page::default();

  // Act
  container.build_up(&mut page).unwrap();

  // Assert
  assert_eq!(page.settings.as_ref().unwrap().theme, "dark");
  assert_eq!(page.title.as_deref().map(String::as_str), Some("Home"));
  // Optional and unregistered: left alone.
  assert!(page.telemetry.is_none());
}

#[test]
fn test_build_up_is_idempotent() {
  // Arrange
  let container = container();
  let preset = Arc::new("Preset".to_string());
  let mut page = Page {
    title: Some(preset.clone()),
    ..Page::default()
  };

  // Act
  container.build_up(&mut page).unwrap();
  let settings = page.settings.clone().unwrap();
  container.build_up(&mut page).unwrap();

  // Assert
  assert!(Arc::ptr_eq(page.title.as_ref().unwrap(), &preset));
  assert!(Arc::ptr_eq(page.settings.as_ref().unwrap(), &settings));
}

#[test]
fn test_object_without_members_is_unaffected() {
  #[derive(Debug, PartialEq)]
  struct Plain {
    value: u8,
  }
  impl Injectable for Plain {}

  let container = container();
  let mut plain = Plain { value: 7 };

  container.build_up(&mut plain).unwrap();

  assert_eq!(plain, Plain { value: 7 });
}

#[test]
fn test_missing_required_member_names_the_member() {
  // Arrange
  let container = ContainerBuilder::new().build().unwrap();
  let mut page = Page::default();

  // Act
  let err = container.build_up(&mut page).unwrap_err();

  // Assert
  match err {
    Error::Member { member, source, .. } => {
      assert_eq!(member, "settings");
      assert!(matches!(*source, Error::NotFound { .. }));
    }
    other => panic!("unexpected error: {other}"),
  }
}

// --- Members of Constructed Services ---

static HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

struct Dashboard {
  settings: Option<Arc<Settings>>,
  ready: AtomicBool,
}

impl Injectable for Dashboard {
  fn constructors() -> Vec<Constructor<Self>> {
    vec![Constructor::new(|_| {
      Ok(Dashboard {
        settings: None,
        ready: AtomicBool::new(false),
      })
    })]
  }

  fn injection_points() -> Vec<InjectionPoint<Self>> {
    vec![InjectionPoint::new("settings", |d: &mut Dashboard| &mut d.settings)]
  }

  fn parameters_injected(&self) {
    // Members are already populated when the hook runs.
    assert!(self.settings.is_some());
    self.ready.store(true, Ordering::SeqCst);
    HOOK_CALLS.fetch_add(1, Ordering::SeqCst);
  }
}

#[test]
fn test_constructed_service_is_built_up_then_notified() {
  // Arrange
  let mut builder = ContainerBuilder::new();
  builder.bind::<Settings>().to_self();
  builder.bind::<Dashboard>().to_self();
  let container = builder.build().unwrap();
  let before = HOOK_CALLS.load(Ordering::SeqCst);

  // Act
  let dashboard = container.get::<Dashboard>(None).unwrap();

  // Assert
  assert!(dashboard.settings.is_some());
  assert!(dashboard.ready.load(Ordering::SeqCst));
  assert!(HOOK_CALLS.load(Ordering::SeqCst) > before);
}

#[test]
fn test_factory_output_is_built_up_too() {
  // Arrange
  let mut builder = ContainerBuilder::new();
  builder.bind::<Settings>().to_self();
  builder.bind::<Dashboard>().to_factory(|_| {
    Ok(Dashboard {
      settings: None,
      ready: AtomicBool::new(false),
    })
  });
  let container = builder.build().unwrap();

  // Act
  let dashboard = container.get::<Dashboard>(None).unwrap();

  // Assert
  assert!(dashboard.settings.is_some());
  assert!(dashboard.ready.load(Ordering::SeqCst));
}
