//! Container-wide options.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// When registrations compile their generators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum CompileMode {
  /// Compile each registration on its first resolution.
  #[default]
  Lazy,
  /// Compile every registration during `build()`. The first failure fails
  /// the build.
  Eager,
  /// Compile every registration during `build()`, logging failures and
  /// leaving those registrations to fail again on use.
  EagerLenient,
}

/// The order singletons are disposed in when their container is disposed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum DisposeOrder {
  /// Most recently realized first.
  #[default]
  Reverse,
  /// In the order they were realized.
  Registration,
}

/// Container-wide settings. Child builders start from their parent's
/// options.
///
/// With the `serde` feature the options can be read from host
/// configuration; missing fields take their defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
  feature = "serde",
  derive(Serialize, Deserialize),
  serde(rename_all = "snake_case", default)
)]
pub struct ContainerOptions {
  pub compile: CompileMode,
  pub dispose_order: DisposeOrder,
}

impl ContainerOptions {
  pub fn compile(mut self, compile: CompileMode) -> Self {
    self.compile = compile;
    self
  }

  pub fn dispose_order(mut self, dispose_order: DisposeOrder) -> Self {
    self.dispose_order = dispose_order;
    self
  }
}
