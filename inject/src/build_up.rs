//! Member injection plans and their per-type cache.

use crate::container::Container;
use crate::error::{Error, Result};
use crate::injectable::{Injectable, InjectionPoint};
use dashmap::DashMap;
use std::any::{type_name, Any, TypeId};
use std::sync::Arc;

/// The member-injection plan of one type: its injection points, compiled once.
pub(crate) struct BuildUpPlan<T> {
  owner: &'static str,
  points: Vec<InjectionPoint<T>>,
}

impl<T: Injectable> BuildUpPlan<T> {
  fn compile() -> Self {
    Self {
      owner: type_name::<T>(),
      points: T::injection_points(),
    }
  }

  /// Assigns every injection point that is still empty on `target`.
  ///
  /// Optional members whose own key has no registration are left empty. Any
  /// other failure is wrapped in [`Error::Member`] naming the member.
  pub(crate) fn build_up(&self, container: &Container, target: &mut T) -> Result<()> {
    for point in &self.points {
      if !(point.is_empty)(target) {
        continue;
      }
      let resolved = container
        .resolve_erased(&point.key)
        .and_then(|instance| (point.assign)(target, &instance, &point.key));
      match resolved {
        Ok(()) => {}
        Err(Error::NotFound { key }) if point.optional && key == point.key => {
          tracing::trace!(owner = self.owner, member = point.name, "Optional member left empty.");
        }
        Err(source) => {
          return Err(Error::Member {
            owner: self.owner,
            member: point.name,
            source: Box::new(source),
          })
        }
      }
    }
    Ok(())
  }
}

/// Build-up plans keyed by the type they populate. One cache lives on each
/// container, so a plan is compiled at most once per type per container.
#[derive(Default)]
pub(crate) struct BuilderUpperCache {
  plans: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl BuilderUpperCache {
  pub(crate) fn plan_for<T: Injectable>(&self) -> Arc<BuildUpPlan<T>> {
    let erased = self
      .plans
      .entry(TypeId::of::<T>())
      .or_insert_with(|| Arc::new(BuildUpPlan::<T>::compile()))
      .clone();
    match erased.downcast::<BuildUpPlan<T>>() {
      Ok(plan) => plan,
      // Unreachable while plans are only inserted under their own TypeId.
      Err(_) => {
        let plan = Arc::new(BuildUpPlan::<T>::compile());
        self.plans.insert(TypeId::of::<T>(), plan.clone());
        plan
      }
    }
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize {
    self.plans.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Widget {
    label: Option<Arc<String>>,
  }

  impl Injectable for Widget {
    fn injection_points() -> Vec<InjectionPoint<Self>> {
      vec![InjectionPoint::new("label", |w: &mut Widget| &mut w.label)]
    }
  }

  #[test]
  fn test_plan_is_compiled_once_per_type() {
    let cache = BuilderUpperCache::default();

    let first = cache.plan_for::<Widget>();
    let second = cache.plan_for::<Widget>();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
    assert_eq!(first.points.len(), 1);
  }

  #[test]
  fn test_populated_members_are_not_overwritten() {
    let mut builder = crate::ContainerBuilder::new();
    builder
      .bind::<String>()
      .to_instance("from container".to_string());
    let container = builder.build().unwrap();

    let mut widget = Widget {
      label: Some(Arc::new("preset".to_string())),
    };
    container.build_up(&mut widget).unwrap();

    assert_eq!(widget.label.as_deref().map(String::as_str), Some("preset"));
  }
}
