//! Public macros for ergonomic resolution and declarations.

/// Resolves a service from a container, panicking if it cannot be resolved.
///
/// Use this where a missing service is a programming error. For a
/// non-panicking version, call `container.get(...)` directly.
///
/// # Panics
///
/// Panics with the resolution error if the service is missing, ambiguous or
/// its container has been disposed.
///
/// # Examples
///
/// ```
/// use fibre_inject::{resolve, ContainerBuilder};
///
/// let mut builder = ContainerBuilder::new();
/// builder.bind::<String>().to_instance(String::from("hello"));
/// let container = builder.build().unwrap();
///
/// let message = resolve!(container, String);
/// assert_eq!(*message, "hello");
/// ```
///
/// ```
/// use fibre_inject::{implements, resolve, ContainerBuilder};
///
/// trait Greeter: Send + Sync {
///   fn greet(&self) -> String;
/// }
/// struct EnglishGreeter;
/// impl Greeter for EnglishGreeter {
///   fn greet(&self) -> String {
///     "Hello!".to_string()
///   }
/// }
/// implements!(EnglishGreeter => dyn Greeter);
///
/// let mut builder = ContainerBuilder::new();
/// builder.bind::<dyn Greeter>().to_instance(EnglishGreeter).with_key("en");
/// let container = builder.build().unwrap();
///
/// let greeter = resolve!(container, trait Greeter, "en");
/// assert_eq!(greeter.greet(), "Hello!");
/// ```
#[macro_export]
macro_rules! resolve {
  // Trait objects: resolve!(container, trait MyTrait)
  ($container:expr, trait $trait_ident:ident) => {
    $container
      .get::<dyn $trait_ident>(None)
      .unwrap_or_else(|err| {
        panic!(
          "Failed to resolve required trait service {}: {}",
          std::any::type_name::<dyn $trait_ident>(),
          err
        )
      })
  };

  ($container:expr, trait $trait_ident:ident, $name:expr) => {
    $container
      .get::<dyn $trait_ident>(Some($name))
      .unwrap_or_else(|err| {
        panic!(
          "Failed to resolve required trait service with key '{}': {}",
          $name, err
        )
      })
  };

  ($container:expr, $type:ty) => {
    $container.get::<$type>(None).unwrap_or_else(|err| {
      panic!(
        "Failed to resolve required service {}: {}",
        std::any::type_name::<$type>(),
        err
      )
    })
  };

  ($container:expr, $type:ty, $name:expr) => {
    $container.get::<$type>(Some($name)).unwrap_or_else(|err| {
      panic!(
        "Failed to resolve required service with key '{}': {}",
        $name, err
      )
    })
  };
}

/// Declares the services a type can be handed out as.
///
/// ```
/// use fibre_inject::implements;
///
/// trait Reader: Send + Sync {}
/// trait Writer: Send + Sync {}
///
/// struct File;
/// impl Reader for File {}
/// impl Writer for File {}
///
/// implements!(File => dyn Reader, dyn Writer);
/// ```
#[macro_export]
macro_rules! implements {
  ($imp:ty => $($service:ty),+ $(,)?) => {
    $(
      impl $crate::Implements<$service> for $imp {
        fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$service> {
          self
        }
      }
    )+
  };
}

/// Declares a factory trait and generates its container-backed
/// implementation.
///
/// Each method returns a service and takes at most one `&str` key. The
/// generated type implements [`AbstractFactory`](crate::AbstractFactory) and
/// is bound with `to_abstract_factory`. Only `pub` factories pass
/// validation.
///
/// ```
/// use fibre_inject::{abstract_factory, implements, ContainerBuilder};
///
/// pub trait Shape: Send + Sync {
///   fn sides(&self) -> u32;
/// }
/// struct Triangle;
/// impl Shape for Triangle {
///   fn sides(&self) -> u32 {
///     3
///   }
/// }
/// implements!(Triangle => dyn Shape);
///
/// abstract_factory! {
///   pub trait ShapeFactory => ShapeFactoryImpl {
///     fn shape(&self, key: &str) -> dyn Shape;
///   }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.bind::<dyn Shape>().to_instance(Triangle).with_key("triangle");
/// builder.bind::<dyn ShapeFactory>().to_abstract_factory::<ShapeFactoryImpl>();
/// let container = builder.build().unwrap();
///
/// let factory = container.get::<dyn ShapeFactory>(None).unwrap();
/// assert_eq!(factory.shape("triangle").unwrap().sides(), 3);
/// ```
#[macro_export]
macro_rules! abstract_factory {
  (
    $(#[$meta:meta])*
    $vis:vis trait $name:ident => $imp:ident {
      $(
        $(#[$method_meta:meta])*
        fn $method:ident(&self $(, $key:ident : &str)?) -> $ret:ty;
      )*
    }
  ) => {
    $(#[$meta])*
    $vis trait $name: Send + Sync {
      $(
        $(#[$method_meta])*
        fn $method(&self $(, $key: &str)?) -> $crate::Result<::std::sync::Arc<$ret>>;
      )*
    }

    $vis struct $imp {
      resolver: $crate::FactoryResolver,
    }

    impl $name for $imp {
      $(
        fn $method(&self $(, $key: &str)?) -> $crate::Result<::std::sync::Arc<$ret>> {
          self.resolver.get::<$ret>(None $(.or(Some($key)))?)
        }
      )*
    }

    impl $crate::AbstractFactory for $imp {
      fn contract() -> $crate::FactoryContract {
        $crate::FactoryContract::new(stringify!($name))
          .public(stringify!($vis) == "pub")
          $(
            .method(
              $crate::FactoryMethod::returning::<$ret>(stringify!($method))
                $(.key_parameter(stringify!($key)))?
            )
          )*
      }

      fn from_resolver(resolver: $crate::FactoryResolver) -> Self {
        Self { resolver }
      }
    }

    impl $crate::Implements<dyn $name> for $imp {
      fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<dyn $name> {
        self
      }
    }
  };
}
