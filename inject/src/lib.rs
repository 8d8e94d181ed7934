//! # Fibre Inject
//!
//! A thread-safe dependency-injection container for Rust.
//!
//! Services are identified by a type and an optional string key. Bindings are
//! declared on a [`ContainerBuilder`] and merged into a [`Container`] by
//! [`build`](ContainerBuilder::build); resolution compiles a plan for each
//! registration on first use and reuses it afterwards.
//!
//! ## Core Concepts
//!
//! - **Injectable**: a type declares its constructors and injectable members
//!   through the [`Injectable`] trait. The container picks the constructor
//!   whose parameters it can satisfy best.
//! - **Lifetimes**: bindings are transient by default; `in_singleton_scope`
//!   caches one instance per container and disposes it with the container.
//! - **Weak bindings**: a weak binding is a default that any normal binding
//!   for the same key replaces, regardless of declaration order.
//! - **Open generics**: a generic service family is bound once to a generic
//!   implementation family and closed on demand.
//! - **Child containers**: a child resolves its own bindings first and falls
//!   back to its parent, without sharing singleton lifetime.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_inject::{implements, resolve, Constructor, ContainerBuilder, Injectable, Parameter};
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!   fn greet(&self) -> String;
//! }
//!
//! struct EnglishGreeter {
//!   message: Arc<String>,
//! }
//!
//! impl Greeter for EnglishGreeter {
//!   fn greet(&self) -> String {
//!     self.message.to_string()
//!   }
//! }
//!
//! impl Injectable for EnglishGreeter {
//!   fn constructors() -> Vec<Constructor<Self>> {
//!     vec![Constructor::new(|args| Ok(EnglishGreeter { message: args.service()? }))
//!       .param(Parameter::service::<String>().keyed("greeting"))]
//!   }
//! }
//!
//! implements!(EnglishGreeter => dyn Greeter);
//!
//! let mut builder = ContainerBuilder::new();
//! builder
//!   .bind::<String>()
//!   .to_instance(String::from("Hello, World!"))
//!   .with_key("greeting");
//! builder.bind::<dyn Greeter>().to::<EnglishGreeter>().in_singleton_scope();
//! let container = builder.build().unwrap();
//!
//! let greeter = resolve!(container, trait Greeter);
//! assert_eq!(greeter.greet(), "Hello, World!");
//! ```

mod build_up;
mod builder;
mod catalog;
mod collection;
mod container;
mod core;
mod creator;
mod error;
mod factory;
mod generic;
mod injectable;
mod macros;
mod options;
mod registration;

pub use builder::{BindTo, BindingOptions, ContainerBuilder, Module, OpenBindTo, OpenBindingOptions};
pub use catalog::{CatalogRegistration, TypeCatalog};
pub use container::Container;
pub use crate::core::{ServiceType, TypeKey};
pub use error::{ConstructorError, Error, FactoryContractError, RegistrationError, Result};
pub use factory::{AbstractFactory, Factory, FactoryContract, FactoryMethod, FactoryResolver};
pub use generic::{GenericImplementation, GenericService, OpenGeneric, TypeArgs};
pub use injectable::{Arguments, Constructor, Disposable, Implements, Injectable, InjectionPoint, Parameter};
pub use options::{CompileMode, ContainerOptions, DisposeOrder};
