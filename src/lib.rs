//! Runtime dependency injection container with tagged, scoped, argument-taking and context-bound bindings.
//!
//! Bindings are declared in [`Module`]s, imported into a [`RegistryBuilder`] and resolved by a [`Container`].
//! Retrievals are made through [`DiAware`], implemented by the container and by the [`Di`] handle passed to binding bodies.
//!
//! ```
//! use dicon::{Bind, Container, DefaultScope, DiAware as _, Module, RegistryBuilder};
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct Repository {
//!     database: std::sync::Arc<Database>,
//! }
//!
//! let module = Module::new("app")
//!     .instance(Bind::tagged("url"), String::from("postgres://localhost"))
//!     .provide(Bind::new(), DefaultScope::Singleton, |di| {
//!         Ok(Database {
//!             url: (*di.instance::<String>("url")?).clone(),
//!         })
//!     })
//!     .provide(Bind::new(), DefaultScope::Unscoped, |di| {
//!         Ok(Repository {
//!             database: di.instance(())?,
//!         })
//!     });
//!
//! let container = Container::new(RegistryBuilder::new().import(&module).unwrap().build());
//!
//! let first = container.instance::<Repository>(()).unwrap();
//! let second = container.instance::<Repository>(()).unwrap();
//! assert!(std::sync::Arc::ptr_eq(&first.database, &second.database));
//! assert_eq!(first.database.url, "postgres://localhost");
//! ```

pub(crate) mod any;
pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod container;
pub(crate) mod context;
pub(crate) mod di;
pub(crate) mod errors;
pub(crate) mod finalizer;
pub(crate) mod instantiator;
pub(crate) mod key;
pub(crate) mod module;
pub(crate) mod registry;
pub(crate) mod retrieval;
pub(crate) mod scope;
pub(crate) mod service;
pub(crate) mod stack;
pub(crate) mod translator;

pub use any::TypeInfo;
pub use config::Config;
pub use container::Container;
pub use context::Context;
pub use di::Di;
pub use errors::{ImportErrorKind, InstantiateErrorKind, ResolveErrorKind};
pub use finalizer::Finalizer;
pub use key::{IntoTag, Key, Tag};
pub use module::{Bind, Module};
pub use registry::{Registry, RegistryBuilder};
pub use retrieval::{DiAware, Factory, Provider};
pub use scope::DefaultScope;
pub use translator::ContextTranslator;
