//! Authorization policy for the HR suite.
//!
//! The crate answers two questions for every protected surface: may a role
//! perform an action on a resource, and may it navigate to a route. Both are
//! answered from one immutable [`PolicyCatalog`] by a [`PolicyEngine`]; the
//! [`Guard`] turns those answers into navigation verdicts and the
//! [`AccessPort`] exposes them to conditional UI and audit tooling.
//!
//! Decisions never fail. Only catalog construction returns [`PolicyError`].

mod builtin;
pub mod catalog;
pub mod context;
pub mod document;
pub mod engine;
pub mod error;
pub mod guard;
pub mod model;
pub mod port;

pub use catalog::{CatalogBuilder, CatalogWarning, PolicyCatalog, RouteDefault, RoutePolicy};
pub use context::{Actor, AuthorizationContext, SessionProvider};
pub use document::PolicyDocument;
pub use engine::{CapabilitySnapshot, PolicyEngine};
pub use error::PolicyError;
pub use guard::{Denial, Guard, Requirement, Verdict, DEFAULT_LOGIN_ROUTE};
pub use model::{Action, Resource, Role, UnknownName};
pub use port::AccessPort;
