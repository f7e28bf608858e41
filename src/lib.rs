//! backoffice: typed client for a marketing site's admin REST backend
//!
//! Layered the way the admin dashboard uses it:
//! - HTTP: base-URL policy, bearer-token injection, single-flight 401 handling
//! - Resources: one typed service per backend collection (testimonials, clients, projects)
//! - Manager: list cache + status filter + modal draft, full refetch after every mutation

pub mod config;
pub mod error;
pub mod session;
// Auth coordinator: owns the single-flight 401 redirect state
pub mod auth;
pub mod http;
pub mod health;
pub mod resource;
pub mod models;
pub mod manager;

pub use auth::{AuthCoordinator, Credential, LoggingNavigator, Navigator};
pub use config::{BaseUrl, ClientConfig, Environment};
pub use error::ApiError;
pub use http::HttpClient;
pub use manager::{Manager, ManagerState, Mode, Outcome, Prompter, StatusCounts, StatusFilter};
pub use resource::{CrudService, Resource, ResourceService};
pub use session::{FileTokenStore, MemoryTokenStore, TokenStore};
