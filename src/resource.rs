//! Typed REST services, one per backend collection.
//!
//! Every [`Resource`] maps onto the same five endpoints:
//! `GET /{path}/`, `GET /{path}/{id}/`, `POST /{path}/`, `PUT /{path}/{id}/`,
//! `DELETE /{path}/{id}/`. Services are pure pass-through: no local
//! validation, errors forwarded as the HTTP layer produced them.

use std::fmt::{Debug, Display};
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::HttpClient;

/// A backend-managed entity type.
pub trait Resource: Send + Sync + 'static {
    /// Singular name used in operator messages, e.g. `testimonial`.
    const NAME: &'static str;
    const PLURAL: &'static str;
    /// Collection path relative to the API root, without slashes.
    const PATH: &'static str;

    type Record: DeserializeOwned + Clone + Debug + Send + Sync;
    /// Editable form of a record: `Default` for create, `From<&Record>` for edit.
    type Draft: Serialize + Default + for<'a> From<&'a Self::Record> + Clone + Debug + Send + Sync;
    type Patch: Serialize + From<Self::Draft> + Debug + Send + Sync;
    type Status: Copy + Eq + Debug + Display + Send + Sync + 'static;

    fn id(record: &Self::Record) -> &str;

    fn status(record: &Self::Record) -> Self::Status;

    /// Every status value, in display order.
    fn statuses() -> &'static [Self::Status];

    /// Patch that changes only the status.
    fn status_patch(status: Self::Status) -> Self::Patch;

    /// Human label for a record in prompts.
    fn label(record: &Self::Record) -> String;

    fn transition_prompt(record: &Self::Record, status: Self::Status) -> String {
        format!("Mark {} {} as {}?", Self::NAME, Self::label(record), status)
    }

    fn collection_path() -> String {
        format!("{}/", Self::PATH)
    }

    fn item_path(id: &str) -> String {
        format!("{}/{}/", Self::PATH, id)
    }

    fn nested_path(id: &str, sub: &str) -> String {
        format!("{}/{}/{}/", Self::PATH, id, sub.trim_matches('/'))
    }
}

/// List/get/create/update/delete for one resource.
#[async_trait]
pub trait CrudService<R: Resource>: Send + Sync {
    async fn list(&self) -> Result<Vec<R::Record>, ApiError>;

    /// Fails with a 404 [`ApiError::Http`] when the id is unknown.
    async fn get(&self, id: &str) -> Result<R::Record, ApiError>;

    async fn create(&self, draft: &R::Draft) -> Result<R::Record, ApiError>;

    async fn update(&self, id: &str, patch: &R::Patch) -> Result<R::Record, ApiError>;

    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}

/// [`CrudService`] backed by the REST API.
pub struct ResourceService<R> {
    http: Arc<HttpClient>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> ResourceService<R> {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            _resource: PhantomData,
        }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }
}

impl<R> Clone for ResourceService<R> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            _resource: PhantomData,
        }
    }
}

#[async_trait]
impl<R: Resource> CrudService<R> for ResourceService<R> {
    async fn list(&self) -> Result<Vec<R::Record>, ApiError> {
        self.http.get(&R::collection_path()).await
    }

    async fn get(&self, id: &str) -> Result<R::Record, ApiError> {
        self.http.get(&R::item_path(id)).await
    }

    async fn create(&self, draft: &R::Draft) -> Result<R::Record, ApiError> {
        self.http.post(&R::collection_path(), draft).await
    }

    async fn update(&self, id: &str, patch: &R::Patch) -> Result<R::Record, ApiError> {
        self.http.put(&R::item_path(id), patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.http.delete(&R::item_path(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClientProjects, Clients, Testimonials};

    #[test]
    fn test_paths_follow_rest_layout() {
        assert_eq!(Testimonials::collection_path(), "testimonials/");
        assert_eq!(Testimonials::item_path("42"), "testimonials/42/");
        assert_eq!(Clients::nested_path("7", "projects"), "admin/clients/7/projects/");
        assert_eq!(
            ClientProjects::nested_path("p1", "/files/"),
            "admin/client-projects/p1/files/"
        );
    }
}
