use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::client_project::ClientProject;
use super::parse_status;
use crate::error::ApiError;
use crate::resource::{Resource, ResourceService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    #[default]
    Active,
    Inactive,
}

impl ClientStatus {
    pub const ALL: [Self; 2] = [Self::Active, Self::Inactive];
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        })
    }
}

impl FromStr for ClientStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s, &Self::ALL)
    }
}

/// A client account with portal access to its projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: ClientStatus,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientDraft {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub company: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub phone: String,
    pub status: ClientStatus,
}

impl From<&Client> for ClientDraft {
    fn from(c: &Client) -> Self {
        Self {
            name: c.name.clone(),
            email: c.email.clone(),
            company: c.company.clone().unwrap_or_default(),
            phone: c.phone.clone().unwrap_or_default(),
            status: c.status,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ClientStatus>,
}

impl From<ClientDraft> for ClientPatch {
    fn from(d: ClientDraft) -> Self {
        Self {
            name: Some(d.name),
            email: Some(d.email),
            company: Some(d.company),
            phone: Some(d.phone),
            status: Some(d.status),
        }
    }
}

pub struct Clients;

impl Resource for Clients {
    const NAME: &'static str = "client";
    const PLURAL: &'static str = "clients";
    const PATH: &'static str = "admin/clients";

    type Record = Client;
    type Draft = ClientDraft;
    type Patch = ClientPatch;
    type Status = ClientStatus;

    fn id(record: &Client) -> &str {
        &record.id
    }

    fn status(record: &Client) -> ClientStatus {
        record.status
    }

    fn statuses() -> &'static [ClientStatus] {
        &ClientStatus::ALL
    }

    fn status_patch(status: ClientStatus) -> ClientPatch {
        ClientPatch {
            status: Some(status),
            ..ClientPatch::default()
        }
    }

    fn label(record: &Client) -> String {
        match &record.company {
            Some(company) if !company.is_empty() => format!("{} ({})", record.name, company),
            _ => record.name.clone(),
        }
    }
}

pub type ClientService = ResourceService<Clients>;

impl ResourceService<Clients> {
    /// Projects assigned to one client (`GET /admin/clients/{id}/projects/`).
    pub async fn projects(&self, client_id: &str) -> Result<Vec<ClientProject>, ApiError> {
        self.http()
            .get(&Clients::nested_path(client_id, "projects"))
            .await
    }
}
