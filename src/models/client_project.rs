use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::{clamped, parse_status};
use crate::error::ApiError;
use crate::resource::{Resource, ResourceService};

pub const MAX_PROGRESS: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Pending,
    InProgress,
    Review,
    Completed,
}

impl ProjectStatus {
    pub const ALL: [Self; 4] = [Self::Pending, Self::InProgress, Self::Review, Self::Completed];
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Completed => "completed",
        })
    }
}

impl FromStr for ProjectStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s, &Self::ALL)
    }
}

/// File attached to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub id: String,
    pub filename: String,
    pub file_path: String,
    pub uploaded_at: String,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUploadResponse {
    pub id: String,
    pub filename: String,
    pub message: String,
}

/// Project assigned to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientProject {
    pub id: String,
    pub name: String,
    pub client_id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: ProjectStatus,
    /// 0-100
    #[serde(deserialize_with = "progress_percent")]
    pub progress: u8,
    #[serde(default)]
    pub expected_delivery: Option<NaiveDate>,
    /// Admin notes, visible to the client.
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub files: Vec<ProjectFile>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn progress_percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    clamped(deserializer, 0, MAX_PROGRESS)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectDraft {
    pub name: String,
    pub client_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub status: ProjectStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_delivery: Option<NaiveDate>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl ProjectDraft {
    /// Set progress, capped at [`MAX_PROGRESS`] like the form's range input.
    pub fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(MAX_PROGRESS);
    }
}

impl From<&ClientProject> for ProjectDraft {
    fn from(p: &ClientProject) -> Self {
        Self {
            name: p.name.clone(),
            client_id: p.client_id.clone(),
            description: p.description.clone().unwrap_or_default(),
            status: p.status,
            progress: p.progress,
            expected_delivery: p.expected_delivery,
            notes: p.notes.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_delivery: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<ProjectDraft> for ProjectPatch {
    fn from(d: ProjectDraft) -> Self {
        Self {
            name: Some(d.name),
            client_id: Some(d.client_id),
            description: Some(d.description),
            status: Some(d.status),
            progress: Some(d.progress),
            expected_delivery: d.expected_delivery,
            notes: Some(d.notes),
        }
    }
}

pub struct ClientProjects;

impl Resource for ClientProjects {
    const NAME: &'static str = "project";
    const PLURAL: &'static str = "projects";
    const PATH: &'static str = "admin/client-projects";

    type Record = ClientProject;
    type Draft = ProjectDraft;
    type Patch = ProjectPatch;
    type Status = ProjectStatus;

    fn id(record: &ClientProject) -> &str {
        &record.id
    }

    fn status(record: &ClientProject) -> ProjectStatus {
        record.status
    }

    fn statuses() -> &'static [ProjectStatus] {
        &ProjectStatus::ALL
    }

    fn status_patch(status: ProjectStatus) -> ProjectPatch {
        ProjectPatch {
            status: Some(status),
            ..ProjectPatch::default()
        }
    }

    fn label(record: &ClientProject) -> String {
        record.name.clone()
    }
}

pub type ProjectService = ResourceService<ClientProjects>;

impl ResourceService<ClientProjects> {
    /// Multipart upload to `POST /admin/client-projects/{id}/files/`.
    pub async fn upload_file(
        &self,
        project_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<FileUploadResponse, ApiError> {
        self.http()
            .upload(&ClientProjects::nested_path(project_id, "files"), file_name, bytes)
            .await
    }

    pub async fn delete_file(&self, project_id: &str, file_id: &str) -> Result<(), ApiError> {
        let path = format!("{}{}/", ClientProjects::nested_path(project_id, "files"), file_id);
        self.http().delete(&path).await
    }
}
