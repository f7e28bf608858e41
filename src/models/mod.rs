//! Wire types for the backend's resources, plus the [`Resource`](crate::Resource)
//! binding for each collection.

pub mod client;
pub mod client_project;
pub mod testimonial;

pub use client::{Client, ClientDraft, ClientPatch, ClientService, ClientStatus, Clients};
pub use client_project::{
    ClientProject, ClientProjects, FileUploadResponse, ProjectDraft, ProjectFile, ProjectPatch,
    ProjectService, ProjectStatus,
};
pub use testimonial::{
    Testimonial, TestimonialDraft, TestimonialPatch, TestimonialService, TestimonialStatus,
    Testimonials,
};

use serde::{Deserialize, Deserializer};

use crate::error::ApiError;

/// Decode any JSON integer into `min..=max`. The backend stores these as
/// plain ints, so one stray value must not fail a whole list.
pub(crate) fn clamped<'de, D: Deserializer<'de>>(
    deserializer: D,
    min: u8,
    max: u8,
) -> Result<u8, D::Error> {
    let n = i64::deserialize(deserializer)?;
    Ok(n.clamp(i64::from(min), i64::from(max)) as u8)
}

/// Parse a status keyword (`in_progress`, `in-progress`, `In Progress` all match).
pub(crate) fn parse_status<S: Copy + std::fmt::Display>(
    raw: &str,
    all: &[S],
) -> Result<S, ApiError> {
    let wanted = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
    all.iter()
        .copied()
        .find(|status| status.to_string() == wanted)
        .ok_or_else(|| {
            let options: Vec<String> = all.iter().map(ToString::to_string).collect();
            ApiError::config(format!(
                "unknown status '{}' (expected one of: {})",
                raw,
                options.join(", ")
            ))
        })
}
