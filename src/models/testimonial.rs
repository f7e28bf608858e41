use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::{clamped, parse_status};
use crate::error::ApiError;
use crate::resource::{Resource, ResourceService};

pub const SOURCE_ADMIN: &str = "admin_created";
pub const SOURCE_CLIENT_PORTAL: &str = "client_portal";
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestimonialStatus {
    Pending,
    Approved,
    Rejected,
}

impl TestimonialStatus {
    pub const ALL: [Self; 3] = [Self::Pending, Self::Approved, Self::Rejected];
}

impl fmt::Display for TestimonialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        })
    }
}

impl FromStr for TestimonialStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s, &Self::ALL)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub message: String,
    #[serde(deserialize_with = "star_rating")]
    pub rating: u8,
    #[serde(default)]
    pub image: Option<String>,
    pub status: TestimonialStatus,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Testimonial {
    /// Submitted through the client portal or explicitly verified by an admin.
    pub fn is_verified(&self) -> bool {
        self.verified || self.source == SOURCE_CLIENT_PORTAL
    }
}

fn star_rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    clamped(deserializer, MIN_RATING, MAX_RATING)
}

fn default_source() -> String {
    SOURCE_ADMIN.to_string()
}

/// Form state for the testimonial modal. Empty strings mean "not provided".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestimonialDraft {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub company: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
    pub message: String,
    pub rating: u8,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,
    pub status: TestimonialStatus,
    pub source: String,
    pub verified: bool,
}

impl Default for TestimonialDraft {
    // Admin-created testimonials go live straight away
    fn default() -> Self {
        Self {
            name: String::new(),
            role: String::new(),
            company: String::new(),
            email: String::new(),
            message: String::new(),
            rating: MAX_RATING,
            image: String::new(),
            status: TestimonialStatus::Approved,
            source: default_source(),
            verified: false,
        }
    }
}

impl From<&Testimonial> for TestimonialDraft {
    fn from(t: &Testimonial) -> Self {
        Self {
            name: t.name.clone(),
            role: t.role.clone().unwrap_or_default(),
            company: t.company.clone().unwrap_or_default(),
            email: t.email.clone().unwrap_or_default(),
            message: t.message.clone(),
            rating: t.rating,
            image: t.image.clone().unwrap_or_default(),
            status: t.status,
            source: t.source.clone(),
            verified: t.verified,
        }
    }
}

/// Partial update body; only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestimonialPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TestimonialStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl From<TestimonialDraft> for TestimonialPatch {
    fn from(d: TestimonialDraft) -> Self {
        Self {
            name: Some(d.name),
            role: Some(d.role),
            company: Some(d.company),
            email: Some(d.email),
            message: Some(d.message),
            rating: Some(d.rating),
            image: Some(d.image),
            status: Some(d.status),
            source: Some(d.source),
            verified: Some(d.verified),
        }
    }
}

pub struct Testimonials;

impl Resource for Testimonials {
    const NAME: &'static str = "testimonial";
    const PLURAL: &'static str = "testimonials";
    const PATH: &'static str = "testimonials";

    type Record = Testimonial;
    type Draft = TestimonialDraft;
    type Patch = TestimonialPatch;
    type Status = TestimonialStatus;

    fn id(record: &Testimonial) -> &str {
        &record.id
    }

    fn status(record: &Testimonial) -> TestimonialStatus {
        record.status
    }

    fn statuses() -> &'static [TestimonialStatus] {
        &TestimonialStatus::ALL
    }

    fn status_patch(status: TestimonialStatus) -> TestimonialPatch {
        TestimonialPatch {
            status: Some(status),
            ..TestimonialPatch::default()
        }
    }

    fn label(record: &Testimonial) -> String {
        record.name.clone()
    }

    fn transition_prompt(record: &Testimonial, status: TestimonialStatus) -> String {
        match status {
            TestimonialStatus::Approved => format!("Approve testimonial from {}?", record.name),
            TestimonialStatus::Rejected => format!(
                "Reject testimonial from {}? They can edit and resubmit.",
                record.name
            ),
            TestimonialStatus::Pending => {
                format!("Move testimonial from {} back to pending?", record.name)
            }
        }
    }
}

pub type TestimonialService = ResourceService<Testimonials>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_decodes_with_missing_optionals() {
        let t: Testimonial = serde_json::from_value(json!({
            "id": "t1",
            "name": "Ada",
            "message": "Great work",
            "rating": 4,
            "status": "pending"
        }))
        .unwrap();

        assert_eq!(t.source, SOURCE_ADMIN);
        assert_eq!(t.company, None);
        assert!(!t.is_verified());
    }

    #[test]
    fn test_rating_outside_stars_is_clamped() {
        let list: Vec<Testimonial> = serde_json::from_value(json!([
            { "id": "t1", "name": "Ada", "message": "Hi", "rating": 300, "status": "approved" },
            { "id": "t2", "name": "Bob", "message": "Hi", "rating": -1, "status": "pending" },
            { "id": "t3", "name": "Cy", "message": "Hi", "rating": 3, "status": "rejected" }
        ]))
        .unwrap();

        let ratings: Vec<u8> = list.iter().map(|t| t.rating).collect();
        assert_eq!(ratings, vec![MAX_RATING, MIN_RATING, 3]);
    }

    #[test]
    fn test_edit_draft_projects_record() {
        let t = Testimonial {
            id: "t1".into(),
            name: "Ada".into(),
            role: None,
            company: Some("Analytical Engines".into()),
            email: None,
            message: "Great work".into(),
            rating: 4,
            image: None,
            status: TestimonialStatus::Pending,
            source: SOURCE_CLIENT_PORTAL.into(),
            verified: false,
            project_name: Some("Site redesign".into()),
            created_at: None,
        };
        assert!(t.is_verified());

        let draft = TestimonialDraft::from(&t);
        assert_eq!(draft.company, "Analytical Engines");
        assert_eq!(draft.role, "");
        assert_eq!(draft.status, TestimonialStatus::Pending);

        let body = serde_json::to_value(&draft).unwrap();
        assert!(body.get("role").is_none());
        assert_eq!(body["company"], "Analytical Engines");
    }

    #[test]
    fn test_status_patch_sends_only_status() {
        let patch = Testimonials::status_patch(TestimonialStatus::Approved);
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"status": "approved"}));
    }

    #[test]
    fn test_default_draft_and_status_parsing() {
        let draft = TestimonialDraft::default();
        assert_eq!(draft.rating, 5);
        assert_eq!(draft.status, TestimonialStatus::Approved);
        assert_eq!(draft.source, SOURCE_ADMIN);

        assert_eq!("Rejected".parse::<TestimonialStatus>().unwrap(), TestimonialStatus::Rejected);
        assert!("archived".parse::<TestimonialStatus>().is_err());
    }
}
