//! Seed a backend with sample testimonials.
//!
//! Uses the session stored by `backoffice login` (or BACKOFFICE_TOKEN_FILE).
//! Run: cargo run --bin seed_demo

use std::sync::Arc;

use backoffice::auth::{AuthCoordinator, LoggingNavigator};
use backoffice::config::HOME_ROUTE;
use backoffice::manager::StatusCounts;
use backoffice::models::{TestimonialDraft, TestimonialService, TestimonialStatus, Testimonials};
use backoffice::{ClientConfig, CrudService, FileTokenStore, HttpClient};
use futures::future::join_all;
use tracing::{info, warn};

const SAMPLES: [(&str, &str, &str, u8, TestimonialStatus); 5] = [
    (
        "Ada Lovelace",
        "Analytical Engines",
        "Delivered ahead of schedule and explained every step.",
        5,
        TestimonialStatus::Approved,
    ),
    (
        "Grace Hopper",
        "Navy Labs",
        "Clear communication, clean code, no surprises.",
        5,
        TestimonialStatus::Approved,
    ),
    (
        "Alan Turing",
        "Bletchley Park",
        "The new site loads in half the time.",
        4,
        TestimonialStatus::Pending,
    ),
    (
        "Edsger Dijkstra",
        "",
        "Solid work, though I would have used fewer gotos.",
        3,
        TestimonialStatus::Pending,
    ),
    (
        "Barbara Liskov",
        "CLU Systems",
        "Substitutable in every sense.",
        5,
        TestimonialStatus::Rejected,
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ClientConfig::from_env()?;
    let store = Arc::new(FileTokenStore::new(config.token_file.clone()));
    let navigator = Arc::new(LoggingNavigator::new(HOME_ROUTE));
    let auth = Arc::new(AuthCoordinator::new(store, navigator));
    if !auth.is_authenticated() {
        warn!("No stored session; run `backoffice login` first");
    }
    let http = Arc::new(HttpClient::new(&config, auth)?);
    let service = TestimonialService::new(http);

    let drafts: Vec<TestimonialDraft> = SAMPLES
        .iter()
        .map(|&(name, company, message, rating, status)| TestimonialDraft {
            name: name.to_string(),
            company: company.to_string(),
            message: message.to_string(),
            rating,
            status,
            ..TestimonialDraft::default()
        })
        .collect();

    let results = join_all(drafts.iter().map(|draft| service.create(draft))).await;
    let mut created = 0;
    for (draft, result) in drafts.iter().zip(results) {
        match result {
            Ok(record) => {
                info!("Created testimonial {} from {}", record.id, record.name);
                created += 1;
            }
            Err(e) => warn!(
                "Failed to create testimonial from {}: {}",
                draft.name,
                e.user_message()
            ),
        }
    }

    let all = service.list().await?;
    let counts = StatusCounts::tally::<Testimonials>(&all);
    println!(
        "Seeded {}/{} testimonials. Backend now has {}",
        created,
        drafts.len(),
        counts
    );

    Ok(())
}
