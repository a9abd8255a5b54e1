//! End-to-end enrichment scenarios against mock websites

use crate::common::{build_pipeline, html_page, test_config, Fixture};
use chrono::{Duration as ChronoDuration, Utc};
use outreach_enrich::contact::Confidence;
use outreach_enrich::lookup::Lookup;
use outreach_enrich::pipeline::CandidateSelector;
use outreach_enrich::store::{OpportunityStatus, OpportunityStore, RunStatus};
use outreach_enrich::validator::DomainMetrics;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod \
tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis nostrud \
exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. Duis aute irure dolor in \
reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla pariatur. Excepteur sint \
occaecat cupidatat non proident, sunt in culpa qui officia deserunt mollit anim id est laborum.";

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

fn registration_record(age_days: i64) -> String {
    let created = Utc::now() - ChronoDuration::days(age_days);
    format!(
        "Domain Name: ACME.TEST\nCreation Date: {}\nRegistrar: Example Registrar\n",
        created.format("%Y-%m-%dT%H:%M:%SZ")
    )
}

#[tokio::test]
async fn test_lorem_ipsum_site_without_contact_is_rejected_at_tier_one() {
    let server = MockServer::start().await;
    let body = html_page("Lorem", &format!("<p>{}</p>", LOREM));
    assert!(body.len() >= 450, "fixture should be about 500 bytes");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(body))
        .mount(&server)
        .await;

    let test = build_pipeline(&test_config(), Fixture::default());
    let id = test.pipeline.enroll(&server.uri()).unwrap();

    let summary = test
        .pipeline
        .run_batch(&CandidateSelector::default(), 1)
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.passing, 0);
    assert_eq!(summary.failed, 0);

    let opp = test.pipeline.with_store(|s| s.get_opportunity(id)).unwrap();
    assert_eq!(opp.status, OpportunityStatus::Rejected);
    assert!(!opp.is_premium);
    assert_eq!(opp.validation_data["failReason"], "no contact method");
    assert_eq!(opp.validation_data["tiersCompleted"], 1);
    assert_eq!(opp.validation_data["statusCode"], 200);

    // Tier 3 never ran
    assert_eq!(test.metrics_calls(), 0);
    assert_eq!(opp.domain_authority, None);
}

#[tokio::test]
async fn test_strong_site_with_mailto_becomes_premium() {
    let server = MockServer::start().await;
    let body = html_page(
        "Acme Growth",
        &format!(
            "<h1>Acme growth marketing</h1>\
             <p>We write about SEO, content strategy and analytics for growth teams. {}</p>\
             <a href=\"mailto:info@acme.test\">Email us</a>",
            LOREM
        ),
    );
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(body))
        .mount(&server)
        .await;

    let fixture = Fixture {
        whois: Lookup::Found(registration_record(3 * 365 + 30)),
        traffic: Lookup::Found(5000),
        metrics: Lookup::Found(DomainMetrics {
            domain_authority: 55.0,
            page_authority: Some(40.0),
            spam_score: 1.0,
        }),
        ..Fixture::default()
    };
    let test = build_pipeline(&test_config(), fixture);
    let id = test.pipeline.enroll(&server.uri()).unwrap();

    let summary = test
        .pipeline
        .run_batch(&CandidateSelector::default(), 2)
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.passing, 1);
    assert_eq!(summary.premium, 1);

    let opp = test.pipeline.with_store(|s| s.get_opportunity(id)).unwrap();
    assert_eq!(opp.status, OpportunityStatus::Premium);
    assert!(opp.is_premium);
    assert_eq!(opp.domain_authority, Some(55.0));
    assert_eq!(opp.spam_score, Some(1.0));
    assert_eq!(opp.validation_data["tiersCompleted"], 3);
    assert_eq!(opp.validation_data["metricsSource"], "provider");
    assert_eq!(opp.validation_data["estimatedTraffic"], 5000);
    assert!(opp.validation_data["relevanceScore"].as_u64().unwrap() >= 80);
    assert!(opp.validation_data["domainAge"].as_f64().unwrap() >= 3.0);

    let contacts = opp.contact_info.unwrap();
    assert_eq!(contacts.emails, vec!["info@acme.test"]);
    assert_eq!(contacts.extraction_details.source, "homepage");
    assert_eq!(contacts.extraction_details.confidence, Confidence::Verified);
    assert_eq!(test.metrics_calls(), 1);

    let run = test
        .pipeline
        .with_store(|s| s.recent_runs(1))
        .unwrap()
        .remove(0);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!((run.processed, run.passing, run.premium), (1, 1, 1));
}

#[tokio::test]
async fn test_outage_falls_back_to_registration_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.fetcher.max_retries = 0;
    config.discovery.paths = [
        "/contact",
        "/contact-us",
        "/about",
        "/about-us",
        "/team",
        "/write-for-us",
        "/advertise",
        "/impressum",
        "/get-in-touch",
        "/support",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let fixture = Fixture {
        whois: Lookup::Found(
            "Registrant Email: admin@site.test\nAdmin Email: contact@privacyprotect.org\n"
                .to_string(),
        ),
        mx: Lookup::Found(true),
        ..Fixture::default()
    };
    let test = build_pipeline(&config, fixture);
    let id = test.pipeline.enroll(&server.uri()).unwrap();

    let record = test.pipeline.extract_contacts(id).await.unwrap();
    assert_eq!(record.emails, vec!["admin@site.test"]);
    assert_eq!(record.extraction_details.source, "registration_record");
    assert!(record.extraction_details.generated_emails.is_empty());

    // Homepage plus all ten candidates were tried
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 11);

    let stored = test.pipeline.with_store(|s| s.get_opportunity(id)).unwrap();
    assert_eq!(stored.contact_info.unwrap(), record);
}

#[tokio::test]
async fn test_unresolvable_domain_is_rejected_without_requests() {
    let server = MockServer::start().await;
    let fixture = Fixture {
        resolves: Lookup::Found(false),
        ..Fixture::default()
    };
    let test = build_pipeline(&test_config(), fixture);
    let id = test.pipeline.enroll(&server.uri()).unwrap();

    test.pipeline
        .run_batch(&CandidateSelector::default(), 1)
        .await
        .unwrap();

    let opp = test.pipeline.with_store(|s| s.get_opportunity(id)).unwrap();
    assert_eq!(opp.status, OpportunityStatus::Rejected);
    assert_eq!(opp.validation_data["failReason"], "domain does not resolve");
    assert!(server.received_requests().await.unwrap().is_empty());
    assert_eq!(test.metrics_calls(), 0);
}

#[tokio::test]
async fn test_transient_outage_is_inconclusive() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let test = build_pipeline(&test_config(), Fixture::default());
    let id = test.pipeline.enroll(&server.uri()).unwrap();

    let summary = test
        .pipeline
        .run_batch(&CandidateSelector::default(), 1)
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);

    let opp = test.pipeline.with_store(|s| s.get_opportunity(id)).unwrap();
    assert_eq!(opp.status, OpportunityStatus::Discovered);
    assert_eq!(opp.validation_data["inconclusive"], true);
    assert!(opp.validation_data["failReason"].is_string());
    assert_eq!(test.metrics_calls(), 0);

    // Nothing in the batch succeeded, so the run itself is marked failed
    let run = test
        .pipeline
        .with_store(|s| s.recent_runs(1))
        .unwrap()
        .remove(0);
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!((run.processed, run.failed), (1, 1));
}

#[tokio::test]
async fn test_error_status_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let test = build_pipeline(&test_config(), Fixture::default());
    let id = test.pipeline.enroll(&server.uri()).unwrap();
    test.pipeline
        .run_batch(&CandidateSelector::default(), 1)
        .await
        .unwrap();

    let opp = test.pipeline.with_store(|s| s.get_opportunity(id)).unwrap();
    assert_eq!(opp.status, OpportunityStatus::Rejected);
    assert_eq!(opp.validation_data["failReason"], "homepage returned HTTP 404");
}
