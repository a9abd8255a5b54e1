//! Pipeline properties: pacing under concurrency and idempotent re-runs

use crate::common::{build_pipeline, html_page, test_config, Fixture};
use outreach_enrich::lookup::Lookup;
use outreach_enrich::pipeline::CandidateSelector;
use outreach_enrich::store::{OpportunityStatus, OpportunityStore};
use outreach_enrich::validator::DomainMetrics;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Serves a fixed page and records when each request arrived
struct ArrivalRecorder {
    arrivals: Arc<Mutex<Vec<Instant>>>,
    body: String,
}

impl Respond for ArrivalRecorder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        ResponseTemplate::new(200).set_body_raw(self.body.clone(), "text/html")
    }
}

fn contact_page() -> String {
    html_page(
        "Shared",
        "<p>Growth marketing notes on SEO, content and analytics, written every week for \
         small teams who would rather ship than read another newsletter about it.</p>\
         <a href=\"mailto:hello@shared.test\">hello@shared.test</a>",
    )
}

fn provider_metrics() -> Lookup<DomainMetrics> {
    Lookup::Found(DomainMetrics {
        domain_authority: 30.0,
        page_authority: None,
        spam_score: 2.0,
    })
}

#[tokio::test]
async fn test_concurrent_opportunities_on_one_domain_are_spaced() {
    let server = MockServer::start().await;
    let arrivals = Arc::new(Mutex::new(Vec::new()));
    Mock::given(any())
        .respond_with(ArrivalRecorder {
            arrivals: Arc::clone(&arrivals),
            body: contact_page(),
        })
        .mount(&server)
        .await;

    let mut config = test_config();
    config.throttle.min_interval_ms = 200;
    config.discovery.paths = vec!["/contact".to_string()];

    let fixture = Fixture {
        metrics: provider_metrics(),
        ..Fixture::default()
    };
    let test = build_pipeline(&config, fixture);
    test.pipeline
        .enroll(&format!("{}/a", server.uri()))
        .unwrap();
    test.pipeline
        .enroll(&format!("{}/b", server.uri()))
        .unwrap();

    let summary = test
        .pipeline
        .run_batch(&CandidateSelector::default(), 2)
        .await
        .unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);

    let mut times = arrivals.lock().unwrap().clone();
    times.sort();
    assert!(times.len() >= 4, "expected HEAD and GET per opportunity, got {}", times.len());

    // Arrival can lag the throttled start by a few milliseconds
    let floor = Duration::from_millis(150);
    for pair in times.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(gap >= floor, "requests to one domain only {:?} apart", gap);
    }
}

#[tokio::test]
async fn test_rerunning_extraction_is_a_no_op() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(contact_page(), "text/html"))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.discovery.paths = vec!["/contact".to_string()];

    let fixture = Fixture {
        metrics: provider_metrics(),
        ..Fixture::default()
    };
    let test = build_pipeline(&config, fixture);
    let id = test.pipeline.enroll(&server.uri()).unwrap();

    let first = test.pipeline.extract_contacts(id).await.unwrap();
    assert_eq!(first.emails, vec!["hello@shared.test"]);
    let requests_after_first = server.received_requests().await.unwrap().len();
    let stored_first = test.pipeline.with_store(|s| s.get_opportunity(id)).unwrap();

    let second = test.pipeline.extract_contacts(id).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(
        second.extraction_details.last_updated,
        first.extraction_details.last_updated
    );
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_after_first
    );

    // No write happened either
    let stored_second = test.pipeline.with_store(|s| s.get_opportunity(id)).unwrap();
    assert_eq!(stored_second.updated_at, stored_first.updated_at);
}

#[tokio::test]
async fn test_enroll_is_idempotent_and_normalizes() {
    let test = build_pipeline(&test_config(), Fixture::default());

    let a = test
        .pipeline
        .enroll("https://Shared.test/?utm_source=newsletter")
        .unwrap();
    let b = test.pipeline.enroll("https://shared.test/").unwrap();
    assert_eq!(a, b);

    let opp = test.pipeline.with_store(|s| s.get_opportunity(a)).unwrap();
    assert_eq!(opp.domain, "shared.test");
    assert_eq!(opp.status, OpportunityStatus::Discovered);
    assert!(opp.contact_info.is_some());

    let found = test
        .pipeline
        .with_store(|s| s.find_by_url("https://shared.test/"))
        .unwrap()
        .map(|o| o.id);
    assert_eq!(found, Some(a));

    assert!(test.pipeline.enroll("ftp://shared.test/").is_err());
    assert_eq!(test.pipeline.with_store(|s| s.count_total()).unwrap(), 1);
}

#[tokio::test]
async fn test_second_batch_skips_processed_opportunities() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(contact_page(), "text/html"))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.discovery.paths = Vec::new();
    let fixture = Fixture {
        metrics: provider_metrics(),
        ..Fixture::default()
    };
    let test = build_pipeline(&config, fixture);
    let id = test.pipeline.enroll(&server.uri()).unwrap();

    let first = test
        .pipeline
        .run_batch(&CandidateSelector::default(), 1)
        .await
        .unwrap();
    assert_eq!(first.processed, 1);
    assert_eq!(first.passing, 1);
    assert_eq!(first.premium, 0);

    let opp = test.pipeline.with_store(|s| s.get_opportunity(id)).unwrap();
    assert_eq!(opp.status, OpportunityStatus::Validated);
    assert_eq!(opp.contact_info.unwrap().emails, vec!["hello@shared.test"]);

    let second = test
        .pipeline
        .run_batch(&CandidateSelector::default(), 1)
        .await
        .unwrap();
    assert_eq!(second.processed, 0);

    let runs = test.pipeline.with_store(|s| s.recent_runs(10)).unwrap();
    assert_eq!(runs.len(), 2);
}
