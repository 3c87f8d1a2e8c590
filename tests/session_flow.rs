//! End-to-end flows through a full session: store → render → refresh →
//! merge, plus search, local reorder and submission sync.

mod support;

use std::sync::Arc;
use std::time::Duration;

use livefilter::page::{FacetDecl, Placeholder};
use livefilter::sched::lock;
use livefilter::search::SearchPhase;
use livefilter::state::DateField;
use livefilter::{Config, FilterSession};
use support::{options, page_decl, strings, Reply, ScriptedTransport};

fn session_with(transport: &Arc<ScriptedTransport>) -> FilterSession {
    FilterSession::init(&page_decl(), Config::default(), transport.clone()).unwrap()
}

async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_selections_yields_one_refresh() {
    let transport = Arc::new(ScriptedTransport::default());
    let session = session_with(&transport);
    let store = session.store();

    for value in ["Accra", "Kumasi", "Tamale", "Ho", "Wa"] {
        store.handle_checkbox_change("loc", value, true);
        settle(20).await;
    }
    store.handle_checkbox_change("loc", "Ho", false);

    settle(300).await;
    assert_eq!(transport.options_calls(), 0);

    settle(100).await;
    assert_eq!(transport.options_calls(), 1);
    let req = transport.last_options();
    assert_eq!(req.selections["loc"], strings(&["Accra", "Kumasi", "Tamale", "Wa"]));
    assert_eq!(req.facets, strings(&["loc", "res_mapped"]));
}

#[tokio::test(start_paused = true)]
async fn test_toggle_twice_refreshes_once_with_final_state() {
    let transport = Arc::new(ScriptedTransport::default());
    let session = session_with(&transport);

    session.store().handle_checkbox_change("res_mapped", "Residential", true);
    session.store().handle_checkbox_change("res_mapped", "Residential", false);
    settle(1000).await;

    assert_eq!(transport.options_calls(), 1);
    assert!(transport.last_options().selections.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_merges_with_current_selection() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.push_options(Reply::ok(options(&[
        ("loc", &["Kumasi", "Tamale"]),
        ("res_mapped", &["Commercial"]),
    ])));
    let session = session_with(&transport);

    session.store().handle_checkbox_change("loc", "Accra", true);
    {
        let view = lock(session.view());
        assert_eq!(view.page.list("loc").unwrap().values(), vec!["Accra"]);
    }

    settle(400).await;
    let view = lock(session.view());
    let loc = view.page.list("loc").unwrap();
    assert_eq!(loc.values(), vec!["Accra", "Kumasi", "Tamale"]);
    assert_eq!(loc.checked_values(), vec!["Accra"]);
    assert_eq!(view.page.list("res_mapped").unwrap().values(), vec!["Commercial"]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_keeps_previous_lists() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.push_options(Reply::ok(options(&[("loc", &["Accra", "Kumasi"])])));
    transport.push_options(Reply::fail("status 502"));
    let session = session_with(&transport);

    session.start();
    settle(10).await;
    session.store().handle_checkbox_change("res_mapped", "Residential", true);
    settle(400).await;

    assert_eq!(transport.options_calls(), 2);
    let view = lock(session.view());
    assert_eq!(view.page.list("loc").unwrap().values(), vec!["Accra", "Kumasi"]);
}

#[tokio::test(start_paused = true)]
async fn test_search_keeps_selected_meter_missing_from_results() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.push_search(Reply::ok(strings(&["M1", "M2"])));
    let session = session_with(&transport);
    let search = session.search().unwrap();

    session.store().handle_checkbox_change("meterid", "M100", true);
    search.on_input("M");
    settle(300).await;

    let view = lock(session.view());
    let list = view.page.list("meterid").unwrap();
    assert_eq!(list.values(), vec!["M100", "M1", "M2"]);
    assert_eq!(list.checked_values(), vec!["M100"]);
    assert_eq!(search.phase(), SearchPhase::Rendered);
}

#[tokio::test(start_paused = true)]
async fn test_search_reacts_to_filters_not_own_selection() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.push_search(Reply::ok(strings(&["M1"])));
    let session = session_with(&transport);
    let search = session.search().unwrap();

    search.on_input("M1");
    settle(300).await;
    assert_eq!(transport.search_calls(), 1);

    session.store().handle_checkbox_change("meterid", "M1", true);
    settle(1).await;
    assert_eq!(transport.search_calls(), 1);

    session.store().handle_checkbox_change("loc", "Accra", true);
    settle(1).await;
    assert_eq!(transport.search_calls(), 2);
    let req = transport.last_search();
    assert_eq!(req.q, "M1");
    assert_eq!(req.selections["loc"], strings(&["Accra"]));
    assert!(!req.selections.contains_key("meterid"));

    session.store().handle_date_change(DateField::End, "2024-06-30");
    settle(201).await;
    assert_eq!(transport.search_calls(), 3);
    assert_eq!(transport.last_search().end_date, "2024-06-30");
}

#[tokio::test(start_paused = true)]
async fn test_search_placeholders() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.push_search(Reply::after(100, Vec::new()));
    transport.push_search(Reply::fail("status 500"));
    let session = session_with(&transport);
    let search = session.search().unwrap();
    let placeholder = || lock(session.view()).page.list("meterid").unwrap().placeholder();

    search.spawn_search();
    settle(10).await;
    assert_eq!(placeholder(), Some(Placeholder::Loading));
    assert_eq!(search.phase(), SearchPhase::Loading);

    settle(100).await;
    assert_eq!(placeholder(), Some(Placeholder::NoOptions));

    search.spawn_search();
    settle(10).await;
    assert_eq!(placeholder(), Some(Placeholder::Unavailable));
    assert_eq!(search.phase(), SearchPhase::Error);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_search_times_out_to_error() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.push_search(Reply::hang());
    let cfg = Config {
        request_timeout_ms: 1_000,
        ..Default::default()
    };
    let session = FilterSession::init(&page_decl(), cfg, transport.clone()).unwrap();
    let search = session.search().unwrap();

    search.spawn_search();
    settle(999).await;
    assert_eq!(search.phase(), SearchPhase::Loading);
    settle(10).await;
    assert_eq!(search.phase(), SearchPhase::Error);
}

#[tokio::test(start_paused = true)]
async fn test_local_reorder_pins_checked() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.push_options(Reply::ok(options(&[("loc", &["Accra", "Kumasi", "Koforidua"])])));
    let session = session_with(&transport);
    session.start();
    settle(10).await;

    session.store().handle_checkbox_change("loc", "Kumasi", true);
    let order = session.reorder("loc").unwrap().on_input("ko");
    assert_eq!(order, strings(&["Kumasi", "Koforidua", "Accra"]));
    assert!(session.reorder("meterid").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_submission_uses_store_not_mounted_nodes() {
    let transport = Arc::new(ScriptedTransport::default());
    let session = session_with(&transport);
    session.store().handle_checkbox_change("loc", "Accra", true);
    session.store().handle_checkbox_change("loc", "Kumasi", true);
    lock(session.view()).page.list_mut("loc").clear();
    session.store().handle_date_change(DateField::Start, "2024-01-01");

    let submission = session.submit();
    assert_eq!(submission.values("loc"), vec!["Accra", "Kumasi"]);
    assert_eq!(submission.values("start_date"), vec!["2024-01-01"]);
    assert_eq!(
        submission.query_string(),
        "start_date=2024-01-01&end_date=&loc=Accra&loc=Kumasi"
    );
    let view = lock(session.view());
    assert_eq!(view.page.hidden_fields().len(), 2);
    assert_eq!(view.page.date_input(DateField::Start).value, "2024-01-01");
}

#[tokio::test(start_paused = true)]
async fn test_init_seeds_from_declaration_and_query() {
    let transport = Arc::new(ScriptedTransport::default());
    let mut decl = page_decl();
    decl.facets[0].selected = Some(r#"["Accra"]"#.to_string());
    decl.facets[1].selected = Some("not json".to_string());
    decl.facets.push(FacetDecl {
        name: "loc".to_string(),
        selected: Some(r#"["FromDuplicate"]"#.to_string()),
        dynamic: true,
    });
    decl.query = "end_date=2024-12-31&MeterID=M9&loc=Ho".to_string();

    let session = FilterSession::init(&decl, Config::default(), transport.clone()).unwrap();
    let snap = session.store().snapshot();
    assert_eq!(snap.selected("loc"), strings(&["Accra", "Ho"]));
    assert!(snap.selected("res_mapped").is_empty());
    assert_eq!(snap.selected("meterid"), strings(&["M9"]));
    assert_eq!(snap.end_date, "2024-12-31");
    assert_eq!(session.fetcher().facets(), strings(&["loc", "res_mapped"]).as_slice());

    let view = lock(session.view());
    assert_eq!(view.page.list("loc").unwrap().checked_values(), vec!["Accra", "Ho"]);
    assert_eq!(view.page.date_input(DateField::End).value, "2024-12-31");
    assert!(!view.registry.is_dynamic("loc"));
}

#[tokio::test(start_paused = true)]
async fn test_undeclared_facet_never_reaches_requests_or_form() {
    let transport = Arc::new(ScriptedTransport::default());
    let session = session_with(&transport);

    assert!(!session.store().handle_checkbox_change("bogus", "x", true));
    settle(1000).await;
    assert_eq!(transport.options_calls(), 0);
    assert_eq!(transport.search_calls(), 0);

    session.store().handle_checkbox_change("loc", "Accra", true);
    settle(400).await;
    assert!(!transport.last_options().selections.contains_key("bogus"));

    let submission = session.submit();
    assert!(submission.values("bogus").is_empty());
    let view = lock(session.view());
    assert!(view.page.list("bogus").is_none());
    assert!(view.page.hidden_fields().iter().all(|h| h.name != "bogus"));
}

#[tokio::test(start_paused = true)]
async fn test_dynamic_flag_without_controller_renders_generically() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.push_options(Reply::ok(options(&[("res_mapped", &["Commercial", "Residential"])])));
    let mut decl = page_decl();
    decl.facets[1].dynamic = true;
    let session = FilterSession::init(&decl, Config::default(), transport.clone()).unwrap();

    assert_eq!(session.fetcher().facets(), strings(&["loc", "res_mapped"]).as_slice());
    session.start();
    settle(10).await;

    let view = lock(session.view());
    assert!(!view.registry.is_dynamic("res_mapped"));
    assert_eq!(
        view.page.list("res_mapped").unwrap().values(),
        vec!["Commercial", "Residential"]
    );
}

#[tokio::test]
async fn test_init_rejects_empty_page() {
    let transport = Arc::new(ScriptedTransport::default());
    let mut decl = page_decl();
    decl.facets.clear();
    assert!(FilterSession::init(&decl, Config::default(), transport).is_err());
}
