//! Calendar cache tests: how many postbacks each lookup costs.

mod common;

use canteen_client::{CalendarCache, CanteenError, YearMonth};
use chrono::NaiveDate;
use common::{calendar_page, client, form_fields, form_value, html, SELECT_PATH};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Initial page: 2015-09 selected, years 2015 and 2016 offered.
async fn mount_initial(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(SELECT_PATH))
        .respond_with(html(calendar_page(
            &[2015, 2016],
            2015,
            9,
            &["2015-09-29", "2015-09-30"],
            "init",
        )))
        .expect(1)
        .mount(server)
        .await;
}

async fn posts(server: &MockServer) -> Vec<Vec<(String, String)>> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .map(|r| form_fields(&r.body))
        .collect()
}

#[tokio::test]
async fn selected_month_needs_no_postback() {
    let server = MockServer::start().await;
    mount_initial(&server).await;

    let mut client = client(&server);
    let dates = client.list_orderable_dates(2015, 9).await.unwrap();
    assert_eq!(dates, vec![date("2015-09-29"), date("2015-09-30")]);
    assert!(posts(&server).await.is_empty());
}

#[tokio::test]
async fn other_month_is_fetched_once() {
    let server = MockServer::start().await;
    mount_initial(&server).await;
    Mock::given(method("POST"))
        .and(path(SELECT_PATH))
        .and(body_string_contains("__EVENTTARGET=DrplstMonth1"))
        .respond_with(html(calendar_page(
            &[2015, 2016],
            2015,
            10,
            &["2015-10-08", "2015-10-09"],
            "oct",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client(&server);
    let first = client.list_orderable_dates(2015, 10).await.unwrap();
    let second = client.list_orderable_dates(2015, 10).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, vec![date("2015-10-08"), date("2015-10-09")]);
    assert!(client.calendar().is_cached(YearMonth::new(2015, 10)));

    let posts = posts(&server).await;
    assert_eq!(posts.len(), 1);
    assert_eq!(form_value(&posts[0], "__VIEWSTATE"), Some("VS-init"));
    assert_eq!(form_value(&posts[0], "__EVENTVALIDATION"), Some("EV-init"));
    assert_eq!(form_value(&posts[0], "DrplstYear1$DrplstControl"), Some("2015"));
    assert_eq!(form_value(&posts[0], "DrplstMonth1$DrplstControl"), Some("10"));
}

#[tokio::test]
async fn unselectable_year_is_not_orderable_without_postback() {
    let server = MockServer::start().await;
    mount_initial(&server).await;

    let mut client = client(&server);
    assert!(!client.is_orderable(date("2014-12-01")).await.unwrap());
    assert!(client.list_orderable_dates(2030, 1).await.unwrap().is_empty());
    assert!(posts(&server).await.is_empty());
}

#[tokio::test]
async fn year_switch_posts_year_then_month() {
    let server = MockServer::start().await;
    mount_initial(&server).await;
    // After the year postback the month dropdown still shows September.
    Mock::given(method("POST"))
        .and(path(SELECT_PATH))
        .and(body_string_contains("__EVENTTARGET=DrplstYear1"))
        .respond_with(html(calendar_page(
            &[2015, 2016],
            2016,
            9,
            &["2016-09-01"],
            "year",
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SELECT_PATH))
        .and(body_string_contains("__EVENTTARGET=DrplstMonth1"))
        .respond_with(html(calendar_page(
            &[2015, 2016],
            2016,
            1,
            &["2016-01-04"],
            "month",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client(&server);
    assert!(client.is_orderable(date("2016-01-04")).await.unwrap());
    assert!(!client.is_orderable(date("2016-01-05")).await.unwrap());

    let posts = posts(&server).await;
    assert_eq!(posts.len(), 2);
    assert_eq!(form_value(&posts[0], "__EVENTTARGET"), Some("DrplstYear1$DrplstControl"));
    assert_eq!(form_value(&posts[0], "__VIEWSTATE"), Some("VS-init"));
    assert_eq!(form_value(&posts[1], "__EVENTTARGET"), Some("DrplstMonth1$DrplstControl"));
    assert_eq!(form_value(&posts[1], "__VIEWSTATE"), Some("VS-year"));
    assert_eq!(form_value(&posts[1], "DrplstYear1$DrplstControl"), Some("2016"));
    assert_eq!(form_value(&posts[1], "DrplstMonth1$DrplstControl"), Some("1"));

    // Dates shown by the intermediate year response are not cached.
    assert!(!client.calendar().is_cached(YearMonth::new(2016, 9)));
    assert_eq!(client.calendar().selected(), Some(YearMonth::new(2016, 1)));
}

#[tokio::test]
async fn portal_ignoring_month_switch_is_parse_error() {
    let server = MockServer::start().await;
    mount_initial(&server).await;
    Mock::given(method("POST"))
        .and(path(SELECT_PATH))
        .respond_with(html(calendar_page(
            &[2015, 2016],
            2015,
            9,
            &["2015-09-29"],
            "stuck",
        )))
        .mount(&server)
        .await;

    let mut client = client(&server);
    let err = client.list_orderable_dates(2015, 11).await.unwrap_err();
    assert!(matches!(err, CanteenError::Parse { .. }), "got: {err:?}");
    assert!(!client.calendar().is_cached(YearMonth::new(2015, 11)));
}

#[tokio::test]
async fn calendar_redirected_to_login_is_session_expired() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SELECT_PATH))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/cas/login", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cas/login"))
        .respond_with(html("<html>login</html>"))
        .mount(&server)
        .await;

    let mut client = client(&server);
    assert!(matches!(
        client.list_orderable_dates(2015, 9).await.unwrap_err(),
        CanteenError::SessionExpired { .. }
    ));
    assert!(!client.calendar().is_loaded());
}

#[tokio::test]
async fn month_out_of_range_has_no_dates_and_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SELECT_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mut client = client(&server);
    assert!(client.list_orderable_dates(2015, 13).await.unwrap().is_empty());
    assert!(client.list_orderable_dates(2015, 0).await.unwrap().is_empty());

    let mut cache = CalendarCache::new();
    let dates = cache.dates(client.session(), YearMonth::new(2015, 13)).await.unwrap();
    assert!(dates.is_empty());
    assert!(!cache.is_loaded());
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(!client.calendar().is_loaded());
}

#[tokio::test]
async fn unselectable_year_stays_false_once_months_are_cached() {
    let server = MockServer::start().await;
    mount_initial(&server).await;
    Mock::given(method("POST"))
        .and(path(SELECT_PATH))
        .and(body_string_contains("__EVENTTARGET=DrplstMonth1"))
        .respond_with(html(calendar_page(
            &[2015, 2016],
            2015,
            10,
            &["2015-10-08"],
            "oct",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client(&server);
    assert!(client.is_orderable(date("2015-10-08")).await.unwrap());
    assert!(client.calendar().is_cached(YearMonth::new(2015, 9)));
    assert!(client.calendar().is_cached(YearMonth::new(2015, 10)));

    assert!(!client.is_orderable(date("2014-10-08")).await.unwrap());
    assert!(!client.is_orderable(date("2017-09-29")).await.unwrap());
    assert_eq!(posts(&server).await.len(), 1);
    assert_eq!(client.calendar().selected(), Some(YearMonth::new(2015, 10)));
}
