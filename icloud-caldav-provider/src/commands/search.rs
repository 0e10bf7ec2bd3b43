//! Read-only search over SUMMARY and DESCRIPTION.
//!
//! Every calendar is scanned, one at a time, over ±`SCAN_DAYS` with
//! recurrence expansion, so each occurrence can be its own hit. Series the
//! server returns unexpanded are expanded locally into the same window.

use anyhow::Result;
use icloud_caldav_core::constants::{SEARCH_RESULT_LIMIT, SEARCH_TITLE_MAX_CHARS};
use icloud_caldav_core::ics::{expand_occurrences, first_event};
use icloud_caldav_core::protocol::Search;
use icloud_caldav_core::{SearchHit, ServerConfig, TimeWindow};
use tracing::{debug, warn};

use crate::backend::CalDavBackend;

pub async fn handle(
    config: &ServerConfig,
    backend: &dyn CalDavBackend,
    cmd: Search,
) -> Result<Vec<SearchHit>> {
    let query = cmd.query.unwrap_or_default().trim().to_lowercase();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let window = TimeWindow::around_now(config.scan_days)?;
    let calendars = backend.list_calendars().await?;

    let mut hits = Vec::new();
    for calendar in &calendars {
        let objects = backend.query_objects(calendar, &window, true).await?;

        for object in &objects {
            for piece in expand_occurrences(&object.data, &window) {
                let Some(event) = first_event(&piece) else {
                    warn!(href = %object.href, "skipping unparseable calendar object");
                    continue;
                };

                let summary = event.summary.unwrap_or_default();
                let description = event.description.unwrap_or_default();
                let haystack = format!("{}\n{}", summary, description).to_lowercase();
                if !haystack.contains(&query) {
                    continue;
                }

                let uid = event.uid.as_deref().unwrap_or_default().trim();
                let when = event.start.map(|t| t.to_iso()).unwrap_or_default();
                hits.push(SearchHit {
                    id: format!("{}|{}", calendar.url, uid),
                    title: summary.chars().take(SEARCH_TITLE_MAX_CHARS).collect(),
                    snippet: format!("{} — {}", when, calendar.label()),
                });
            }
        }
    }

    debug!(query = %query, hits = hits.len(), "search finished");
    hits.truncate(SEARCH_RESULT_LIMIT);
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use crate::memory::MemoryBackend;
    use chrono::{Duration, Utc};

    fn search(query: &str) -> Search {
        Search {
            query: Some(query.into()),
        }
    }

    fn today() -> String {
        Utc::now().format("%Y%m%d").to_string()
    }

    #[tokio::test]
    async fn test_blank_query_makes_no_remote_call() {
        let backend = backend();
        for query in ["", "   "] {
            assert!(handle(&config(), &backend, search(query)).await.unwrap().is_empty());
        }
        assert!(handle(&config(), &backend, Search { query: None }).await.unwrap().is_empty());
        assert_eq!(backend.remote_calls(), 0);
    }

    #[tokio::test]
    async fn test_matches_summary_or_description_case_insensitively() {
        let backend = backend();
        let day = today();
        let standup = vevent("s1", "Daily STANDUP", &format!("{day}T090000"), &format!("{day}T091500"));
        let review = vevent("r1", "Review", &format!("{day}T100000"), &format!("{day}T110000"))
            .replace("END:VEVENT", "DESCRIPTION:after the standup\r\nEND:VEVENT");
        let other = vevent("o1", "Lunch", &format!("{day}T120000"), &format!("{day}T130000"));
        backend.insert_object(WORK_URL, "s1", &standup).unwrap();
        backend.insert_object(HOME_URL, "r1", &review).unwrap();
        backend.insert_object(HOME_URL, "o1", &other).unwrap();

        let hits = handle(&config(), &backend, search("  StandUp ")).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, format!("{WORK_URL}|s1"));
        assert_eq!(hits[0].title, "Daily STANDUP");
        assert!(hits[0].snippet.ends_with(" — Work"));
        assert!(hits[0].snippet.starts_with(&Utc::now().format("%Y-%m-%d").to_string()));
        assert_eq!(hits[1].id, format!("{HOME_URL}|r1"));
    }

    #[tokio::test]
    async fn test_unnamed_calendar_snippet_uses_url() {
        let url = "https://cal.example.com/shared/";
        let backend = MemoryBackend::new().with_calendar(None, url);
        let day = today();
        let data = vevent("x", "Offsite", &format!("{day}T090000"), &format!("{day}T100000"));
        backend.insert_object(url, "x", &data).unwrap();

        let hits = handle(&config(), &backend, search("offsite")).await.unwrap();
        assert!(hits[0].snippet.ends_with(&format!(" — {url}")));
    }

    #[tokio::test]
    async fn test_titles_and_result_count_are_capped() {
        let backend = backend();
        let start = Utc::now() - Duration::days(1);
        let long_title = "x".repeat(300);
        for i in 0..205 {
            let at = (start + Duration::minutes(i)).format("%Y%m%dT%H%M%S").to_string();
            let data = vevent(&format!("e{i}"), &long_title, &at, &at);
            backend.insert_object(WORK_URL, &format!("e{i}"), &data).unwrap();
        }

        let hits = handle(&config(), &backend, search("xxx")).await.unwrap();
        assert_eq!(hits.len(), 200);
        assert!(hits.iter().all(|h| h.title.chars().count() == 200));
    }

    #[tokio::test]
    async fn test_each_occurrence_of_a_series_is_a_hit() {
        let backend = backend();
        let day = today();
        let data = vevent("w1", "Retro", &format!("{day}T090000"), &format!("{day}T100000"))
            .replace("END:VEVENT", "RRULE:FREQ=WEEKLY;COUNT=3\r\nEND:VEVENT");
        backend.insert_object(WORK_URL, "w1", &data).unwrap();

        let hits = handle(&config(), &backend, search("retro")).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.id == format!("{WORK_URL}|w1")));
        let week = (Utc::now() + Duration::weeks(1)).format("%Y-%m-%d").to_string();
        assert!(hits[1].snippet.starts_with(&week), "{}", hits[1].snippet);
    }

    #[tokio::test]
    async fn test_unrepresentable_scan_window_is_an_error() {
        let backend = backend();
        let mut config = config();
        config.scan_days = 1_000_000_000;

        let err = handle(&config, &backend, search("anything")).await.unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
        assert_eq!(backend.remote_calls(), 0);
    }
}
