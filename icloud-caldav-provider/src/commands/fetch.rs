//! Fetch raw ICS for ids returned by search.
//!
//! Ids that are malformed, name an unknown calendar, or match no event are
//! skipped rather than reported.

use anyhow::Result;
use icloud_caldav_core::constants::CALENDAR_MIME_TYPE;
use icloud_caldav_core::protocol::Fetch;
use icloud_caldav_core::{FetchedDocument, ServerConfig, TimeWindow};
use tracing::debug;

use crate::backend::CalDavBackend;
use crate::commands::find_event;

pub async fn handle(
    config: &ServerConfig,
    backend: &dyn CalDavBackend,
    cmd: Fetch,
) -> Result<Vec<FetchedDocument>> {
    if cmd.ids.is_empty() {
        return Ok(Vec::new());
    }

    let calendars = backend.list_calendars().await?;
    let window = TimeWindow::around_now(config.scan_days)?;

    let mut documents = Vec::new();
    for id in &cmd.ids {
        let Some((calendar_url, uid)) = id.split_once('|') else {
            debug!(%id, "skipping malformed id");
            continue;
        };
        let Some(calendar) = calendars.iter().find(|c| c.url == calendar_url) else {
            debug!(%id, "skipping id for unknown calendar");
            continue;
        };

        let found = find_event(backend, calendar, &window, |event_uid| event_uid.trim() == uid).await?;
        if let Some((object, _)) = found {
            documents.push(FetchedDocument {
                id: id.clone(),
                mime_type: CALENDAR_MIME_TYPE.to_string(),
                content: object.data,
            });
        }
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::search;
    use crate::commands::test_support::*;
    use chrono::Utc;
    use icloud_caldav_core::protocol::Search;

    fn fetch(ids: &[&str]) -> Fetch {
        Fetch {
            ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn seeded() -> (crate::memory::MemoryBackend, String) {
        let backend = backend();
        let day = Utc::now().format("%Y%m%d");
        let data = vevent("abc", "Planning", &format!("{day}T090000"), &format!("{day}T100000"));
        backend.insert_object(WORK_URL, "abc", &data).unwrap();
        (backend, data)
    }

    #[tokio::test]
    async fn test_fetches_search_hits() {
        let (backend, data) = seeded();
        let hits = search::handle(
            &config(),
            &backend,
            Search {
                query: Some("planning".into()),
            },
        )
        .await
        .unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();

        let docs = handle(&config(), &backend, fetch(&ids)).await.unwrap();
        assert_eq!(
            docs,
            vec![FetchedDocument {
                id: format!("{WORK_URL}|abc"),
                mime_type: "text/calendar".into(),
                content: data,
            }]
        );
    }

    #[tokio::test]
    async fn test_bad_ids_are_skipped() {
        let (backend, _) = seeded();
        let unknown_cal = "https://p01-caldav.icloud.com/123/calendars/nope/|abc".to_string();
        let unknown_uid = format!("{WORK_URL}|zzz");
        let good = format!("{WORK_URL}|abc");

        let docs = handle(
            &config(),
            &backend,
            fetch(&["no-separator", unknown_cal.as_str(), unknown_uid.as_str(), good.as_str()]),
        )
        .await
        .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, good);
    }

    #[tokio::test]
    async fn test_empty_ids_make_no_remote_call() {
        let (backend, _) = seeded();
        assert!(handle(&config(), &backend, fetch(&[])).await.unwrap().is_empty());
        assert_eq!(backend.remote_calls(), 0);
    }
}
