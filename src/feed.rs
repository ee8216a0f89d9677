//! Downloads the calendar feed.

use crate::error::{Error, Result};
use reqwest::StatusCode;

/// GET `url` and return the body. Anything but `200 OK` is a fetch error.
pub async fn fetch_feed(http: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    tracing::info!(url, "Fetching calendar feed");

    let response = http.get(url).send().await?;
    let status = response.status();

    if status != StatusCode::OK {
        return Err(Error::Fetch {
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await?;
    tracing::debug!(bytes = body.len(), "Feed downloaded");

    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_body_on_200() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/cal.ics")
            .with_status(200)
            .with_header("content-type", "text/calendar")
            .with_body("BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n")
            .create_async()
            .await;

        let body = fetch_feed(&reqwest::Client::new(), &format!("{}/cal.ics", server.url()))
            .await
            .unwrap();

        assert_eq!(body, b"BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n");
    }

    #[tokio::test]
    async fn test_404_is_fetch_error_with_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.ics")
            .with_status(404)
            .create_async()
            .await;

        let err = fetch_feed(
            &reqwest::Client::new(),
            &format!("{}/missing.ics", server.url()),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Fetch { status: 404 }));
    }

    #[tokio::test]
    async fn test_other_success_codes_are_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/cal.ics")
            .with_status(204)
            .create_async()
            .await;

        let err = fetch_feed(&reqwest::Client::new(), &format!("{}/cal.ics", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Fetch { status: 204 }));
    }
}
