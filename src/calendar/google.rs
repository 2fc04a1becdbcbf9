//! Google Calendar API client

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::auth::AccessToken;
use super::{CalendarSource, DayWindow};
use crate::{Error, Result};

/// Calendar resource (only the fields the briefing uses)
#[derive(Debug, Deserialize)]
struct CalendarResource {
    #[serde(default)]
    summary: String,
}

/// One page of an events listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<Value>,
    next_page_token: Option<String>,
}

/// Reads calendar metadata and events
pub struct GoogleCalendarClient {
    client: Client,
    base_url: String,
    auth: Arc<dyn AccessToken>,
}

impl GoogleCalendarClient {
    /// Create a new client
    ///
    /// # Arguments
    ///
    /// * `base_url` - API base (e.g. <https://www.googleapis.com/calendar/v3>)
    /// * `auth` - Bearer token source
    #[must_use]
    pub fn new(base_url: impl Into<String>, auth: Arc<dyn AccessToken>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    fn calendar_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let token = self.auth.access_token().await?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Calendar(format!("calendar API error {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Calendar(format!("malformed calendar response: {e}")))
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarClient {
    async fn summary(&self, calendar_id: &str) -> Result<String> {
        let calendar: CalendarResource = self.get_json(&self.calendar_url(calendar_id), &[]).await?;
        Ok(calendar.summary)
    }

    async fn events(&self, calendar_id: &str, window: &DayWindow) -> Result<Vec<Value>> {
        let url = format!("{}/events", self.calendar_url(calendar_id));
        let time_min = window.time_min();
        let time_max = window.time_max();

        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("showDeleted", "false"),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: EventsPage = self.get_json(&url, &query).await?;
            items.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(items)
    }
}
