//! Minimal W3C WebDriver client
//!
//! Speaks the JSON wire protocol to a driver server such as chromedriver.
//! Only the commands the site adapter needs are implemented.
//!
//! # Protocol
//!
//! - Every response is an object with a `value` member.
//! - Errors carry `value.error` (a W3C error code) and `value.message`,
//!   mapped through [`UiError::from_protocol`].
//! - Element references are objects keyed by [`ELEMENT_KEY`].

use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::utils::error::UiError;
use crate::utils::retry::{with_retry, RetryConfig};

use super::UiResult;

/// W3C web element identifier key
pub const ELEMENT_KEY: &str = "element-6066-11e4-a5aa-4e8c5d1b7bc7";

/// Poll interval for [`WebDriverClient::wait_for`]
const WAIT_POLL: Duration = Duration::from_millis(250);

/// Element lookup strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    fn using(&self) -> &'static str {
        match self {
            Self::Css(_) => "css selector",
            Self::XPath(_) => "xpath",
        }
    }

    fn value(&self) -> &str {
        match self {
            Self::Css(v) | Self::XPath(v) => v,
        }
    }

    fn to_json(&self) -> Value {
        json!({ "using": self.using(), "value": self.value() })
    }
}

/// Opaque reference to an element in the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(pub String);

impl ElementRef {
    fn from_value(value: &Value) -> UiResult<Self> {
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| Self(id.to_string()))
            .ok_or_else(|| UiError::Protocol {
                error: "invalid element".to_string(),
                message: value.to_string(),
            })
    }

    fn to_json(&self) -> Value {
        json!({ ELEMENT_KEY: self.0 })
    }
}

/// HTTP client bound to one driver server and at most one session
pub struct WebDriverClient {
    http: Client,
    base_url: String,
    session_id: Option<String>,
    retry: RetryConfig,
}

impl WebDriverClient {
    pub fn new(base_url: &str, timeout: Duration) -> UiResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_id: None,
            retry: RetryConfig::with_delays(2, 1000, 5000),
        })
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Create a session with the given `alwaysMatch` capabilities
    #[instrument(skip(self, capabilities))]
    pub async fn start_session(&mut self, capabilities: Value) -> UiResult<String> {
        let body = json!({ "capabilities": { "alwaysMatch": capabilities } });
        let this = &*self;
        let body_ref = &body;

        let value = with_retry(&self.retry, move || {
            this.send(Method::POST, "/session".to_string(), Some(body_ref.clone()))
        })
        .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| UiError::Protocol {
                error: "session not created".to_string(),
                message: value.to_string(),
            })?
            .to_string();

        debug!(session_id = %session_id, "WebDriver session started");
        self.session_id = Some(session_id.clone());
        Ok(session_id)
    }

    /// Delete the session; a client without a session is left untouched
    pub async fn end_session(&mut self) -> UiResult<()> {
        if let Some(id) = self.session_id.take() {
            self.send(Method::DELETE, format!("/session/{id}"), None)
                .await?;
            debug!(session_id = %id, "WebDriver session ended");
        }
        Ok(())
    }

    pub async fn set_page_load_timeout(&self, timeout: Duration) -> UiResult<()> {
        self.session_cmd(
            Method::POST,
            "timeouts",
            Some(json!({ "pageLoad": timeout.as_millis() as u64 })),
        )
        .await
        .map(|_| ())
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub async fn goto(&self, url: &str) -> UiResult<()> {
        self.session_cmd(Method::POST, "url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    pub async fn current_url(&self) -> UiResult<String> {
        let value = self.session_cmd(Method::GET, "url", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn back(&self) -> UiResult<()> {
        self.session_cmd(Method::POST, "back", Some(json!({})))
            .await
            .map(|_| ())
    }

    pub async fn refresh(&self) -> UiResult<()> {
        self.session_cmd(Method::POST, "refresh", Some(json!({})))
            .await
            .map(|_| ())
    }

    // ========================================================================
    // Elements
    // ========================================================================

    pub async fn find(&self, locator: &Locator) -> UiResult<ElementRef> {
        let value = self
            .session_cmd(Method::POST, "element", Some(locator.to_json()))
            .await?;
        ElementRef::from_value(&value)
    }

    pub async fn find_all(&self, locator: &Locator) -> UiResult<Vec<ElementRef>> {
        let value = self
            .session_cmd(Method::POST, "elements", Some(locator.to_json()))
            .await?;
        elements_from(&value)
    }

    pub async fn find_in(&self, parent: &ElementRef, locator: &Locator) -> UiResult<ElementRef> {
        let value = self
            .session_cmd(
                Method::POST,
                &format!("element/{}/element", parent.0),
                Some(locator.to_json()),
            )
            .await?;
        ElementRef::from_value(&value)
    }

    pub async fn find_all_in(
        &self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> UiResult<Vec<ElementRef>> {
        let value = self
            .session_cmd(
                Method::POST,
                &format!("element/{}/elements", parent.0),
                Some(locator.to_json()),
            )
            .await?;
        elements_from(&value)
    }

    /// Poll until `locator` matches or `timeout` elapses
    pub async fn wait_for(&self, locator: &Locator, timeout: Duration) -> UiResult<ElementRef> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.find(locator).await {
                Ok(element) => return Ok(element),
                Err(UiError::ElementNotFound(_)) if tokio::time::Instant::now() < deadline => {
                    tokio::time::sleep(WAIT_POLL).await;
                }
                Err(UiError::ElementNotFound(_)) => {
                    return Err(UiError::Timeout(locator.value().to_string()));
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn text(&self, element: &ElementRef) -> UiResult<String> {
        let value = self
            .session_cmd(Method::GET, &format!("element/{}/text", element.0), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn attribute(&self, element: &ElementRef, name: &str) -> UiResult<Option<String>> {
        let value = self
            .session_cmd(
                Method::GET,
                &format!("element/{}/attribute/{name}", element.0),
                None,
            )
            .await?;
        Ok(value.as_str().map(String::from))
    }

    pub async fn is_displayed(&self, element: &ElementRef) -> UiResult<bool> {
        let value = self
            .session_cmd(Method::GET, &format!("element/{}/displayed", element.0), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub async fn click(&self, element: &ElementRef) -> UiResult<()> {
        self.session_cmd(
            Method::POST,
            &format!("element/{}/click", element.0),
            Some(json!({})),
        )
        .await
        .map(|_| ())
    }

    pub async fn send_keys(&self, element: &ElementRef, text: &str) -> UiResult<()> {
        self.session_cmd(
            Method::POST,
            &format!("element/{}/value", element.0),
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    // ========================================================================
    // Scripts and cookies
    // ========================================================================

    /// Run a synchronous script; element arguments are passed as references
    pub async fn execute(&self, script: &str, args: &[&ElementRef]) -> UiResult<Value> {
        let args: Vec<Value> = args.iter().map(|e| e.to_json()).collect();
        self.session_cmd(
            Method::POST,
            "execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    pub async fn cookies(&self) -> UiResult<Vec<Value>> {
        let value = self.session_cmd(Method::GET, "cookie", None).await?;
        Ok(value.as_array().cloned().unwrap_or_default())
    }

    pub async fn add_cookie(&self, cookie: Value) -> UiResult<()> {
        self.session_cmd(Method::POST, "cookie", Some(json!({ "cookie": cookie })))
            .await
            .map(|_| ())
    }

    // ========================================================================
    // Transport
    // ========================================================================

    async fn session_cmd(&self, method: Method, path: &str, body: Option<Value>) -> UiResult<Value> {
        let id = self.session_id.as_deref().ok_or(UiError::SessionNotStarted)?;
        self.send(method, format!("/session/{id}/{path}"), body).await
    }

    async fn send(&self, method: Method, path: String, body: Option<Value>) -> UiResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let raw = response.text().await?;

        let payload: Value = serde_json::from_str(&raw).map_err(|_| UiError::Protocol {
            error: "invalid response".to_string(),
            message: raw.clone(),
        })?;
        let value = payload.get("value").cloned().unwrap_or(Value::Null);

        if !status.is_success() {
            let error = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            return Err(UiError::from_protocol(error, message));
        }

        Ok(value)
    }
}

fn elements_from(value: &Value) -> UiResult<Vec<ElementRef>> {
    value
        .as_array()
        .map(|items| items.iter().map(ElementRef::from_value).collect())
        .unwrap_or_else(|| Ok(Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn started(server: &MockServer) -> WebDriverClient {
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": { "sessionId": "abc", "capabilities": {} }
            })))
            .mount(server)
            .await;

        let mut client = WebDriverClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        client.start_session(json!({ "browserName": "chrome" })).await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_start_session() {
        let server = MockServer::start().await;
        let client = started(&server).await;
        assert_eq!(client.session_id(), Some("abc"));
    }

    #[tokio::test]
    async fn test_command_without_session() {
        let client = WebDriverClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            client.goto("https://x.com").await,
            Err(UiError::SessionNotStarted)
        ));
    }

    #[tokio::test]
    async fn test_find_elements() {
        let server = MockServer::start().await;
        let client = started(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc/elements"))
            .and(body_partial_json(json!({ "using": "css selector", "value": "article" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [ { ELEMENT_KEY: "e1" }, { ELEMENT_KEY: "e2" } ]
            })))
            .mount(&server)
            .await;

        let elements = client.find_all(&Locator::css("article")).await.unwrap();
        assert_eq!(elements, vec![ElementRef("e1".into()), ElementRef("e2".into())]);
    }

    #[tokio::test]
    async fn test_no_such_element_maps_to_ui_error() {
        let server = MockServer::start().await;
        let client = started(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc/element"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "value": { "error": "no such element", "message": "not here", "stacktrace": "" }
            })))
            .mount(&server)
            .await;

        let err = client.find(&Locator::css("#missing")).await.unwrap_err();
        assert!(matches!(err, UiError::ElementNotFound(m) if m == "not here"));
    }

    #[tokio::test]
    async fn test_element_text_and_attribute() {
        let server = MockServer::start().await;
        let client = started(&server).await;

        Mock::given(method("GET"))
            .and(path("/session/abc/element/e1/text"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "hello" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/session/abc/element/e1/attribute/href"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
            .mount(&server)
            .await;

        let element = ElementRef("e1".into());
        assert_eq!(client.text(&element).await.unwrap(), "hello");
        assert_eq!(client.attribute(&element, "href").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_end_session_clears_id() {
        let server = MockServer::start().await;
        let mut client = started(&server).await;

        Mock::given(method("DELETE"))
            .and(path("/session/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
            .expect(1)
            .mount(&server)
            .await;

        client.end_session().await.unwrap();
        assert!(client.session_id().is_none());
        client.end_session().await.unwrap();
    }
}
