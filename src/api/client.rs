use std::future::Future;
use std::sync::Arc;

use reqwest::Client as HttpClient;
use reqwest::StatusCode;
use reqwest::cookie::{CookieStore, Jar};
use tokio::runtime::Handle;
use url::Url;

use crate::api::models::{FormReply, MessageList, NewMessage};
use crate::api::socket::{self, SocketChannels};
use crate::board::MessageSource;
use crate::error::{Error, Result};
use crate::forms::{FormRecord, FormResponse, FormSubmitter};

/// HTTP side of the chat server. Cloning shares the connection pool and cookie jar.
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
    jar: Arc<Jar>,
    base: Url,
    runtime: Option<Handle>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(&crate::utils::normalize_url(base_url))?;
        let jar = Arc::new(Jar::default());
        let http = HttpClient::builder().cookie_provider(jar.clone()).build()?;
        Ok(Self { http, jar, base, runtime: None })
    }

    /// Runs every request on `runtime`, so callers may await from a non-tokio executor.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    async fn offload<T, F>(&self, fut: F) -> Result<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        match &self.runtime {
            Some(runtime) => runtime.spawn(fut).await?,
            None => fut.await,
        }
    }

    /// `GET /messages`; anything but `200` with a valid body is an error.
    pub async fn messages(&self) -> Result<MessageList> {
        let http = self.http.clone();
        let url = self.endpoint("/messages")?;
        self.offload(async move {
            let resp = http.get(url).send().await?;
            if resp.status() != StatusCode::OK {
                return Err(Error::status(resp.status()));
            }
            Ok(resp.json::<MessageList>().await?)
        })
        .await
    }

    /// `POST /messages`, returning the status code as-is.
    pub async fn post_message(&self, message: &NewMessage) -> Result<u16> {
        let http = self.http.clone();
        let url = self.endpoint("/messages")?;
        let body = message.clone();
        self.offload(async move {
            let resp = http.post(url).json(&body).send().await?;
            Ok(resp.status().as_u16())
        })
        .await
    }

    /// POSTs a form record as JSON. The session cookie of a successful login lands in the jar.
    pub async fn submit_form(&self, path: &str, record: &FormRecord) -> Result<FormResponse> {
        let http = self.http.clone();
        let url = self.endpoint(path)?;
        let body = record.clone();
        self.offload(async move {
            let resp = http.post(url).json(&body).send().await?;
            let status = resp.status();
            let reason = status.canonical_reason().unwrap_or_default().to_string();
            let reply = if status == StatusCode::OK {
                let bytes = resp.bytes().await?;
                serde_json::from_slice::<FormReply>(&bytes)
                    .inspect_err(|e| log::warn!("unreadable form reply: {e}"))
                    .ok()
            } else {
                None
            };
            Ok(FormResponse { status: status.as_u16(), reason, reply })
        })
        .await
    }

    /// `GET /logout`. The server answers with a redirect to `/`; any final status is fine.
    pub async fn logout(&self) -> Result<()> {
        let http = self.http.clone();
        let url = self.endpoint("/logout")?;
        self.offload(async move {
            http.get(url).send().await?;
            Ok(())
        })
        .await
    }

    /// The `Cookie` header value the jar would send to the server, if any.
    pub fn session_cookie(&self) -> Option<String> {
        let value = self.jar.cookies(&self.base)?;
        value.to_str().ok().map(str::to_string)
    }

    /// Maps the server URL to its websocket address: `http` becomes `ws`, `https` becomes `wss`.
    pub fn socket_url(&self, path: &str) -> Result<Url> {
        let mut url = self.endpoint(path)?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            "ws" | "wss" => return Ok(url),
            other => return Err(Error::Scheme(other.to_string())),
        };
        url.set_scheme(scheme).map_err(|()| Error::Scheme(scheme.to_string()))?;
        Ok(url)
    }

    /// Opens the chat socket on `runtime`, presenting the current session cookie.
    pub fn connect_chat(&self, runtime: &Handle, path: &str) -> Result<SocketChannels> {
        let url = self.socket_url(path)?;
        socket::spawn(runtime, &url, self.session_cookie().as_deref())
    }
}

impl MessageSource for ApiClient {
    async fn fetch_messages(&self) -> Result<MessageList> {
        self.messages().await
    }

    async fn create_message(&self, message: &NewMessage) -> Result<u16> {
        self.post_message(message).await
    }
}

impl FormSubmitter for ApiClient {
    async fn post_form(&self, endpoint: &str, record: &FormRecord) -> Result<FormResponse> {
        self.submit_form(endpoint, record).await
    }
}
