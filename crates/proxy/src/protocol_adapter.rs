//! Protocol adapter (C6): handles `protocol://smtp` and `protocol://imap`
//! connector results, which carry no real URL — only an `action` and its
//! fields inside a [`RequestBody::Protocol`] JSON body.
//!
//! Connections are opened lazily and reused across calls; the adapter is
//! meant to live as long as the proxy that owns it.

use cplane_core::{ConnectorResponse, ConnectorResult, RequestBody, ResponseBody};
use futures::TryStreamExt;
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::{Mailbox, MessageBuilder};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

type ImapSession = async_imap::Session<async_native_tls::TlsStream<TcpStream>>;

/// Static configuration + credentials the adapter was constructed with.
/// Mirrors the proxy resolving `email.smtp_*`/`email.imap_*` vault keys
/// once and handing them to a long-lived adapter instance.
#[derive(Debug, Clone)]
pub struct ProtocolAdapterConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub smtp_from_address: String,
    pub smtp_use_tls: bool,
    pub imap_host: Option<String>,
    pub imap_port: Option<u16>,
    pub imap_username: Option<String>,
    pub imap_password: Option<String>,
}

pub struct ProtocolAdapter {
    config: ProtocolAdapterConfig,
    smtp: Mutex<Option<AsyncSmtpTransport<Tokio1Executor>>>,
    imap: Mutex<Option<ImapSession>>,
}

macro_rules! raw_header {
    ($ty:ident, $name:literal) => {
        struct $ty(String);

        impl Header for $ty {
            fn name() -> HeaderName {
                HeaderName::new_from_ascii_str($name).expect("valid header name")
            }

            fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
                Ok($ty(s.to_string()))
            }

            fn display(&self) -> HeaderValue {
                HeaderValue::new(Self::name(), self.0.clone())
            }
        }
    };
}

raw_header!(InReplyToHeader, "In-Reply-To");
raw_header!(ReferencesHeader, "References");

impl ProtocolAdapter {
    pub fn new(config: ProtocolAdapterConfig) -> Self {
        Self {
            config,
            smtp: Mutex::new(None),
            imap: Mutex::new(None),
        }
    }

    pub async fn execute(&self, result: &ConnectorResult) -> ConnectorResponse {
        let started = std::time::Instant::now();
        let scheme = result.url.trim_start_matches("protocol://");
        let body = match &result.body {
            RequestBody::Protocol(v) => v.clone(),
            _ => json!({}),
        };
        let action = body.get("action").and_then(|v| v.as_str()).unwrap_or("").to_string();

        let outcome = match scheme {
            "smtp" => self.handle_smtp(&action, &body).await,
            "imap" => self.handle_imap(&action, &body).await,
            other => Err(format!("unknown protocol adapter scheme '{other}'")),
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        match outcome {
            Ok(value) => ConnectorResponse {
                operation_id: result.operation_id.clone(),
                connector_id: result.connector_id.clone(),
                status_code: 200,
                headers: HashMap::new(),
                body: ResponseBody::Json(value),
                elapsed_ms,
                success: true,
                error: String::new(),
                receipt_id: String::new(),
            },
            Err(message) => ConnectorResponse {
                operation_id: result.operation_id.clone(),
                connector_id: result.connector_id.clone(),
                status_code: 0,
                headers: HashMap::new(),
                body: ResponseBody::Empty,
                elapsed_ms,
                success: false,
                error: message,
                receipt_id: String::new(),
            },
        }
    }

    /// Quits SMTP, logs out IMAP. Safe to call more than once.
    pub async fn close(&self) {
        *self.smtp.lock().await = None;
        if let Some(mut session) = self.imap.lock().await.take() {
            let _ = session.logout().await;
        }
    }

    async fn handle_smtp(&self, action: &str, body: &Value) -> Result<Value, String> {
        match action {
            "send" => self.smtp_send(body).await,
            "reply" => self.smtp_reply(body).await,
            other => Err(format!("unknown smtp action '{other}'")),
        }
    }

    async fn smtp_send(&self, body: &Value) -> Result<Value, String> {
        let to = str_field(body, "to")?;
        let subject = str_field(body, "subject")?;
        let message = self.build_message(body, &to, &subject, None)?;
        self.send(message).await?;
        Ok(json!({"status": "sent", "to": to, "subject": subject}))
    }

    async fn smtp_reply(&self, body: &Value) -> Result<Value, String> {
        let to = str_field(body, "to")?;
        let subject = str_field(body, "subject")?;
        let in_reply_to = body
            .get("headers")
            .and_then(|h| h.get("In-Reply-To"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let message = self.build_message(body, &to, &subject, Some(&in_reply_to))?;
        self.send(message).await?;
        Ok(json!({"status": "replied", "in_reply_to": in_reply_to}))
    }

    fn build_message(
        &self,
        body: &Value,
        to: &str,
        subject: &str,
        in_reply_to: Option<&str>,
    ) -> Result<Message, String> {
        let from: Mailbox = self
            .config
            .smtp_from_address
            .parse()
            .map_err(|_| "invalid from address configured for smtp".to_string())?;
        let to_mailbox: Mailbox = to.parse().map_err(|_| format!("invalid recipient address '{to}'"))?;

        let mut builder: MessageBuilder = Message::builder().from(from).to(to_mailbox).subject(subject);

        if let Some(cc) = body.get("cc").and_then(|v| v.as_str()).filter(|s| !s.is_empty()) {
            let cc_mailbox: Mailbox = cc.parse().map_err(|_| format!("invalid cc address '{cc}'"))?;
            builder = builder.cc(cc_mailbox);
        }

        if let Some(id) = in_reply_to.filter(|s| !s.is_empty()) {
            builder = builder
                .header(InReplyToHeader(id.to_string()))
                .header(ReferencesHeader(id.to_string()));
        }

        let mime_type = body.get("mime_type").and_then(|v| v.as_str()).unwrap_or("text/plain");
        let content_type = if mime_type.eq_ignore_ascii_case("text/html") {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };

        let text = body.get("body").and_then(|v| v.as_str()).unwrap_or("").to_string();
        builder
            .header(content_type)
            .body(text)
            .map_err(|e| format!("failed to build message: {e}"))
    }

    async fn send(&self, message: Message) -> Result<(), String> {
        let mut guard = self.smtp.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect_smtp()?);
        }
        let transport = guard.as_ref().unwrap();
        transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| format!("smtp transport error: {e}"))
    }

    fn connect_smtp(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, String> {
        let creds = Credentials::new(self.config.smtp_username.clone(), self.config.smtp_password.clone());
        let builder = if self.config.smtp_use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
        } else {
            Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_host))
        }
        .map_err(|e| format!("failed to configure smtp transport: {e}"))?;
        Ok(builder.port(self.config.smtp_port).credentials(creds).build())
    }

    async fn handle_imap(&self, action: &str, body: &Value) -> Result<Value, String> {
        let mut guard = self.imap.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect_imap().await?);
        }
        let session = guard.as_mut().unwrap();

        match action {
            "list" => {
                let folder = body.get("folder").and_then(|v| v.as_str()).unwrap_or("INBOX");
                let max_results = body.get("max_results").and_then(|v| v.as_u64()).unwrap_or(50) as usize;
                session
                    .select(folder)
                    .await
                    .map_err(|e| format!("imap select failed: {e}"))?;
                let mut ids: Vec<u32> = session
                    .search("ALL")
                    .await
                    .map_err(|e| format!("imap search failed: {e}"))?
                    .into_iter()
                    .collect();
                ids.sort_unstable();
                let total = ids.len();
                let tail: Vec<u32> = ids.into_iter().rev().take(max_results).rev().collect();
                Ok(json!({"message_ids": tail, "total": total}))
            }
            "fetch" => {
                let message_id = str_field(body, "message_id")?;
                session
                    .select("INBOX")
                    .await
                    .map_err(|e| format!("imap select failed: {e}"))?;
                let fetches: Vec<async_imap::types::Fetch> = session
                    .fetch(&message_id, "RFC822")
                    .await
                    .map_err(|e| format!("imap fetch failed: {e}"))?
                    .try_collect()
                    .await
                    .map_err(|e| format!("imap fetch stream failed: {e}"))?;
                let raw = fetches
                    .first()
                    .and_then(|f| f.body())
                    .map(|b| String::from_utf8_lossy(b).to_string())
                    .unwrap_or_default();
                Ok(json!({"message_id": message_id, "raw": raw}))
            }
            "search" => {
                let query = str_field(body, "query")?;
                session
                    .select("INBOX")
                    .await
                    .map_err(|e| format!("imap select failed: {e}"))?;
                let criterion = format!("SUBJECT \"{query}\"");
                let mut ids: Vec<u32> = session
                    .search(&criterion)
                    .await
                    .map_err(|e| format!("imap search failed: {e}"))?
                    .into_iter()
                    .collect();
                ids.sort_unstable();
                Ok(json!({"message_ids": ids}))
            }
            "delete" => {
                let message_id = str_field(body, "message_id")?;
                session
                    .select("INBOX")
                    .await
                    .map_err(|e| format!("imap select failed: {e}"))?;
                drain_store(session, &message_id, "+FLAGS (\\Deleted)").await?;
                drain_expunge(session).await?;
                Ok(json!({"status": "deleted", "message_id": message_id}))
            }
            "move" => {
                let message_id = str_field(body, "message_id")?;
                let destination = str_field(body, "destination")?;
                session
                    .select("INBOX")
                    .await
                    .map_err(|e| format!("imap select failed: {e}"))?;
                // Partial failure here (COPY succeeds, STORE/EXPUNGE does
                // not) is not rolled back — the message ends up in both
                // folders rather than neither.
                session
                    .copy(&message_id, &destination)
                    .await
                    .map_err(|e| format!("imap copy failed: {e}"))?;
                drain_store(session, &message_id, "+FLAGS (\\Deleted)").await?;
                drain_expunge(session).await?;
                Ok(json!({"status": "moved", "message_id": message_id, "destination": destination}))
            }
            other => Err(format!("unknown imap action '{other}'")),
        }
    }

    async fn connect_imap(&self) -> Result<ImapSession, String> {
        let host = self
            .config
            .imap_host
            .clone()
            .ok_or_else(|| "imap not configured for this email account".to_string())?;
        let port = self.config.imap_port.unwrap_or(993);
        let username = self.config.imap_username.clone().unwrap_or_default();
        let password = self.config.imap_password.clone().unwrap_or_default();

        let tls = async_native_tls::TlsConnector::new();
        let client = async_imap::connect((host.as_str(), port), host.clone(), tls)
            .await
            .map_err(|e| format!("imap connect failed: {e}"))?;
        client
            .login(username, password)
            .await
            .map_err(|(e, _client)| format!("imap login failed: {e}"))
    }
}

async fn drain_store(session: &mut ImapSession, sequence: &str, query: &str) -> Result<(), String> {
    let stream = session
        .store(sequence, query)
        .await
        .map_err(|e| format!("imap store failed: {e}"))?;
    let _: Vec<async_imap::types::Fetch> = stream
        .try_collect()
        .await
        .map_err(|e| format!("imap store stream failed: {e}"))?;
    Ok(())
}

/// `EXPUNGE` returns a lazy stream of the sequence numbers it removed,
/// same as `STORE` and `FETCH` — it must be polled to dry or the
/// command never actually goes out on the wire.
async fn drain_expunge(session: &mut ImapSession) -> Result<(), String> {
    let stream = session
        .expunge()
        .await
        .map_err(|e| format!("imap expunge failed: {e}"))?;
    let _: Vec<u32> = stream
        .try_collect()
        .await
        .map_err(|e| format!("imap expunge stream failed: {e}"))?;
    Ok(())
}

fn str_field(body: &Value, name: &str) -> Result<String, String> {
    body.get(name)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| format!("missing required field '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProtocolAdapterConfig {
        ProtocolAdapterConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
            smtp_username: "bot@example.com".into(),
            smtp_password: "secret".into(),
            smtp_from_address: "bot@example.com".into(),
            smtp_use_tls: true,
            imap_host: None,
            imap_port: None,
            imap_username: None,
            imap_password: None,
        }
    }

    #[test]
    fn build_message_rejects_invalid_recipient() {
        let adapter = ProtocolAdapter::new(config());
        let body = json!({"to": "not-an-address", "subject": "hi", "body": "hello"});
        let err = adapter.build_message(&body, "not-an-address", "hi", None).unwrap_err();
        assert!(err.contains("invalid recipient"));
    }

    #[test]
    fn build_message_attaches_reply_headers() {
        let adapter = ProtocolAdapter::new(config());
        let body = json!({"to": "user@example.com", "subject": "re: hi", "body": "reply text"});
        let message = adapter
            .build_message(&body, "user@example.com", "re: hi", Some("<abc@example.com>"))
            .unwrap();
        let raw = message.formatted();
        let text = String::from_utf8_lossy(&raw);
        assert!(text.contains("In-Reply-To: <abc@example.com>"));
        assert!(text.contains("References: <abc@example.com>"));
    }

    #[tokio::test]
    async fn unknown_scheme_is_reported_as_error() {
        let adapter = ProtocolAdapter::new(config());
        let result = ConnectorResult {
            operation_id: "x".into(),
            connector_id: "email".into(),
            method: cplane_core::HttpMethod::Post,
            url: "protocol://gopher".into(),
            headers: HashMap::new(),
            body: RequestBody::Protocol(json!({"action": "noop"})),
            timeout_seconds: 30,
            credential_vault_key: String::new(),
            metadata: HashMap::new(),
        };
        let response = adapter.execute(&result).await;
        assert!(!response.success);
        assert_eq!(response.status_code, 0);
        assert!(response.error.contains("unknown protocol adapter scheme"));
    }

    #[tokio::test]
    async fn imap_action_without_config_reports_error() {
        let adapter = ProtocolAdapter::new(config());
        let result = ConnectorResult {
            operation_id: "x".into(),
            connector_id: "email".into(),
            method: cplane_core::HttpMethod::Post,
            url: "protocol://imap".into(),
            headers: HashMap::new(),
            body: RequestBody::Protocol(json!({"action": "list"})),
            timeout_seconds: 30,
            credential_vault_key: String::new(),
            metadata: HashMap::new(),
        };
        let response = adapter.execute(&result).await;
        assert!(!response.success);
        assert!(response.error.contains("imap not configured"));
    }
}
