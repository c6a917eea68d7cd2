//! Payload encoding and HTTP delivery to the store endpoints.

use crate::config::Config;
use crate::error::{DeliveryError, Error};
use crate::event::Event;
use crate::helpers::auth_timestamp;
use crate::signature::{auth_header, sign, AUTH_HEADER};
use base64::Engine;
use chrono::Utc;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use std::io::{Read, Write};
use url::Url;

/// Client identifier sent as `sentry_client` and `User-Agent`.
pub fn client_id() -> String {
    format!("raven-rs/{}", crate::VERSION)
}

/// Serialize to JSON, zlib-compress, then base64-encode.
pub fn encode(event: &Event) -> Result<String, DeliveryError> {
    let json = serde_json::to_vec(event)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;
    Ok(base64::engine::general_purpose::STANDARD.encode(compressed))
}

/// Inverse of [`encode`].
pub fn decode(payload: &str) -> Result<Event, DeliveryError> {
    let compressed = base64::engine::general_purpose::STANDARD
        .decode(payload.trim().as_bytes())
        .map_err(|e| DeliveryError::Decode(e.to_string()))?;
    let mut json = Vec::new();
    ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}

/// Carries one signed payload to one store endpoint.
pub trait Transport: Send + Sync {
    fn send(&self, url: &Url, auth: &str, body: &str) -> Result<(), DeliveryError>;
}

/// Blocking HTTP(S) transport. One request per call, no retries.
///
/// Idle connections are not kept, so every send opens and closes its own.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, Error> {
        if !config.verify_tls {
            tracing::warn!("TLS certificate verification is disabled for Sentry delivery");
        }
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .user_agent(client_id())
            .pool_max_idle_per_host(0)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| Error::Other(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn send(&self, url: &Url, auth: &str, body: &str) -> Result<(), DeliveryError> {
        let auth = HeaderValue::from_str(auth).map_err(|e| DeliveryError::Http(e.to_string()))?;
        let res = self
            .http
            .post(url.clone())
            .header(AUTH_HEADER, auth)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"))
            .body(body.to_string())
            .send()
            .map_err(|e| DeliveryError::Http(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                status_code: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Encode `event` once, then sign and send it to every configured server in order.
///
/// Each server is attempted independently; the returned list has one outcome per server.
pub fn deliver(
    transport: &dyn Transport,
    config: &Config,
    event: &Event,
) -> Result<Vec<(Url, Result<(), DeliveryError>)>, DeliveryError> {
    let body = encode(event)?;
    let client = client_id();
    let outcomes = config
        .servers
        .iter()
        .map(|url| {
            let timestamp = auth_timestamp(Utc::now());
            let signature = sign(&config.secret_key, &timestamp, body.as_bytes());
            let auth = auth_header(&signature, &timestamp, &client, Some(&config.public_key));
            (url.clone(), transport.send(url, &auth, &body))
        })
        .collect();
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HttpRequest;
    use crate::event::{EventBuilder, EventFields, Level, ResolvedStack};
    use crate::stacktrace::{DefaultStackFormatter, StackFrame};
    use serde_json::json;
    use std::sync::Mutex;

    fn config_for(servers: Vec<String>) -> Config {
        Config::from_options(crate::config::ClientOptions {
            servers,
            project: Some("1".to_string()),
            public_key: Some("public".to_string()),
            secret_key: Some("secret".to_string()),
            timeout: Some(2),
            ..Default::default()
        })
        .unwrap()
    }

    fn sample_event(config: &Config) -> Event {
        let request = HttpRequest::new("POST", "https", "app.example.com", "/pay")
            .form("amount", "10")
            .header("Accept", "*/*");
        let builder = EventBuilder {
            config,
            context: &request,
            formatter: &DefaultStackFormatter,
        };
        builder.build(
            EventFields::message(
                "%s failed after %d tries",
                vec![json!("payment"), json!(3)],
                Level::Warning,
            ),
            Some(ResolvedStack::Frames(vec![
                StackFrame::new("app::main", "src/main.rs", 10),
                StackFrame::new("app::pay", "src/pay.rs", 42),
            ])),
        )
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl Transport for Recorder {
        fn send(&self, url: &Url, auth: &str, body: &str) -> Result<(), DeliveryError> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), auth.to_string(), body.to_string()));
            Ok(())
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let config = config_for(vec!["https://s.example.com/api/store/".to_string()]);
        let event = sample_event(&config);
        let payload = encode(&event).unwrap();
        assert!(payload
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "+/=".contains(c)));
        assert_eq!(decode(&payload).unwrap(), event);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode("@@@"), Err(DeliveryError::Decode(_))));
        let not_zlib = base64::engine::general_purpose::STANDARD.encode(b"plain text");
        assert!(matches!(decode(&not_zlib), Err(DeliveryError::Compress(_))));
    }

    #[test]
    fn deliver_signs_each_server() {
        let config = config_for(vec![
            "https://a.example.com/api/store/".to_string(),
            "https://b.example.com/api/store/".to_string(),
        ]);
        let event = sample_event(&config);
        let recorder = Recorder::default();
        let outcomes = deliver(&recorder, &config, &event).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|(_, r)| r.is_ok()));

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls[0].0, "https://a.example.com/api/store/");
        assert_eq!(calls[1].0, "https://b.example.com/api/store/");
        for (_, auth, body) in calls.iter() {
            let timestamp = auth
                .trim_start_matches("Sentry ")
                .split(", ")
                .find_map(|t| t.strip_prefix("sentry_timestamp="))
                .unwrap();
            let expected = sign("secret", timestamp, body.as_bytes());
            assert!(auth.contains(&format!("sentry_signature={}", expected)));
            assert!(auth.contains(&format!("sentry_client=raven-rs/{}", crate::VERSION)));
            assert!(auth.ends_with("sentry_key=public"));
            assert_eq!(decode(body).unwrap(), event);
        }
    }

    #[test]
    fn http_transport_posts_octet_stream() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/store/")
            .match_header("content-type", "application/octet-stream")
            .match_header(
                "x-sentry-auth",
                mockito::Matcher::Regex("^Sentry sentry_timestamp=".to_string()),
            )
            .with_status(200)
            .create();

        let config = config_for(vec![format!("{}/api/store/", server.url())]);
        let transport = HttpTransport::new(&config).unwrap();
        let event = sample_event(&config);
        let outcomes = deliver(&transport, &config, &event).unwrap();
        assert!(outcomes[0].1.is_ok());
        mock.assert();
    }

    #[test]
    fn http_transport_sends_each_event_separately() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/store/")
            .match_header("user-agent", client_id().as_str())
            .with_status(200)
            .expect(2)
            .create();

        let config = config_for(vec![format!("{}/api/store/", server.url())]);
        let transport = HttpTransport::new(&config).unwrap();
        for _ in 0..2 {
            let event = sample_event(&config);
            let outcomes = deliver(&transport, &config, &event).unwrap();
            assert!(outcomes[0].1.is_ok());
        }
        mock.assert();
    }

    #[test]
    fn http_transport_reports_status() {
        let mut server = mockito::Server::new();
        let mock = server.mock("POST", "/api/store/").with_status(403).create();

        let config = config_for(vec![format!("{}/api/store/", server.url())]);
        let transport = HttpTransport::new(&config).unwrap();
        let event = sample_event(&config);
        let outcomes = deliver(&transport, &config, &event).unwrap();
        assert!(matches!(
            outcomes[0].1,
            Err(DeliveryError::Status { status_code: 403 })
        ));
        mock.assert();
    }
}
