use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::{Client, Url};
use tracing::{debug, trace, warn};

use super::{BulkIndexer, FlushPolicy};
use crate::error::{ConfigError, IndexError};

/// 🔌 Either we have a client, or we build one on the next batch.
///
/// A timeout drops the client on the floor. Whatever half-read socket it was holding goes
/// with it, and the next batch gets a fresh connection.
#[derive(Debug)]
enum Connection {
    Disconnected,
    Connected(Client),
}

/// 📡 POSTs batches to `<scheme>://<host>/_bulk`.
///
/// One in-flight request at a time (the committer only ever has one batch), one idle
/// connection kept around between them.
#[derive(Debug)]
pub struct HttpBulkIndexer {
    bulk_url: Url,
    policy: FlushPolicy,
    /// `None` means wait as long as it takes.
    timeout: Option<Duration>,
    connection: Connection,
}

impl HttpBulkIndexer {
    /// 🚀 Parses `server` and keeps only scheme, host and port. No network traffic yet.
    pub fn new(
        server: &str,
        policy: FlushPolicy,
        timeout: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidServer {
            url: server.to_string(),
            reason,
        };
        let parsed = Url::parse(server).map_err(|err| invalid(err.to_string()))?;
        let host = match parsed.host_str() {
            Some(host) if !host.is_empty() => host,
            _ => return Err(invalid("no host to talk to".to_string())),
        };
        let authority = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let bulk_url = Url::parse(&format!("{}://{}/_bulk", parsed.scheme(), authority))
            .map_err(|err| invalid(err.to_string()))?;

        debug!("🎯 bulk endpoint is {}", bulk_url);
        Ok(Self {
            bulk_url,
            policy,
            timeout: timeout.filter(|t| !t.is_zero()),
            connection: Connection::Disconnected,
        })
    }

    pub fn bulk_url(&self) -> &Url {
        &self.bulk_url
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection, Connection::Connected(_))
    }

    fn connect(&mut self) -> Result<Client, IndexError> {
        if let Connection::Connected(client) = &self.connection {
            return Ok(client.clone());
        }
        // -- 3xx is an answer, not a forwarding address. one POST per batch, full stop.
        let client = Client::builder()
            .pool_max_idle_per_host(1)
            .redirect(Policy::none())
            .build()
            .map_err(IndexError::Transport)?;
        debug!("🔌 connected to {}", self.bulk_url);
        self.connection = Connection::Connected(client.clone());
        Ok(client)
    }

    fn disconnect(&mut self) {
        warn!("🔌 dropping the connection to {} after a timeout", self.bulk_url);
        self.connection = Connection::Disconnected;
    }
}

#[async_trait]
impl BulkIndexer for HttpBulkIndexer {
    fn flush_policy(&self) -> FlushPolicy {
        self.policy
    }

    async fn index(&mut self, body: &[u8]) -> Result<(), IndexError> {
        let client = self.connect()?;
        let mut request = client
            .post(self.bulk_url.clone())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body.to_vec());
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        trace!("📡 posting {} bytes to {}", body.len(), self.bulk_url);
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                self.disconnect();
                return Err(IndexError::Timeout(err));
            }
            Err(err) => return Err(IndexError::Transport(err)),
        };

        let status = response.status();
        if status.as_u16() > 304 {
            // the body usually says which shard is sulking
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) if err.is_timeout() => {
                    self.disconnect();
                    return Err(IndexError::Timeout(err));
                }
                Err(err) => {
                    debug!("🤐 the store said {} but would not say why: {}", status, err);
                    String::new()
                }
            };
            return Err(IndexError::StoreResponse { status, body });
        }

        // -- drain it so the connection can go back in the pool
        match response.bytes().await {
            Ok(_) => Ok(()),
            Err(err) if err.is_timeout() => {
                self.disconnect();
                Err(IndexError::Timeout(err))
            }
            Err(err) => Err(IndexError::Body(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BATCH: &[u8] = b"{\"index\":{\"_index\":\"logs\",\"_type\":\"message\"}}\n{\"a\":1}\n";

    #[test]
    fn the_one_where_only_scheme_and_host_survive() -> anyhow::Result<()> {
        let indexer = HttpBulkIndexer::new(
            "HTTP://es.example.com:9201/some/path?pretty",
            FlushPolicy::by_count(1),
            None,
        )?;
        assert_eq!(indexer.bulk_url().as_str(), "http://es.example.com:9201/_bulk");
        assert!(!indexer.is_connected());
        Ok(())
    }

    #[test]
    fn the_one_where_garbage_servers_fail_at_startup() {
        for server in ["", "not a url", "localhost:9200", "file:///tmp/es"] {
            assert!(
                matches!(
                    HttpBulkIndexer::new(server, FlushPolicy::by_count(1), None),
                    Err(ConfigError::InvalidServer { .. })
                ),
                "server {server:?} should have been rejected"
            );
        }
    }

    #[tokio::test]
    async fn the_one_where_the_batch_lands() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .and(header("accept", "application/json"))
            .and(body_bytes(BATCH))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"errors":false}"#))
            .expect(1)
            .mount(&server)
            .await;

        let mut indexer = HttpBulkIndexer::new(&server.uri(), FlushPolicy::by_count(10), None)?;
        indexer.index(BATCH).await?;
        assert!(indexer.is_connected());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_304_is_still_fine_but_305_is_not() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(304))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(305))
            .mount(&server)
            .await;

        let mut indexer = HttpBulkIndexer::new(&server.uri(), FlushPolicy::by_count(10), None)?;
        indexer.index(BATCH).await?;
        match indexer.index(BATCH).await {
            Err(IndexError::StoreResponse { status, .. }) => assert_eq!(status.as_u16(), 305),
            other => panic!("💀 a 305 should be a StoreResponse, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_store_says_no_but_we_stay_connected() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(ResponseTemplate::new(500).set_body_string("shard on fire"))
            .mount(&server)
            .await;

        let mut indexer = HttpBulkIndexer::new(&server.uri(), FlushPolicy::by_count(10), None)?;
        match indexer.index(BATCH).await {
            Err(IndexError::StoreResponse { status, body }) => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "shard on fire");
            }
            other => panic!("💀 expected the store to complain, got {other:?}"),
        }
        assert!(indexer.is_connected());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_slow_store_gets_hung_up_on() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let mut indexer = HttpBulkIndexer::new(
            &server.uri(),
            FlushPolicy::by_count(10),
            Some(Duration::from_millis(50)),
        )?;
        match indexer.index(BATCH).await {
            Err(IndexError::Timeout(_)) => {}
            other => panic!("💀 expected a timeout, got {other:?}"),
        }
        assert!(!indexer.is_connected());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_next_batch_after_a_timeout_dials_back_in() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut indexer = HttpBulkIndexer::new(
            &server.uri(),
            FlushPolicy::by_count(10),
            Some(Duration::from_millis(50)),
        )?;
        assert!(matches!(indexer.index(BATCH).await, Err(IndexError::Timeout(_))));
        assert!(!indexer.is_connected());

        // 🔌 fresh client, same store, happier outcome
        indexer.index(BATCH).await?;
        assert!(indexer.is_connected());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_redirect_is_not_followed() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/elsewhere"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/elsewhere"))
            .respond_with(ResponseTemplate::new(404))
            .expect(0)
            .mount(&server)
            .await;

        let mut indexer = HttpBulkIndexer::new(&server.uri(), FlushPolicy::by_count(10), None)?;
        indexer.index(BATCH).await?;

        let received = server.received_requests().await.unwrap_or_default();
        assert_eq!(received.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_307_does_not_post_the_batch_twice() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(ResponseTemplate::new(307).insert_header("Location", "/other"))
            .expect(1)
            .mount(&server)
            .await;

        let mut indexer = HttpBulkIndexer::new(&server.uri(), FlushPolicy::by_count(10), None)?;
        match indexer.index(BATCH).await {
            Err(IndexError::StoreResponse { status, .. }) => assert_eq!(status.as_u16(), 307),
            other => panic!("💀 a 307 is above 304 and should be a StoreResponse, got {other:?}"),
        }

        let received = server.received_requests().await.unwrap_or_default();
        assert_eq!(received.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_complaint_trails_off_and_we_hang_up() -> anyhow::Result<()> {
        // 🐌 a store that sends a 500, promises a body, then goes quiet mid-sentence
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let store = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await?;
            let mut request = vec![0u8; 4096];
            let _ = socket.read(&mut request).await?;
            socket
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\nshard on")
                .await?;
            socket.flush().await?;
            tokio::time::sleep(Duration::from_secs(2)).await;
            anyhow::Ok(())
        });

        let mut indexer = HttpBulkIndexer::new(
            &format!("http://{addr}"),
            FlushPolicy::by_count(10),
            Some(Duration::from_millis(200)),
        )?;
        match indexer.index(BATCH).await {
            Err(IndexError::Timeout(_)) => {}
            other => panic!("💀 expected a timeout while reading the error body, got {other:?}"),
        }
        assert!(!indexer.is_connected());
        store.abort();
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_zero_timeout_means_patience() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
            .mount(&server)
            .await;

        let mut indexer =
            HttpBulkIndexer::new(&server.uri(), FlushPolicy::by_count(10), Some(Duration::ZERO))?;
        indexer.index(BATCH).await?;
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_nobody_is_listening() -> anyhow::Result<()> {
        // -- port 1 on loopback: reserved, and nobody in their right mind runs a store there
        let mut indexer =
            HttpBulkIndexer::new("http://127.0.0.1:1", FlushPolicy::by_count(10), None)?;
        match indexer.index(BATCH).await {
            Err(IndexError::Transport(_)) => {}
            other => panic!("💀 expected a transport error, got {other:?}"),
        }
        // -- not a timeout, so the client stays put
        assert!(indexer.is_connected());
        Ok(())
    }
}
