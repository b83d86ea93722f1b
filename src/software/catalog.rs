use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{CatalogError, LocalLibrary, SoftwareItem};
use crate::config::ServerConfig;

/// Raw answer from the catalog server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }
}

/// Blocking GET against the catalog. Non-2xx statuses are replies, not
/// errors; only a missing answer is an error.
pub trait CatalogTransport {
    fn get(&mut self, path: &str) -> Result<Reply, CatalogError>;
}

/// Plain HTTP transport
pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: String,
    max_body: usize,
}

impl HttpTransport {
    pub fn new(config: &ServerConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_body: config.max_package_bytes,
        }
    }
}

impl CatalogTransport for HttpTransport {
    fn get(&mut self, path: &str) -> Result<Reply, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Ok(Reply::status(code)),
            Err(ureq::Error::Transport(transport)) => {
                warn!("Request to {} failed: {}", url, transport);
                return Err(CatalogError::Transport(transport.kind().to_string()));
            }
        };

        let status = response.status();
        let mut body = Vec::new();
        response
            .into_reader()
            .take(self.max_body as u64 + 1)
            .read_to_end(&mut body)
            .map_err(|e| CatalogError::Transport(e.kind().to_string()))?;
        if body.len() > self.max_body {
            return Err(CatalogError::TooLarge {
                limit: self.max_body,
            });
        }

        Ok(Reply { status, body })
    }
}

/// Canned replies keyed by request path. Unknown paths answer 404.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    replies: Rc<RefCell<HashMap<String, Result<Reply, String>>>>,
    requests: Rc<RefCell<Vec<String>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, path: &str, reply: Reply) {
        self.replies.borrow_mut().insert(path.to_string(), Ok(reply));
    }

    /// Make `path` fail as if the server were unreachable
    pub fn fail(&self, path: &str, message: &str) {
        self.replies
            .borrow_mut()
            .insert(path.to_string(), Err(message.to_string()));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl CatalogTransport for MemoryTransport {
    fn get(&mut self, path: &str) -> Result<Reply, CatalogError> {
        self.requests.borrow_mut().push(path.to_string());
        match self.replies.borrow().get(path) {
            Some(Ok(reply)) => Ok(reply.clone()),
            Some(Err(message)) => Err(CatalogError::Transport(message.clone())),
            None => Ok(Reply::status(404)),
        }
    }
}

/// Client for the remote package catalog
pub struct SoftwareCatalog {
    transport: Box<dyn CatalogTransport>,
}

impl SoftwareCatalog {
    pub fn new(transport: Box<dyn CatalogTransport>) -> Self {
        Self { transport }
    }

    pub fn http(config: &ServerConfig) -> Self {
        Self::new(Box::new(HttpTransport::new(config)))
    }

    /// `GET /list`: package names in server order. Invalid names are skipped
    /// and repeats keep their first position.
    pub fn fetch_list(&mut self) -> Result<Vec<SoftwareItem>, CatalogError> {
        let reply = self.transport.get("/list")?;
        if reply.status != 200 {
            warn!("Catalog listing returned status {}", reply.status);
            return Err(CatalogError::Status(reply.status));
        }

        let names: Vec<String> = serde_json::from_slice(&reply.body)?;
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(names.len());
        for name in names {
            match SoftwareItem::new(name) {
                Ok(item) => {
                    if seen.insert(item.clone()) {
                        items.push(item);
                    }
                }
                Err(e) => warn!("Skipping catalog entry: {}", e),
            }
        }

        info!("Catalog lists {} package(s)", items.len());
        Ok(items)
    }

    /// `GET /download/{name}`: the package body, verbatim
    pub fn fetch_package(&mut self, item: &SoftwareItem) -> Result<Vec<u8>, CatalogError> {
        let path = format!("/download/{}", urlencoding::encode(item.name()));
        let reply = self.transport.get(&path)?;
        if reply.status != 200 {
            warn!("Download of {} returned status {}", item, reply.status);
            return Err(CatalogError::Status(reply.status));
        }
        Ok(reply.body)
    }

    /// Fetch `item` and install it into `library`. On any failure the
    /// library is left as it was. Returns the number of bytes stored.
    pub fn download(
        &mut self,
        item: &SoftwareItem,
        library: &LocalLibrary,
    ) -> Result<usize, CatalogError> {
        let body = self.fetch_package(item)?;
        library.install(item, &body)?;
        Ok(body.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(transport: &MemoryTransport) -> SoftwareCatalog {
        SoftwareCatalog::new(Box::new(transport.clone()))
    }

    fn names(items: &[SoftwareItem]) -> Vec<&str> {
        items.iter().map(|i| i.name()).collect()
    }

    #[test]
    fn test_list_filters_and_dedupes() {
        let transport = MemoryTransport::new();
        transport.reply(
            "/list",
            Reply::ok(r#"["game1","../etc","game2","game1",""]"#),
        );

        let items = catalog(&transport).fetch_list().unwrap();
        assert_eq!(names(&items), vec!["game1", "game2"]);
    }

    #[test]
    fn test_list_status_is_an_error() {
        let transport = MemoryTransport::new();
        transport.reply("/list", Reply::status(503));

        let err = catalog(&transport).fetch_list().unwrap_err();
        assert!(matches!(err, CatalogError::Status(503)));
    }

    #[test]
    fn test_list_rejects_non_array() {
        let transport = MemoryTransport::new();
        transport.reply("/list", Reply::ok(r#"{"game1": 1}"#));

        let err = catalog(&transport).fetch_list().unwrap_err();
        assert!(matches!(err, CatalogError::Listing(_)));
        assert_eq!(err.summary(), "Bad list: ");
    }

    #[test]
    fn test_download_writes_body_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let library = LocalLibrary::new(dir.path());
        let transport = MemoryTransport::new();
        let body = b"text 0 0 hi\nshow\n\xff".to_vec();
        transport.reply("/download/game%202", Reply::ok(body.clone()));

        let item = SoftwareItem::new("game 2").unwrap();
        let written = catalog(&transport).download(&item, &library).unwrap();

        assert_eq!(written, body.len());
        assert_eq!(library.read(&item).unwrap(), body);
        assert_eq!(transport.requests(), vec!["/download/game%202"]);
    }

    #[test]
    fn test_failed_download_leaves_storage_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let library = LocalLibrary::new(dir.path());
        let item = SoftwareItem::new("game1").unwrap();
        library.install(&item, b"old").unwrap();

        let transport = MemoryTransport::new();
        let mut catalog = catalog(&transport);
        assert!(catalog.download(&item, &library).unwrap_err().is_status());

        transport.fail("/download/game1", "Connection Failed");
        let err = catalog.download(&item, &library).unwrap_err();
        assert_eq!(err.summary(), "Connection");

        assert_eq!(library.read(&item).unwrap(), b"old");
        assert_eq!(library.list().len(), 1);
    }
}
