use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use blinken_deck::config::ServerConfig;
use blinken_deck::software::{CatalogError, LocalLibrary, SoftwareCatalog, SoftwareItem};
use blinken_deck::web;

/// Start the catalog server for `root` on an ephemeral loopback port
fn start_server(runtime: &tokio::runtime::Runtime, root: &Path) -> SocketAddr {
    let listener = runtime
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .unwrap();
    let addr = listener.local_addr().unwrap();
    runtime.spawn(web::serve_on(listener, root.to_path_buf()));
    addr
}

fn client(addr: SocketAddr, max_package_bytes: usize) -> SoftwareCatalog {
    SoftwareCatalog::http(&ServerConfig {
        base_url: format!("http://{}/", addr),
        timeout_secs: 5,
        max_package_bytes,
    })
}

#[test]
fn test_list_and_download_over_http() {
    let packages = tempfile::tempdir().unwrap();
    fs::write(packages.path().join("snake"), "text 0 0 SNAKE\nshow\n").unwrap();
    fs::write(packages.path().join("game 2"), [0u8, 1, 2, 255]).unwrap();
    fs::write(packages.path().join(".secret"), "hidden").unwrap();
    fs::create_dir(packages.path().join("drafts")).unwrap();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let addr = start_server(&runtime, packages.path());
    let mut catalog = client(addr, 1024);

    let names: Vec<String> = catalog
        .fetch_list()
        .unwrap()
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(names, vec!["game 2", "snake"]);

    let installed = tempfile::tempdir().unwrap();
    let library = LocalLibrary::new(installed.path());
    let binary = SoftwareItem::new("game 2").unwrap();
    assert_eq!(catalog.download(&binary, &library).unwrap(), 4);
    assert_eq!(library.read(&binary).unwrap(), vec![0u8, 1, 2, 255]);
}

#[test]
fn test_missing_package_is_a_status_error() {
    let packages = tempfile::tempdir().unwrap();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let addr = start_server(&runtime, packages.path());
    let mut catalog = client(addr, 1024);

    assert!(catalog.fetch_list().unwrap().is_empty());

    let installed = tempfile::tempdir().unwrap();
    let library = LocalLibrary::new(installed.path());
    let missing = SoftwareItem::new("nothing").unwrap();
    let err = catalog.download(&missing, &library).unwrap_err();
    assert!(matches!(err, CatalogError::Status(404)));
    assert_eq!(err.summary(), "Code 404");
    assert!(library.list().is_empty());
}

#[test]
fn test_oversized_package_is_rejected() {
    let packages = tempfile::tempdir().unwrap();
    fs::write(packages.path().join("huge"), vec![b'x'; 4096]).unwrap();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let addr = start_server(&runtime, packages.path());
    let mut catalog = client(addr, 1024);

    let installed = tempfile::tempdir().unwrap();
    let library = LocalLibrary::new(installed.path());
    let huge = SoftwareItem::new("huge").unwrap();
    let err = catalog.download(&huge, &library).unwrap_err();
    assert!(matches!(err, CatalogError::TooLarge { limit: 1024 }));
    assert!(!library.contains(&huge));
}

#[test]
fn test_unreachable_server_is_a_transport_error() {
    // Bind and immediately drop to get a port nobody listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let mut catalog = client(port, 1024);

    let err = catalog.fetch_list().unwrap_err();
    assert!(matches!(err, CatalogError::Transport(_)));
}
