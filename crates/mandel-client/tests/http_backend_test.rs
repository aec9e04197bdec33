//! Worker client integration tests
//!
//! Each test starts a real worker HTTP server on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mandel_client::{ComputeBackend, Connector, HttpBackend, HttpBackendConnector};
use mandel_common::{BlockCoord, BlockMatrix, BlockRequest, MandelError, PlaneWindow, ServingStatus};
use mandel_worker::{HttpServer, Worker};
use tokio::net::TcpListener;

async fn start_worker() -> (SocketAddr, Arc<Worker>) {
    let worker = Arc::new(Worker::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(worker.clone());
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });

    (addr, worker)
}

#[tokio::test]
async fn test_compute_block() {
    let (addr, _worker) = start_worker().await;
    let backend = HttpBackend::new(addr.to_string(), Duration::from_secs(5));
    let req = BlockRequest::new(&PlaneWindow::default(), 2048, 256, BlockCoord::new(0, 0));

    let reply = backend.compute_block(req).await.unwrap();
    let matrix = BlockMatrix::from_results(&reply.results, 32).unwrap();
    assert_eq!(matrix.get(0, 0), 2);
}

#[tokio::test]
async fn test_remote_rejection_maps_to_invalid_request() {
    let (addr, _worker) = start_worker().await;
    let backend = HttpBackend::new(addr.to_string(), Duration::from_secs(5));
    let mut req = BlockRequest::new(&PlaneWindow::default(), 64, 256, BlockCoord::new(0, 0));
    req.block_x = 40;

    let err = backend.compute_block(req).await.unwrap_err();
    assert!(matches!(err, MandelError::InvalidRequest(_)), "unexpected error: {}", err);
    assert!(!err.is_connectivity());
}

#[tokio::test]
async fn test_check_health() {
    let (addr, worker) = start_worker().await;
    let backend = HttpBackend::new(addr.to_string(), Duration::from_secs(5));

    assert_eq!(backend.check_health().await.unwrap(), ServingStatus::Serving);
    worker.set_serving(false);
    assert_eq!(backend.check_health().await.unwrap(), ServingStatus::NotServing);
}

#[tokio::test]
async fn test_connector_requires_serving_worker() {
    let (addr, worker) = start_worker().await;
    let connector = HttpBackendConnector::new(Duration::from_secs(5));
    let addr = addr.to_string();

    let handle = connector.connect(&addr, Duration::from_secs(1)).await.unwrap();
    assert!(connector.probe(&handle, Duration::from_secs(1)).await.is_ok());

    worker.set_serving(false);
    assert!(matches!(
        connector.probe(&handle, Duration::from_secs(1)).await,
        Err(MandelError::BackendUnavailable(_))
    ));
    assert!(connector.connect(&addr, Duration::from_secs(1)).await.is_err());
}
