mod support;

use jetty_wrapper::server::{is_port_open, is_process_alive, startup_wait};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

#[tokio::test]
async fn test_port_closed_then_open() {
    let port = support::free_port();
    assert!(!is_port_open(port).await);

    let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    assert!(is_port_open(port).await);

    drop(listener);
    assert!(!is_port_open(port).await);
}

#[tokio::test]
async fn test_startup_wait_sees_late_listener() {
    let port = support::free_port();
    let server = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(listener);
    });

    let started = Instant::now();
    let ready = startup_wait(port, Duration::from_secs(5)).await;

    assert!(ready);
    assert!(started.elapsed() >= Duration::from_secs(1));
    server.abort();
}

#[tokio::test]
async fn test_startup_wait_times_out_without_error() {
    let port = support::free_port();

    let started = Instant::now();
    let ready = startup_wait(port, Duration::from_secs(1)).await;

    assert!(!ready);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_zero_wait_checks_once() {
    let port = support::free_port();
    let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();

    assert!(startup_wait(port, Duration::ZERO).await);
    drop(listener);
}

#[test]
fn test_process_liveness() {
    assert!(is_process_alive(std::process::id()));
    assert!(!is_process_alive(0));
    assert!(!is_process_alive(support::dead_pid()));
}

#[tokio::test]
async fn test_unrepresentable_wait_polls_without_deadline() {
    let port = support::free_port();
    let server = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(listener);
    });

    let ready = tokio::time::timeout(
        Duration::from_secs(10),
        startup_wait(port, Duration::from_secs(u64::MAX)),
    )
    .await;

    assert_eq!(ready.ok(), Some(true));
    server.abort();
}

#[cfg(unix)]
#[test]
fn test_unsignalable_process_counts_as_alive() {
    // Unprivileged callers get EPERM for init; root gets a plain success.
    assert!(is_process_alive(1));
}
