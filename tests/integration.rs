use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

use rax_chat_server::protocol::{MAX_PAYLOAD_LEN, decode, encode, is_roster, parse_roster};
use rax_chat_server::server::{StartOutcome, StopOutcome};
use rax_chat_server::{ServerConfig, ServerControl};

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(300);

fn test_config(roster_interval_secs: u64) -> ServerConfig {
    ServerConfig {
        bind_address: "127.0.0.1".to_string(),
        port: 0,
        roster_interval_secs,
        shutdown_grace_secs: 1,
        ..ServerConfig::default()
    }
}

async fn start(config: ServerConfig) -> (ServerControl, SocketAddr) {
    let control = ServerControl::new(config);
    assert_eq!(control.start_server().await.unwrap(), StartOutcome::Started);
    let addr = control.local_addr().await.unwrap();
    (control, addr)
}

async fn send(stream: &mut TcpStream, text: &str) {
    stream.write_all(&encode(text).unwrap()).await.unwrap();
}

// Connects and sends the display name
async fn join(addr: SocketAddr, name: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    send(&mut stream, name).await;
    stream
}

async fn wait_for_names(control: &ServerControl, expected: &[&str]) {
    let server = control.server().await.unwrap();
    timeout(WAIT, async {
        while server.registry().snapshot_names().await != expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

async fn wait_for_client_count(control: &ServerControl, count: usize) {
    let server = control.server().await.unwrap();
    timeout(WAIT, async {
        while server.registry().len().await != count {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

// Next chat line, skipping roster broadcasts
async fn next_chat(stream: &mut TcpStream) -> String {
    timeout(WAIT, async {
        loop {
            let frame = decode(stream).await.unwrap().expect("stream closed");
            if !is_roster(&frame) {
                return frame;
            }
        }
    })
    .await
    .unwrap()
}

async fn next_roster(stream: &mut TcpStream) -> String {
    timeout(WAIT, async {
        loop {
            let frame = decode(stream).await.unwrap().expect("stream closed");
            if is_roster(&frame) {
                return frame;
            }
        }
    })
    .await
    .unwrap()
}

async fn assert_quiet(stream: &mut TcpStream) {
    let result = timeout(QUIET, decode(stream)).await;
    assert!(result.is_err(), "unexpected frame: {:?}", result);
}

#[tokio::test]
async fn test_alice_and_bob_chat_and_roster() {
    let (control, addr) = start(test_config(1)).await;

    let mut alice = join(addr, "alice").await;
    wait_for_names(&control, &["alice"]).await;
    let mut bob = join(addr, "bob").await;
    wait_for_names(&control, &["alice", "bob"]).await;

    send(&mut alice, "hello").await;
    assert_eq!(next_chat(&mut bob).await, "alice: hello");
    assert_eq!(next_chat(&mut alice).await, "alice: hello");

    for client in [&mut alice, &mut bob] {
        let roster = loop {
            let roster = next_roster(client).await;
            if parse_roster(&roster).is_some_and(|names| names.len() == 2) {
                break roster;
            }
        };
        assert_eq!(roster, "Lista_clientes:\nalice\nbob");
    }

    control.stop_server().await;
    control.disconnect_clients().await;
}

#[tokio::test]
async fn test_every_client_receives_each_line_once() {
    let (control, addr) = start(test_config(3600)).await;

    let names = ["ana", "ben", "cid"];
    let mut clients = Vec::new();
    for (i, name) in names.iter().enumerate() {
        clients.push(join(addr, name).await);
        wait_for_names(&control, &names[..=i]).await;
    }

    for (client, name) in clients.iter_mut().zip(names) {
        send(client, &format!("from {}", name)).await;
    }

    for client in clients.iter_mut() {
        let mut received = Vec::new();
        for _ in 0..names.len() {
            received.push(next_chat(client).await);
        }
        received.sort();
        assert_eq!(
            received,
            vec!["ana: from ana", "ben: from ben", "cid: from cid"]
        );
        assert_quiet(client).await;
    }

    control.stop_server().await;
    control.disconnect_clients().await;
}

#[tokio::test]
async fn test_disconnect_does_not_disrupt_others() {
    let (control, addr) = start(test_config(3600)).await;

    let a = join(addr, "A").await;
    wait_for_names(&control, &["A"]).await;
    let mut b = join(addr, "B").await;
    wait_for_names(&control, &["A", "B"]).await;
    let mut c = join(addr, "C").await;
    wait_for_names(&control, &["A", "B", "C"]).await;

    drop(a);
    wait_for_client_count(&control, 2).await;

    send(&mut b, "hi").await;
    assert_eq!(next_chat(&mut c).await, "B: hi");
    assert_eq!(next_chat(&mut b).await, "B: hi");

    control.stop_server().await;
    control.disconnect_clients().await;
}

#[tokio::test]
async fn test_line_too_long_to_relay_is_dropped() {
    let (control, addr) = start(test_config(3600)).await;

    let mut bob = join(addr, "bob").await;
    wait_for_names(&control, &["bob"]).await;
    let mut carol = join(addr, "carol").await;
    wait_for_names(&control, &["bob", "carol"]).await;
    let mut mallory = join(addr, "mallory").await;
    wait_for_names(&control, &["bob", "carol", "mallory"]).await;

    // Fits in a frame on its own, but not once prefixed with "mallory: ".
    send(&mut mallory, &"m".repeat(MAX_PAYLOAD_LEN)).await;
    send(&mut bob, "hi").await;

    assert_eq!(next_chat(&mut carol).await, "bob: hi");
    assert_eq!(next_chat(&mut mallory).await, "bob: hi");
    assert_eq!(next_chat(&mut bob).await, "bob: hi");
    wait_for_client_count(&control, 3).await;

    control.stop_server().await;
    control.disconnect_clients().await;
}

#[tokio::test]
async fn test_no_roster_without_named_clients() {
    let (control, addr) = start(test_config(1)).await;

    // Connected but never named: registered, yet absent from the roster.
    let mut lurker = TcpStream::connect(addr).await.unwrap();
    wait_for_client_count(&control, 1).await;

    let result = timeout(Duration::from_millis(2500), decode(&mut lurker)).await;
    assert!(result.is_err(), "unexpected frame: {:?}", result);

    control.stop_server().await;
    control.disconnect_clients().await;
}

#[tokio::test]
async fn test_peer_closing_before_name_is_dropped() {
    let (control, addr) = start(test_config(3600)).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    wait_for_client_count(&control, 1).await;
    drop(stream);
    wait_for_client_count(&control, 0).await;

    control.stop_server().await;
}

#[tokio::test]
async fn test_stop_leaves_connected_clients_running() {
    let (control, addr) = start(test_config(3600)).await;

    let mut alice = join(addr, "alice").await;
    wait_for_names(&control, &["alice"]).await;
    let mut bob = join(addr, "bob").await;
    wait_for_names(&control, &["alice", "bob"]).await;

    assert_eq!(control.stop_server().await, StopOutcome::Stopped);
    assert!(!control.is_running());
    assert!(TcpStream::connect(addr).await.is_err());

    send(&mut alice, "still here").await;
    assert_eq!(next_chat(&mut bob).await, "alice: still here");

    control.disconnect_clients().await;
    wait_for_client_count(&control, 0).await;
    assert_eq!(timeout(WAIT, decode(&mut bob)).await.unwrap().unwrap(), None);
}

#[tokio::test]
async fn test_lifecycle_calls_are_idempotent() {
    let control = ServerControl::new(test_config(3600));
    assert_eq!(control.stop_server().await, StopOutcome::NotRunning);
    assert!(!control.is_running());

    assert_eq!(control.start_server().await.unwrap(), StartOutcome::Started);
    assert_eq!(
        control.start_server().await.unwrap(),
        StartOutcome::AlreadyRunning
    );
    assert!(control.is_running());

    assert_eq!(control.stop_server().await, StopOutcome::Stopped);
    assert_eq!(control.stop_server().await, StopOutcome::NotRunning);
    assert!(!control.is_running());
}
