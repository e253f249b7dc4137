//! End-to-end tests: real clients over loopback TCP.

use qubic::{Seat, Status};
use qubic_server::{GamePhase, GameServer, ServerMessage};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

/// A test client speaking JSON lines.
struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    async fn send(&mut self, value: serde_json::Value) {
        let mut line = serde_json::to_vec(&value).unwrap();
        line.push(b'\n');
        self.writer.write_all(&line).await.unwrap();
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
    }

    async fn recv(&mut self) -> ServerMessage {
        let line = timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for message")
            .expect("read failed")
            .expect("connection closed");
        serde_json::from_str(&line).expect("valid server message")
    }

    async fn recv_state(&mut self) -> (Vec<i8>, Seat, bool, Option<i8>) {
        match self.recv().await {
            ServerMessage::State {
                jugadas,
                current_player,
                game_over,
                winner,
            } => (
                jugadas.iter().flatten().flatten().copied().collect(),
                current_player,
                game_over,
                winner,
            ),
            other => panic!("expected state, got {other:?}"),
        }
    }

    async fn play(&mut self, seat: Seat, z: i64, y: i64, x: i64) {
        self.send(json!({"type": "move", "player": seat.index(), "z": z, "y": y, "x": x}))
            .await;
    }
}

async fn start() -> (Arc<GameServer>, std::net::SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = GameServer::new();
    tokio::spawn(Arc::clone(&server).run(listener, addr));
    (server, addr)
}

/// Connects two players and consumes their handshake messages.
async fn seated_pair(addr: std::net::SocketAddr) -> (Client, Client) {
    let mut a = Client::connect(addr).await;
    assert!(matches!(a.recv().await, ServerMessage::Init { .. }));
    a.recv_state().await;

    let mut b = Client::connect(addr).await;
    assert!(matches!(b.recv().await, ServerMessage::Init { .. }));
    b.recv_state().await;
    b.recv_state().await;
    a.recv_state().await;
    (a, b)
}

fn cell(cells: &[i8], z: usize, y: usize, x: usize) -> i8 {
    cells[z * 16 + y * 4 + x]
}

#[tokio::test]
async fn test_seats_symbols_and_start_broadcast() {
    let (server, addr) = start().await;

    let mut a = Client::connect(addr).await;
    assert_eq!(
        a.recv().await,
        ServerMessage::Init {
            player_id: Seat::X,
            player_name: "Player 1".into(),
            symbol: "X".into(),
        }
    );
    let (cells, current, over, winner) = a.recv_state().await;
    assert!(cells.iter().all(|c| *c == 0));
    assert_eq!((current, over, winner), (Seat::X, false, None));

    let mut b = Client::connect(addr).await;
    assert_eq!(
        b.recv().await,
        ServerMessage::Init {
            player_id: Seat::O,
            player_name: "Player 2".into(),
            symbol: "O".into(),
        }
    );
    b.recv_state().await;
    // Game start broadcast reaches both.
    b.recv_state().await;
    a.recv_state().await;

    assert_eq!(server.phase().await, GamePhase::InProgress);
    assert_eq!(server.connected().await, 2);
}

#[tokio::test]
async fn test_moves_broadcast_to_both() {
    let (_server, addr) = start().await;
    let (mut a, mut b) = seated_pair(addr).await;

    a.play(Seat::X, 1, 2, 3).await;
    for client in [&mut a, &mut b] {
        let (cells, current, over, _) = client.recv_state().await;
        assert_eq!(cell(&cells, 1, 2, 3), -1);
        assert_eq!(current, Seat::O);
        assert!(!over);
    }
}

#[tokio::test]
async fn test_occupied_cell_error_only_to_sender() {
    let (server, addr) = start().await;
    let (mut a, mut b) = seated_pair(addr).await;

    a.play(Seat::X, 0, 0, 0).await;
    a.recv_state().await;
    b.recv_state().await;

    b.play(Seat::O, 0, 0, 0).await;
    assert!(matches!(b.recv().await, ServerMessage::Error { .. }));
    assert_eq!(server.snapshot().await.current_seat(), Seat::O);

    // The next thing `a` sees is the following accepted move, not a
    // broadcast caused by the rejection.
    b.play(Seat::O, 0, 0, 1).await;
    let (cells, current, _, _) = a.recv_state().await;
    assert_eq!(cell(&cells, 0, 0, 1), 1);
    assert_eq!(current, Seat::X);
    b.recv_state().await;
}

#[tokio::test]
async fn test_out_of_turn_and_malformed_ignored() {
    let (server, addr) = start().await;
    let (mut a, mut b) = seated_pair(addr).await;

    // Messages from one connection are handled in order, so the reset
    // broadcast proves both rejected moves were processed first.
    b.play(Seat::O, 0, 0, 0).await;
    // Claiming the other seat is treated as out of turn.
    b.play(Seat::X, 0, 0, 0).await;
    b.send(json!({"type": "reset"})).await;
    for client in [&mut a, &mut b] {
        let (cells, current, ..) = client.recv_state().await;
        assert!(cells.iter().all(|c| *c == 0));
        assert_eq!(current, Seat::X);
    }

    a.play(Seat::X, 9, 0, 0).await;
    a.send_raw(b"{not json}\n").await;
    a.send(json!({"type": "move", "player": 0})).await;
    a.play(Seat::X, 3, 3, 3).await;
    for client in [&mut a, &mut b] {
        let (cells, current, _, _) = client.recv_state().await;
        assert_eq!(cells.iter().filter(|c| **c != 0).count(), 1);
        assert_eq!(cell(&cells, 3, 3, 3), -1);
        assert_eq!(current, Seat::O);
    }
    assert_eq!(server.connected().await, 2);
}

#[tokio::test]
async fn test_messages_split_across_writes() {
    let (_server, addr) = start().await;
    let (mut a, mut b) = seated_pair(addr).await;

    a.send_raw(br#"{"type":"move","play"#).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    a.send_raw(b"er\":0,\"z\":0,\"y\":0,\"x\":0}\n{\"type\":\"reset\"}\n")
        .await;

    let (cells, ..) = b.recv_state().await;
    assert_eq!(cell(&cells, 0, 0, 0), -1);
    let (cells, current, ..) = b.recv_state().await;
    assert!(cells.iter().all(|c| *c == 0));
    assert_eq!(current, Seat::X);
    a.recv_state().await;
    a.recv_state().await;
}

#[tokio::test]
async fn test_winning_line_ends_game() {
    let (server, addr) = start().await;
    let (mut a, mut b) = seated_pair(addr).await;

    let script = [
        (Seat::X, (0, 0, 0)),
        (Seat::O, (0, 0, 1)),
        (Seat::X, (0, 1, 0)),
        (Seat::O, (2, 2, 2)),
        (Seat::X, (0, 2, 0)),
        (Seat::O, (2, 2, 3)),
        (Seat::X, (0, 3, 0)),
    ];
    let mut last = None;
    for (seat, (z, y, x)) in script {
        let mover = if seat == Seat::X { &mut a } else { &mut b };
        mover.play(seat, z, y, x).await;
        last = Some(a.recv_state().await);
        b.recv_state().await;
    }

    let (_, _, over, winner) = last.unwrap();
    assert!(over);
    assert_eq!(winner, Some(0));
    assert_eq!(server.snapshot().await.status(), Status::Won(Seat::X));
    assert_eq!(server.phase().await, GamePhase::Finished);
}

#[tokio::test]
async fn test_reset_mid_game() {
    let (server, addr) = start().await;
    let (mut a, mut b) = seated_pair(addr).await;

    a.play(Seat::X, 1, 1, 1).await;
    a.recv_state().await;
    b.recv_state().await;

    b.send(json!({"type": "reset"})).await;
    for client in [&mut a, &mut b] {
        let (cells, current, over, winner) = client.recv_state().await;
        assert!(cells.iter().all(|c| *c == 0));
        assert_eq!((current, over, winner), (Seat::X, false, None));
    }
    assert_eq!(server.connected().await, 2);
    assert_eq!(server.phase().await, GamePhase::InProgress);
}

#[tokio::test]
async fn test_disconnect_abandons_game() {
    let (server, addr) = start().await;
    let (mut a, b) = seated_pair(addr).await;

    drop(b);
    let (_, _, over, winner) = a.recv_state().await;
    assert!(over);
    assert_eq!(winner, None);
    assert_eq!(server.snapshot().await.status(), Status::Abandoned);
}

#[tokio::test]
async fn test_explicit_disconnect_frees_seat() {
    let (server, addr) = start().await;
    let (mut a, mut b) = seated_pair(addr).await;

    b.send(json!({"type": "disconnect"})).await;
    let (_, _, over, _) = a.recv_state().await;
    assert!(over);

    // Seats keep alternating per accept: the third connection gets seat 0.
    let mut c = Client::connect(addr).await;
    match c.recv().await {
        ServerMessage::Init { player_id, symbol, .. } => {
            assert_eq!(player_id, Seat::X);
            assert_eq!(symbol, "X");
        }
        other => panic!("expected init, got {other:?}"),
    }
    let (_, _, over, _) = c.recv_state().await;
    assert!(over, "abandoned game stays finished until reset");
    c.recv_state().await;
    a.recv_state().await;
    assert_eq!(server.connected().await, 2);

    c.send(json!({"type": "reset"})).await;
    let (_, _, over, _) = a.recv_state().await;
    assert!(!over);
    c.recv_state().await;
}

#[tokio::test]
async fn test_oversized_line_skipped() {
    let (server, addr) = start().await;
    let (mut a, mut b) = seated_pair(addr).await;

    let mut junk = vec![b'x'; 70 * 1024];
    junk.push(b'\n');
    a.send_raw(&junk).await;
    a.play(Seat::X, 0, 0, 0).await;

    for client in [&mut a, &mut b] {
        let (cells, current, over, _) = client.recv_state().await;
        assert_eq!(cell(&cells, 0, 0, 0), -1);
        assert_eq!(current, Seat::O);
        assert!(!over);
    }
    assert_eq!(server.connected().await, 2);
    assert_eq!(server.phase().await, GamePhase::InProgress);
}

#[tokio::test]
async fn test_peer_that_never_reads_is_evicted() {
    let (server, addr) = start().await;
    let (a, _stalled) = seated_pair(addr).await;

    // Keep the active player's side drained so only the stalled one backs up.
    let Client { mut lines, mut writer } = a;
    let drain = tokio::spawn(async move {
        let mut received = 0usize;
        while let Ok(Some(_)) = lines.next_line().await {
            received += 1;
        }
        received
    });

    let batch = b"{\"type\":\"reset\"}\n".repeat(1000);
    let evicted = timeout(Duration::from_secs(60), async {
        while server.connected().await == 2 {
            writer.write_all(&batch).await.unwrap();
        }
    })
    .await;
    assert!(evicted.is_ok(), "stalled peer was never dropped");
    assert_eq!(server.connected().await, 1);

    writer
        .write_all(b"{\"type\":\"disconnect\"}\n")
        .await
        .unwrap();
    let received = timeout(WAIT * 6, drain).await.unwrap().unwrap();
    assert!(received > 0);
    assert_eq!(server.connected().await, 0);
}
