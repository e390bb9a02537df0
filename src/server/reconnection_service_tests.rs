use super::test_support::*;
use crate::protocol::{ClientMessage, LetterMark, ServerMessage};
use crate::room::ConnectionStatus;

#[tokio::test]
async fn disconnect_holds_the_seat_and_notifies_the_room() {
    let server = test_server();
    let (host_conn, mut host_rx, host_id, code) = create_room(&server, "Host", Some("CRANE")).await;
    let (guest_conn, mut guest_rx, guest_id) = join_room(&server, &code, "Guest").await;
    start_two_player_game(&server, host_conn, &mut host_rx, guest_conn, &mut guest_rx).await;

    server.handle_socket_closed(guest_conn).await;

    let msg = recv_until(&mut host_rx, |m| {
        matches!(m, ServerMessage::PlayerDisconnected { .. })
    })
    .await;
    assert!(matches!(
        msg.as_ref(),
        ServerMessage::PlayerDisconnected { player_id } if *player_id == guest_id
    ));

    let room = server.room_by_code(&code).unwrap();
    let room = room.lock().await;
    let guest = &room.players[&guest_id];
    assert_eq!(guest.status, ConnectionStatus::Disconnected);
    assert!(guest.connection.is_none());
    assert!(guest.disconnected_at.is_some());
    assert!(guest.removal_timer.is_some());
    // Game progression is untouched.
    assert_eq!(room.players[&host_id].board.guesses.len(), 0);
    assert_eq!(room.player_count(), 2);
}

#[tokio::test]
async fn rejoin_within_grace_restores_guess_history() {
    let server = test_server();
    let (host_conn, mut host_rx, host_id, code) = create_room(&server, "Host", Some("CRANE")).await;
    let (guest_conn, mut guest_rx, guest_id) = join_room(&server, &code, "Guest").await;
    start_two_player_game(&server, host_conn, &mut host_rx, guest_conn, &mut guest_rx).await;

    // Two guesses before the blip.
    for word in ["SLATE", "BRICK"] {
        server
            .handle_client_message(
                host_conn,
                ClientMessage::Guess {
                    word: word.to_string(),
                    forced: false,
                },
            )
            .await;
        recv_until(&mut host_rx, |m| {
            matches!(m, ServerMessage::GuessResult { .. })
        })
        .await;
    }

    server.handle_socket_closed(host_conn).await;
    recv_until(&mut guest_rx, |m| {
        matches!(m, ServerMessage::PlayerDisconnected { .. })
    })
    .await;

    // Fresh connection, session record in hand.
    let (new_conn, mut new_rx) = server.connect_test_client();
    server
        .handle_client_message(
            new_conn,
            ClientMessage::Rejoin {
                room_code: code.clone(),
                player_id: host_id,
            },
        )
        .await;

    let msg = recv_until(&mut new_rx, |m| matches!(m, ServerMessage::RejoinGame(_))).await;
    match msg.as_ref() {
        ServerMessage::RejoinGame(payload) => {
            assert_eq!(payload.guesses, vec!["SLATE".to_string(), "BRICK".to_string()]);
            assert_eq!(payload.results.len(), 2);
            assert!(!payload.finished);
            assert_eq!(payload.opponents.len(), 1);
            assert_eq!(payload.opponents[0].player_id, guest_id);
        }
        _ => unreachable!(),
    }

    let msg = recv_until(&mut guest_rx, |m| {
        matches!(m, ServerMessage::PlayerReconnected { .. })
    })
    .await;
    assert!(matches!(
        msg.as_ref(),
        ServerMessage::PlayerReconnected { player_id } if *player_id == host_id
    ));

    // The grace timer is gone and the seat is live again.
    let room = server.room_by_code(&code).unwrap();
    let room = room.lock().await;
    let host = &room.players[&host_id];
    assert_eq!(host.status, ConnectionStatus::Connected);
    assert!(host.removal_timer.is_none());
}

#[tokio::test]
async fn second_connection_evicts_the_first() {
    let server = test_server();
    let (host_conn, mut host_rx, host_id, code) = create_room(&server, "Host", None).await;

    // Same player id from another tab; the old connection is told why.
    let (second_conn, mut second_rx) = server.connect_test_client();
    server
        .handle_client_message(
            second_conn,
            ClientMessage::Rejoin {
                room_code: code.clone(),
                player_id: host_id,
            },
        )
        .await;

    recv_until(&mut second_rx, |m| {
        matches!(m, ServerMessage::RejoinWaiting(_))
    })
    .await;
    let msg = recv_until(&mut host_rx, |m| {
        matches!(m, ServerMessage::ReplacedByNewConnection)
    })
    .await;
    drop(msg);

    // Only the new connection acts for the player now.
    assert_eq!(server.connections().player_of(second_conn), Some(host_id));
    assert_eq!(server.connections().player_of(host_conn), None);
}

#[tokio::test]
async fn grace_expiry_forfeits_to_the_survivor() {
    let server = test_server();
    let (host_conn, mut host_rx, host_id, code) = create_room(&server, "Host", Some("CRANE")).await;
    let (guest_conn, mut guest_rx, guest_id) = join_room(&server, &code, "Guest").await;
    start_two_player_game(&server, host_conn, &mut host_rx, guest_conn, &mut guest_rx).await;

    // Guest makes one guess, then drops and never comes back.
    server
        .handle_client_message(
            guest_conn,
            ClientMessage::Guess {
                word: "SLATE".to_string(),
                forced: false,
            },
        )
        .await;
    server.handle_socket_closed(guest_conn).await;

    let left = recv_until(&mut host_rx, |m| matches!(m, ServerMessage::PlayerLeft { .. })).await;
    assert!(matches!(
        left.as_ref(),
        ServerMessage::PlayerLeft { player_id } if *player_id == guest_id
    ));

    let ended = recv_until(&mut host_rx, |m| matches!(m, ServerMessage::GameEnded(_))).await;
    match ended.as_ref() {
        ServerMessage::GameEnded(payload) => {
            let host_row = payload
                .results
                .iter()
                .find(|r| r.player_id == host_id)
                .expect("survivor in results");
            assert!(host_row.won, "survivor is declared winner");
            assert_eq!(host_row.position, 1);
            // The disconnector keeps their partial progress.
            let guest_row = payload
                .results
                .iter()
                .find(|r| r.player_id == guest_id)
                .expect("disconnector recorded");
            assert_eq!(guest_row.guesses_used, 1);
            assert!(!guest_row.won);
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn rejoin_after_grace_expiry_fails() {
    let server = test_server();
    let (host_conn, mut host_rx, host_id, code) = create_room(&server, "Host", None).await;
    let (guest_conn, _guest_rx, _guest_id) = join_room(&server, &code, "Guest").await;
    drop(host_rx);

    server.handle_socket_closed(host_conn).await;
    // Grace in the test config is one second.
    tokio::time::sleep(std::time::Duration::from_millis(1_500)).await;

    let (new_conn, mut new_rx) = server.connect_test_client();
    server
        .handle_client_message(
            new_conn,
            ClientMessage::Rejoin {
                room_code: code.clone(),
                player_id: host_id,
            },
        )
        .await;
    let msg = recv_until(&mut new_rx, |m| matches!(m, ServerMessage::RejoinFailed { .. })).await;
    drop(msg);

    // The guest inherited the room meanwhile.
    let room = server.room_by_code(&code).expect("room lives on");
    let room = room.lock().await;
    assert_ne!(room.creator, host_id);
    drop(guest_conn);
}

#[tokio::test]
async fn disconnect_in_waiting_clears_ready_flag() {
    let server = test_server();
    let (host_conn, mut host_rx, _host_id, code) = create_room(&server, "Host", None).await;
    let (guest_conn, _guest_rx, guest_id) = join_room(&server, &code, "Guest").await;
    server
        .handle_client_message(guest_conn, ClientMessage::SetReady { ready: true })
        .await;
    recv_until(&mut host_rx, |m| {
        matches!(m, ServerMessage::PlayerReadyChanged { ready: true, .. })
    })
    .await;

    server.handle_socket_closed(guest_conn).await;
    recv_until(&mut host_rx, |m| {
        matches!(m, ServerMessage::PlayerDisconnected { .. })
    })
    .await;

    let room = server.room_by_code(&code).unwrap();
    let room = room.lock().await;
    assert!(!room.players[&guest_id].ready);
}

#[tokio::test]
async fn rejoin_into_finished_room_returns_results() {
    let server = test_server();
    let (host_conn, mut host_rx, host_id, code) = create_room(&server, "Host", Some("CRANE")).await;
    let (guest_conn, mut guest_rx, _guest_id) = join_room(&server, &code, "Guest").await;
    start_two_player_game(&server, host_conn, &mut host_rx, guest_conn, &mut guest_rx).await;

    for conn in [host_conn, guest_conn] {
        server
            .handle_client_message(
                conn,
                ClientMessage::Guess {
                    word: "CRANE".to_string(),
                    forced: false,
                },
            )
            .await;
    }
    recv_until(&mut host_rx, |m| matches!(m, ServerMessage::GameEnded(_))).await;

    server.handle_socket_closed(host_conn).await;
    recv_until(&mut guest_rx, |m| {
        matches!(m, ServerMessage::PlayerDisconnected { .. })
    })
    .await;

    let (new_conn, mut new_rx) = server.connect_test_client();
    server
        .handle_client_message(
            new_conn,
            ClientMessage::Rejoin {
                room_code: code,
                player_id: host_id,
            },
        )
        .await;
    let msg = recv_until(&mut new_rx, |m| matches!(m, ServerMessage::RejoinResults(_))).await;
    match msg.as_ref() {
        ServerMessage::RejoinResults(payload) => {
            assert_eq!(payload.target_word.as_deref(), Some("CRANE"));
            assert_eq!(payload.results.len(), 2);
            for row in &payload.results {
                assert!(row.won);
                assert_eq!(row.guesses_used, 1);
            }
        }
        _ => unreachable!(),
    }
}

// Grace-preservation invariant at the unit level: a disconnect + rejoin
// cycle leaves the coloring history bit-identical.
#[tokio::test]
async fn grace_preserves_result_vectors_exactly() {
    let server = test_server();
    let (host_conn, mut host_rx, host_id, code) = create_room(&server, "Host", Some("CRANE")).await;
    let (guest_conn, mut guest_rx, _guest_id) = join_room(&server, &code, "Guest").await;
    start_two_player_game(&server, host_conn, &mut host_rx, guest_conn, &mut guest_rx).await;

    server
        .handle_client_message(
            host_conn,
            ClientMessage::Guess {
                word: "TRACE".to_string(),
                forced: false,
            },
        )
        .await;
    recv_until(&mut host_rx, |m| {
        matches!(m, ServerMessage::GuessResult { .. })
    })
    .await;

    let before = {
        let room = server.room_by_code(&code).unwrap();
        let room = room.lock().await;
        room.players[&host_id].board.results.clone()
    };
    assert_eq!(
        before[0],
        [
            LetterMark::Absent,
            LetterMark::Correct,
            LetterMark::Correct,
            LetterMark::Present,
            LetterMark::Correct
        ]
    );

    server.handle_socket_closed(host_conn).await;
    let (new_conn, mut new_rx) = server.connect_test_client();
    server
        .handle_client_message(
            new_conn,
            ClientMessage::Rejoin {
                room_code: code.clone(),
                player_id: host_id,
            },
        )
        .await;
    let msg = recv_until(&mut new_rx, |m| matches!(m, ServerMessage::RejoinGame(_))).await;
    match msg.as_ref() {
        ServerMessage::RejoinGame(payload) => {
            assert_eq!(payload.results, before);
            assert_eq!(payload.guesses, vec!["TRACE".to_string()]);
        }
        _ => unreachable!(),
    }
}
