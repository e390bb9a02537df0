use super::GameServer;
use crate::protocol::{ClientMessage, ConnectionId};

impl GameServer {
    /// Dispatch one decoded inbound message. Exhaustive by construction:
    /// a new `ClientMessage` variant will not compile until it is routed.
    pub async fn handle_client_message(&self, conn_id: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::CreateRoom {
                player_name,
                player_email,
                test_word,
            } => {
                self.handle_create_room(conn_id, player_name, player_email, test_word)
                    .await;
            }
            ClientMessage::CreateDailyChallenge {
                player_name,
                player_email,
                daily_number,
                solo,
                test_word,
            } => {
                self.handle_create_daily_challenge(
                    conn_id,
                    player_name,
                    player_email,
                    daily_number,
                    solo,
                    test_word,
                )
                .await;
            }
            ClientMessage::JoinRoom {
                room_code,
                player_name,
                player_email,
            } => {
                self.handle_join_room(conn_id, room_code, player_name, player_email)
                    .await;
            }
            ClientMessage::LeaveRoom => {
                self.handle_leave_room(conn_id).await;
            }
            ClientMessage::SetGameMode { mode } => {
                self.handle_set_game_mode(conn_id, mode).await;
            }
            ClientMessage::SetWordMode { mode } => {
                self.handle_set_word_mode(conn_id, mode).await;
            }
            ClientMessage::SetHardMode { enabled } => {
                self.handle_set_hard_mode(conn_id, enabled).await;
            }
            ClientMessage::SetRoomVisibility { visibility } => {
                self.handle_set_room_visibility(conn_id, visibility).await;
            }
            ClientMessage::SetReady { ready } => {
                self.handle_set_ready(conn_id, ready).await;
            }
            ClientMessage::StartGame => {
                self.handle_start_game(conn_id).await;
            }
            ClientMessage::Guess { word, forced } => {
                self.handle_guess(conn_id, word, forced).await;
            }
            ClientMessage::SubmitWord { word } => {
                self.handle_submit_word(conn_id, word).await;
            }
            ClientMessage::PlayAgain => {
                self.handle_play_again(conn_id).await;
            }
            ClientMessage::Rejoin {
                room_code,
                player_id,
            } => {
                self.handle_rejoin(conn_id, room_code, player_id).await;
            }
            ClientMessage::SubscribeLobby => {
                self.handle_subscribe_lobby(conn_id).await;
            }
            ClientMessage::UnsubscribeLobby => {
                self.handle_unsubscribe_lobby(conn_id);
            }
        }
    }
}
