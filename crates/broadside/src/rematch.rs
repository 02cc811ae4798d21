//! The post-match question: do both players want another game?

use std::time::Duration;

use broadside_protocol::FrameType;
use broadside_transport::{Connection, Received};

pub const REMATCH_PROMPT: &str = "Do you want to play again? (y/n):";
pub const REMATCH_INVALID: &str = "Invalid input. Please enter 'y', 'yes', 'n', or 'no'.";
pub const REMATCH_DECLINED: &str = "Game over. A player has chosen not to play again.";

/// Asks both players at once. `true` only if both say yes.
pub(crate) async fn offer_rematch(players: [&Connection; 2], wait: Duration) -> bool {
    let [first, second] = players;
    let (first, second) = tokio::join!(ask_rematch(first, wait), ask_rematch(second, wait));
    first && second
}

/// Asks one player until they give a yes or no answer. Silence, a closed
/// connection, or a failed send all count as no.
///
/// Each prompt gets its own `wait`.
pub(crate) async fn ask_rematch(conn: &Connection, wait: Duration) -> bool {
    loop {
        if conn.send_frame(FrameType::Prompt, REMATCH_PROMPT).await.is_err() {
            return false;
        }
        let answer = loop {
            match conn.recv_frame(wait).await {
                Received::Frame(frame) => break frame.text().trim().to_ascii_lowercase(),
                Received::Corrupt(e) => {
                    tracing::debug!(conn_id = %conn.id(), error = %e, "corrupt frame ignored");
                }
                Received::TimedOut | Received::Closed | Received::Reset => return false,
            }
        };
        match answer.as_str() {
            "y" | "yes" => return true,
            "n" | "no" => return false,
            _ => {
                if conn.send_frame(FrameType::System, REMATCH_INVALID).await.is_err() {
                    return false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broadside_protocol::FrameCodec;

    fn pair() -> (Connection, Connection) {
        let (server, client) = tokio::io::duplex(1 << 16);
        (
            Connection::from_stream(server, FrameCodec::default(), "player"),
            Connection::from_stream(client, FrameCodec::default(), "client"),
        )
    }

    async fn next_text(conn: &Connection) -> String {
        conn.recv_frame(Duration::from_secs(5))
            .await
            .into_frame()
            .unwrap()
            .text()
            .into_owned()
    }

    const WAIT: Duration = Duration::from_secs(30);

    // =========================================================================
    // ask_rematch
    // =========================================================================

    #[tokio::test]
    async fn test_ask_rematch_yes_and_no() {
        let (server, client) = pair();
        client.send_frame(FrameType::Game, " Yes ").await.unwrap();
        assert!(ask_rematch(&server, WAIT).await);
        assert_eq!(next_text(&client).await, REMATCH_PROMPT);

        client.send_frame(FrameType::Game, "n").await.unwrap();
        assert!(!ask_rematch(&server, WAIT).await);
    }

    #[tokio::test]
    async fn test_ask_rematch_invalid_answer_asks_again() {
        let (server, client) = pair();
        client.send_frame(FrameType::Game, "maybe").await.unwrap();
        client.send_frame(FrameType::Game, "y").await.unwrap();

        assert!(ask_rematch(&server, WAIT).await);
        assert_eq!(next_text(&client).await, REMATCH_PROMPT);
        assert_eq!(next_text(&client).await, REMATCH_INVALID);
        assert_eq!(next_text(&client).await, REMATCH_PROMPT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ask_rematch_silence_is_no() {
        let (server, _client) = pair();
        assert!(!ask_rematch(&server, WAIT).await);
    }

    #[tokio::test]
    async fn test_ask_rematch_closed_connection_is_no() {
        let (server, client) = pair();
        drop(client);
        assert!(!ask_rematch(&server, WAIT).await);
    }

    // =========================================================================
    // offer_rematch
    // =========================================================================

    #[tokio::test]
    async fn test_offer_rematch_needs_both() {
        let (one, one_client) = pair();
        let (two, two_client) = pair();
        one_client.send_frame(FrameType::Game, "yes").await.unwrap();
        two_client.send_frame(FrameType::Game, "y").await.unwrap();
        assert!(offer_rematch([&one, &two], WAIT).await);

        one_client.send_frame(FrameType::Game, "yes").await.unwrap();
        two_client.send_frame(FrameType::Game, "no").await.unwrap();
        assert!(!offer_rematch([&one, &two], WAIT).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offer_rematch_one_silent_player_is_no() {
        let (one, one_client) = pair();
        let (two, _two_client) = pair();
        one_client.send_frame(FrameType::Game, "y").await.unwrap();
        assert!(!offer_rematch([&one, &two], WAIT).await);
    }
}
