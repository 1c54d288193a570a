//! Client commands and server events.
//!
//! Every frame is one JSON object whose `type` field names the variant:
//!
//! ```json
//! { "type": "MOVE_CARD", "id": "1234-0a1b2c3d", "x": 120.5, "y": -40 }
//! ```
//!
//! Both enums are closed sets. An inbound frame with a `type` this server
//! does not know decodes to [`ClientMessage::Unknown`] and is ignored by
//! the room; outbound events carry only the fields their type uses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{BoardCard, CardSource, Counter, Deck, DiceRoller, Seat};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A card leaving the board or a hand to go back into a library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardTransfer {
    /// The card being moved.
    pub id: String,
    /// Owner of the target library. Empty means the card's owner, or the
    /// sender when the card is not on the board.
    pub username: String,
    pub source: CardSource,
    /// Card data for cards the server has not seen (e.g. from a hand).
    pub card: Option<BoardCard>,
}

/// A command sent by a table client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Take a seat (or a spectator slot). Missing fields fall back to the
    /// connection's query parameters.
    Join {
        username: Option<String>,
        deck_url: Option<String>,
    },
    DrawCard,
    CardPlayedFromHand {
        card: BoardCard,
    },
    CardPlayedFromLibrary {
        card: BoardCard,
        #[serde(default)]
        username: String,
    },
    TapCard {
        id: String,
        #[serde(default)]
        tapped: bool,
    },
    FlipCard {
        id: String,
        #[serde(default)]
        flip_index: u32,
    },
    MoveCard {
        id: String,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
        flip_index: Option<u32>,
    },
    SpawnToken {
        card: BoardCard,
    },
    TutorToHand {
        id: String,
        #[serde(default)]
        username: String,
    },
    ReturnToHand {
        id: String,
        #[serde(default)]
        username: String,
    },
    CardToTopOfDeck(CardTransfer),
    CardToBottomOfDeck(CardTransfer),
    CardToShuffleInDeck(CardTransfer),
    LifeTotalChange {
        #[serde(default)]
        username: String,
        /// Absolute value. `null` or missing means "no change".
        life_total: Option<i32>,
    },
    PassTurn,
    UntapAll,
    AddCounter {
        #[serde(default)]
        counters: Vec<Counter>,
    },
    MoveCounter {
        id: String,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    UpdateCounter {
        id: String,
        #[serde(default)]
        count: i64,
    },
    DeleteCounter {
        id: String,
    },
    AddDiceRoller(DiceRoller),
    MoveDiceRoller {
        id: String,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    DeleteDiceRoller {
        id: String,
    },
    /// The sender's full library in its new order.
    ScryResolved {
        deck: Deck,
    },
    /// The sender's new library plus the cards sent to the graveyard.
    SurveilResolved {
        deck: Deck,
        #[serde(default)]
        cards: Vec<BoardCard>,
    },
    /// Any `type` this server does not recognize.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// The wire name of this command, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "JOIN",
            Self::DrawCard => "DRAW_CARD",
            Self::CardPlayedFromHand { .. } => "CARD_PLAYED_FROM_HAND",
            Self::CardPlayedFromLibrary { .. } => "CARD_PLAYED_FROM_LIBRARY",
            Self::TapCard { .. } => "TAP_CARD",
            Self::FlipCard { .. } => "FLIP_CARD",
            Self::MoveCard { .. } => "MOVE_CARD",
            Self::SpawnToken { .. } => "SPAWN_TOKEN",
            Self::TutorToHand { .. } => "TUTOR_TO_HAND",
            Self::ReturnToHand { .. } => "RETURN_TO_HAND",
            Self::CardToTopOfDeck(_) => "CARD_TO_TOP_OF_DECK",
            Self::CardToBottomOfDeck(_) => "CARD_TO_BOTTOM_OF_DECK",
            Self::CardToShuffleInDeck(_) => "CARD_TO_SHUFFLE_IN_DECK",
            Self::LifeTotalChange { .. } => "LIFE_TOTAL_CHANGE",
            Self::PassTurn => "PASS_TURN",
            Self::UntapAll => "UNTAP_ALL",
            Self::AddCounter { .. } => "ADD_COUNTER",
            Self::MoveCounter { .. } => "MOVE_COUNTER",
            Self::UpdateCounter { .. } => "UPDATE_COUNTER",
            Self::DeleteCounter { .. } => "DELETE_COUNTER",
            Self::AddDiceRoller(_) => "ADD_DICE_ROLLER",
            Self::MoveDiceRoller { .. } => "MOVE_DICE_ROLLER",
            Self::DeleteDiceRoller { .. } => "DELETE_DICE_ROLLER",
            Self::ScryResolved { .. } => "SCRY_RESOLVED",
            Self::SurveilResolved { .. } => "SURVEIL_RESOLVED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Full room state, sent once to a connection right after it joins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub cards: Vec<BoardCard>,
    pub decks: Vec<Deck>,
    pub users: Vec<String>,
    pub spectators: Vec<String>,
    pub positions: BTreeMap<String, Seat>,
    pub hand_sizes: BTreeMap<String, u32>,
    pub life_totals: BTreeMap<String, i32>,
    /// Username of the active player, empty when nobody holds the turn.
    pub turn: String,
    pub counters: Vec<Counter>,
    pub dice_rollers: Vec<DiceRoller>,
}

/// A card that went back into a library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckInsertion {
    pub id: String,
    /// Owner of the library the card went into.
    pub player: String,
    pub source: CardSource,
    /// Who moved the card.
    pub from: String,
    /// `from`'s hand size after the move.
    pub hand_size: u32,
    /// The reshuffled library, for shuffle-ins only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck: Option<Deck>,
}

/// An event the server pushes to table clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    BoardState(Box<BoardSnapshot>),
    UserJoined {
        /// The username that just joined.
        user: String,
        users: Vec<String>,
        spectators: Vec<String>,
        positions: BTreeMap<String, Seat>,
        decks: Vec<Deck>,
        /// Commander cards placed for the new player.
        commanders: Vec<BoardCard>,
        life_totals: BTreeMap<String, i32>,
        turn: String,
    },
    UserLeft {
        user: String,
        users: Vec<String>,
        spectators: Vec<String>,
        positions: BTreeMap<String, Seat>,
        turn: String,
    },
    PlayerDrewCard {
        player: String,
        hand_size: u32,
    },
    CardPlayedFromHand {
        card: BoardCard,
        player: String,
        hand_size: u32,
    },
    CardPlayedFromLibrary {
        card: BoardCard,
        player: String,
    },
    CardTapped {
        id: String,
        tapped: bool,
    },
    CardFlipped {
        id: String,
        flip_index: u32,
    },
    MoveCard {
        id: String,
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flip_index: Option<u32>,
    },
    TokenSpawned {
        card: BoardCard,
    },
    TutoredToHand {
        id: String,
        player: String,
        hand_size: u32,
    },
    ReturnToHand {
        id: String,
        player: String,
        hand_size: u32,
    },
    CardToTopOfDeck(DeckInsertion),
    CardToBottomOfDeck(DeckInsertion),
    CardToShuffleInDeck(DeckInsertion),
    LifeTotalUpdated {
        player: String,
        life_total: i32,
    },
    TurnPassed {
        turn: String,
    },
    UntappedAll {
        player: String,
    },
    CounterAdded {
        counters: Vec<Counter>,
    },
    CounterMoved {
        id: String,
        x: f64,
        y: f64,
    },
    CounterUpdated {
        id: String,
        count: i64,
    },
    CounterDeleted {
        id: String,
    },
    DiceRollerAdded(DiceRoller),
    DiceRollerMoved {
        id: String,
        x: f64,
        y: f64,
    },
    DiceRollerDeleted {
        id: String,
    },
    ScryResolved {
        player: String,
        deck: Deck,
    },
    SurveilResolved {
        player: String,
        deck: Deck,
        graveyard: Vec<BoardCard>,
    },
    /// Sent only to a connection whose join failed.
    Error {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> ClientMessage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_unit_command_ignores_extra_fields() {
        assert_eq!(
            decode(r#"{"type":"DRAW_CARD","username":"alice"}"#),
            ClientMessage::DrawCard
        );
    }

    #[test]
    fn test_unrecognized_type_decodes_to_unknown() {
        assert_eq!(
            decode(r#"{"type":"SHRUG","id":"x"}"#),
            ClientMessage::Unknown
        );
    }

    #[test]
    fn test_join_fields_are_optional() {
        assert_eq!(
            decode(r#"{"type":"JOIN","deckUrl":"https://archidekt.com/decks/1/x"}"#),
            ClientMessage::Join {
                username: None,
                deck_url: Some("https://archidekt.com/decks/1/x".into()),
            }
        );
    }

    #[test]
    fn test_life_total_null_is_distinct_from_zero() {
        let unset = decode(r#"{"type":"LIFE_TOTAL_CHANGE","username":"a","lifeTotal":null}"#);
        let zero = decode(r#"{"type":"LIFE_TOTAL_CHANGE","username":"a","lifeTotal":0}"#);
        assert!(matches!(unset, ClientMessage::LifeTotalChange { life_total: None, .. }));
        assert!(matches!(zero, ClientMessage::LifeTotalChange { life_total: Some(0), .. }));
    }

    #[test]
    fn test_card_transfer_is_flattened_into_the_frame() {
        let msg = decode(
            r#"{"type":"CARD_TO_BOTTOM_OF_DECK","id":"c1","username":"bob","source":"hand"}"#,
        );
        let ClientMessage::CardToBottomOfDeck(t) = msg else {
            panic!("expected CardToBottomOfDeck, got {msg:?}");
        };
        assert_eq!(t.id, "c1");
        assert_eq!(t.username, "bob");
        assert_eq!(t.source, CardSource::Hand);
        assert!(t.card.is_none());
    }

    #[test]
    fn test_add_dice_roller_reads_flat_fields() {
        let msg = decode(
            r#"{"type":"ADD_DICE_ROLLER","id":"d1","x":3,"y":4,"numDice":2,"numSides":20}"#,
        );
        let ClientMessage::AddDiceRoller(roller) = msg else {
            panic!("expected AddDiceRoller");
        };
        assert_eq!(roller.num_dice, 2);
        assert_eq!(roller.num_sides, 20);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(serde_json::from_str::<ClientMessage>("{not json").is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"id":"no type"}"#).is_err());
    }

    #[test]
    fn test_kind_matches_wire_name() {
        let msg = ClientMessage::CardToShuffleInDeck(CardTransfer::default());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], msg.kind());
    }

    #[test]
    fn test_server_event_shape() {
        let json = serde_json::to_value(ServerMessage::PlayerDrewCard {
            player: "alice".into(),
            hand_size: 1,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type":"PLAYER_DREW_CARD","player":"alice","handSize":1})
        );
    }

    #[test]
    fn test_board_state_fields_sit_beside_type() {
        let json =
            serde_json::to_value(ServerMessage::BoardState(Box::default())).unwrap();
        assert_eq!(json["type"], "BOARD_STATE");
        assert!(json["cards"].is_array());
        assert!(json["handSizes"].is_object());
        assert_eq!(json["turn"], "");
    }

    #[test]
    fn test_move_card_omits_absent_flip_index() {
        let json = serde_json::to_value(ServerMessage::MoveCard {
            id: "c1".into(),
            x: 1.0,
            y: 2.0,
            flip_index: None,
        })
        .unwrap();
        assert!(json.get("flipIndex").is_none());
    }

    #[test]
    fn test_shuffle_event_name() {
        let json = serde_json::to_value(ServerMessage::CardToShuffleInDeck(
            DeckInsertion {
                id: "c1".into(),
                player: "bob".into(),
                source: CardSource::Board,
                from: "bob".into(),
                hand_size: 0,
                deck: Some(Deck::default()),
            },
        ))
        .unwrap();
        assert_eq!(json["type"], "CARD_TO_SHUFFLE_IN_DECK");
        assert!(json["deck"].is_object());
    }
}
