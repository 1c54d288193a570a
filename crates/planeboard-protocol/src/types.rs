//! Board types that travel on the wire.
//!
//! Everything here is plain data: what a card looks like, where a deck
//! sits, which seat a player occupies. The rules that mutate these values
//! live in the room crate.
//!
//! Field names are camelCase in JSON because the table client is a
//! browser app.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The identifier of a room (one live game session).
///
/// Rooms are named by the clients themselves (the `room` query parameter),
/// so this wraps a string rather than a generated number. `transparent`
/// makes `RoomId("R1")` serialize as plain `"R1"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Returns the room name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Seat
// ---------------------------------------------------------------------------

/// One of the four fixed positions around the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Seat {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Seat {
    /// Seats in the order they are handed out to joining players. The
    /// turn travels around the table in the same order.
    pub const ASSIGNMENT_ORDER: [Seat; 4] = [
        Seat::TopLeft,
        Seat::TopRight,
        Seat::BottomLeft,
        Seat::BottomRight,
    ];

    /// `true` for the two seats on the upper edge of the table.
    pub fn is_top(self) -> bool {
        matches!(self, Seat::TopLeft | Seat::TopRight)
    }

    /// `true` for the two seats on the right-hand side of the table.
    pub fn is_right(self) -> bool {
        matches!(self, Seat::TopRight | Seat::BottomRight)
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Seat::TopLeft => "topLeft",
            Seat::TopRight => "topRight",
            Seat::BottomLeft => "bottomLeft",
            Seat::BottomRight => "bottomRight",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// A card in a library or commander list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Card {
    /// Unique per physical copy (two copies of a card get two ids).
    pub id: String,
    pub name: String,
    /// Front face image.
    pub image_url: String,
    /// Back face image, for double-faced cards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back_image_url: Option<String>,
    /// Whether this card can create tokens.
    pub has_tokens: bool,
}

/// A card instance on the shared board.
///
/// Every field defaults, so a command that names an unknown card id can
/// materialize a `BoardCard` with nothing but that id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoardCard {
    pub id: String,
    pub name: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back_image_url: Option<String>,
    pub has_tokens: bool,
    pub x: f64,
    pub y: f64,
    /// Username of the controlling player.
    pub owner: String,
    pub tapped: bool,
    /// Which face is showing (0 = front).
    pub flip_index: u32,
}

impl BoardCard {
    /// A default-valued card carrying only `id`.
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    /// Places `card` on the board at `(x, y)` under `owner`.
    pub fn from_card(card: &Card, x: f64, y: f64, owner: &str) -> Self {
        Self {
            id: card.id.clone(),
            name: card.name.clone(),
            image_url: card.image_url.clone(),
            back_image_url: card.back_image_url.clone(),
            has_tokens: card.has_tokens,
            x,
            y,
            owner: owner.to_string(),
            tapped: false,
            flip_index: 0,
        }
    }
}

impl From<&BoardCard> for Card {
    fn from(bc: &BoardCard) -> Self {
        Self {
            id: bc.id.clone(),
            name: bc.name.clone(),
            image_url: bc.image_url.clone(),
            back_image_url: bc.back_image_url.clone(),
            has_tokens: bc.has_tokens,
        }
    }
}

/// A player's library plus the commanders that started on the board.
///
/// `cards[0]` is the top of the library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Deck {
    /// The owning player's username.
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub cards: Vec<Card>,
    pub commanders: Vec<Card>,
}

/// Where a card came from when it is put back into a library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSource {
    #[default]
    Board,
    Hand,
}

// ---------------------------------------------------------------------------
// Board annotations
// ---------------------------------------------------------------------------

/// A free-floating numeric marker on the board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Counter {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub count: i64,
    pub owner: String,
}

/// A dice widget on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiceRoller {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub num_dice: u32,
    pub num_sides: u32,
}

impl Default for DiceRoller {
    fn default() -> Self {
        Self {
            id: String::new(),
            x: 0.0,
            y: 0.0,
            num_dice: 1,
            num_sides: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomId::from("R1")).unwrap();
        assert_eq!(json, r#""R1""#);
        assert_eq!(RoomId::from("R1").to_string(), "R1");
    }

    #[test]
    fn test_seat_serializes_as_camel_case() {
        let json = serde_json::to_string(&Seat::BottomRight).unwrap();
        assert_eq!(json, r#""bottomRight""#);
        assert_eq!(Seat::BottomRight.to_string(), "bottomRight");
    }

    #[test]
    fn test_seat_sides() {
        assert!(Seat::TopLeft.is_top());
        assert!(!Seat::BottomLeft.is_top());
        assert!(Seat::TopRight.is_right());
        assert!(!Seat::TopLeft.is_right());
    }

    #[test]
    fn test_board_card_fields_all_default() {
        // A client may send only part of a card.
        let card: BoardCard =
            serde_json::from_str(r#"{"id":"c1","x":5}"#).unwrap();
        assert_eq!(card.id, "c1");
        assert_eq!(card.x, 5.0);
        assert_eq!(card.owner, "");
        assert!(!card.tapped);
    }

    #[test]
    fn test_board_card_uses_camel_case_and_skips_missing_back() {
        let card = BoardCard {
            image_url: "front.png".into(),
            flip_index: 1,
            ..BoardCard::placeholder("c1")
        };
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["imageUrl"], "front.png");
        assert_eq!(json["flipIndex"], 1);
        assert!(json.get("backImageUrl").is_none());
    }

    #[test]
    fn test_from_card_places_untapped_front_face() {
        let card = Card {
            id: "42-deadbeef".into(),
            name: "Sol Ring".into(),
            image_url: "ring.png".into(),
            back_image_url: None,
            has_tokens: false,
        };
        let bc = BoardCard::from_card(&card, 10.0, -20.0, "alice");
        assert_eq!(bc.owner, "alice");
        assert_eq!((bc.x, bc.y), (10.0, -20.0));
        assert!(!bc.tapped);
        assert_eq!(Card::from(&bc), card);
    }

    #[test]
    fn test_card_source_is_lowercase() {
        let src: CardSource = serde_json::from_str(r#""hand""#).unwrap();
        assert_eq!(src, CardSource::Hand);
        assert_eq!(CardSource::default(), CardSource::Board);
    }

    #[test]
    fn test_dice_roller_defaults_to_one_six_sided_die() {
        let roller: DiceRoller =
            serde_json::from_str(r#"{"id":"d1"}"#).unwrap();
        assert_eq!(roller.num_dice, 1);
        assert_eq!(roller.num_sides, 6);
    }
}
