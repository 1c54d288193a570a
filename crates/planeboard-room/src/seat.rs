//! Seat geometry and turn rotation.
//!
//! The table is centered on the origin. Each seat's library sits in its
//! own quadrant, and commanders are laid out in a row beside it, growing
//! away from the table's vertical axis.

use std::collections::BTreeMap;

use planeboard_protocol::Seat;

const DECK_WIDTH: f64 = 60.0;
const DECK_HEIGHT: f64 = 90.0;
const DECK_X_OFFSET: f64 = 50.0;
const DECK_Y_OFFSET: f64 = 175.0;
const COMMANDER_Y_OFFSET: f64 = 100.0;
const COMMANDER_SPACING: f64 = 70.0;

/// Top-left corner of the library for a player in `seat`.
pub fn deck_origin(seat: Seat) -> (f64, f64) {
    let x = if seat.is_right() {
        DECK_X_OFFSET
    } else {
        -DECK_X_OFFSET
    };
    let y = if seat.is_top() {
        -DECK_Y_OFFSET
    } else {
        DECK_Y_OFFSET
    };
    (x - DECK_WIDTH / 2.0, y - DECK_HEIGHT / 2.0)
}

/// Board position of the `index`-th commander for a player in `seat`.
///
/// Commanders sit one row closer to the middle of the table than the
/// library.
pub fn commander_position(seat: Seat, index: usize) -> (f64, f64) {
    let (deck_x, deck_y) = deck_origin(seat);
    let step = if seat.is_right() { 1.0 } else { -1.0 };
    let row = if seat.is_top() {
        COMMANDER_Y_OFFSET
    } else {
        -COMMANDER_Y_OFFSET
    };
    (deck_x + step * index as f64 * COMMANDER_SPACING, deck_y + row)
}

/// The first unoccupied seat in assignment order.
pub fn free_seat(positions: &BTreeMap<String, Seat>) -> Option<Seat> {
    Seat::ASSIGNMENT_ORDER
        .into_iter()
        .find(|seat| !positions.values().any(|taken| taken == seat))
}

/// Who holds the turn after the player in `from`.
///
/// Walks the seat order from `from` (or from just before the first seat when
/// `from` is `None`) and returns the first occupied seat, which can be
/// `from` itself when that player sits alone. Empty when nobody is
/// seated.
pub fn next_turn(positions: &BTreeMap<String, Seat>, from: Option<Seat>) -> String {
    let order = Seat::ASSIGNMENT_ORDER;
    let start = from
        .and_then(|seat| order.iter().position(|s| *s == seat))
        .unwrap_or(order.len() - 1);

    (1..=order.len())
        .map(|step| order[(start + step) % order.len()])
        .find_map(|seat| {
            positions
                .iter()
                .find(|(_, taken)| **taken == seat)
                .map(|(player, _)| player.clone())
        })
        .unwrap_or_default()
}
