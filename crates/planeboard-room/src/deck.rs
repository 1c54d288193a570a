//! Deck resolution seam.
//!
//! Rooms never fetch decks themselves. A [`DeckResolver`] turns the URL a
//! player joined with into cards, off the room's task, and the result is
//! fed back into the room as a command.

use std::future::Future;

use planeboard_protocol::Card;

use crate::DeckError;

/// The cards a deck URL resolved to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedDeck {
    /// The library, already shuffled. `library[0]` is the top card.
    pub library: Vec<Card>,
    /// Cards that start on the board next to the library.
    pub commanders: Vec<Card>,
}

/// Turns a deck URL into cards.
pub trait DeckResolver: Send + Sync + 'static {
    /// Resolves `deck_url`. May take as long as a network round trip.
    fn resolve(
        &self,
        deck_url: &str,
    ) -> impl Future<Output = Result<ResolvedDeck, DeckError>> + Send;
}
