//! Authoritative table state and the rules that change it.
//!
//! [`Board`] knows nothing about connections or channels. The room actor
//! feeds it one command at a time together with the sender's username and
//! fans the returned event out according to its [`Scope`].

use std::collections::{BTreeMap, HashMap};

use planeboard_protocol::{
    BoardCard, BoardSnapshot, Card, CardSource, CardTransfer, ClientMessage,
    Counter, Deck, DeckInsertion, DiceRoller, Seat, ServerMessage,
};
use rand::seq::SliceRandom;

use crate::seat;
use crate::ResolvedDeck;

/// Who receives the event produced by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every member and spectator, the sender included.
    All,
    /// Everyone except the sender.
    Others,
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    Top,
    Bottom,
    Shuffle,
}

/// The shared table of one room.
#[derive(Debug, Clone, Default)]
pub struct Board {
    starting_life: i32,
    positions: BTreeMap<String, Seat>,
    decks: BTreeMap<String, Deck>,
    deck_urls: HashMap<String, String>,
    cards: BTreeMap<String, BoardCard>,
    counters: BTreeMap<String, Counter>,
    dice_rollers: BTreeMap<String, DiceRoller>,
    hand_sizes: BTreeMap<String, u32>,
    life_totals: BTreeMap<String, i32>,
    turn: String,
}

impl Board {
    /// An empty table whose players start at `starting_life`.
    pub fn new(starting_life: i32) -> Self {
        Self {
            starting_life,
            ..Self::default()
        }
    }

    pub fn player_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_seated(&self, username: &str) -> bool {
        self.positions.contains_key(username)
    }

    /// Username of the active player, empty when nobody holds the turn.
    pub fn turn(&self) -> &str {
        &self.turn
    }

    pub fn positions(&self) -> &BTreeMap<String, Seat> {
        &self.positions
    }

    pub fn deck(&self, username: &str) -> Option<&Deck> {
        self.decks.get(username)
    }

    pub fn deck_url(&self, username: &str) -> Option<&str> {
        self.deck_urls.get(username).map(String::as_str)
    }

    pub fn hand_size(&self, username: &str) -> Option<u32> {
        self.hand_sizes.get(username).copied()
    }

    pub fn life_total(&self, username: &str) -> Option<i32> {
        self.life_totals.get(username).copied()
    }

    pub fn card(&self, id: &str) -> Option<&BoardCard> {
        self.cards.get(id)
    }

    pub fn counter(&self, id: &str) -> Option<&Counter> {
        self.counters.get(id)
    }

    pub fn dice_roller(&self, id: &str) -> Option<&DiceRoller> {
        self.dice_rollers.get(id)
    }

    pub fn decks(&self) -> Vec<Deck> {
        self.decks.values().cloned().collect()
    }

    pub fn life_totals(&self) -> &BTreeMap<String, i32> {
        &self.life_totals
    }

    /// Seats `username` at the first free seat with a freshly resolved
    /// deck. Returns the commander cards placed on the board, or `None`
    /// when every seat is taken.
    pub fn seat_player(
        &mut self,
        username: &str,
        deck_url: &str,
        resolved: ResolvedDeck,
    ) -> Option<Vec<BoardCard>> {
        let seat = seat::free_seat(&self.positions)?;
        let (x, y) = seat::deck_origin(seat);

        let commanders: Vec<BoardCard> = resolved
            .commanders
            .iter()
            .enumerate()
            .map(|(i, card)| {
                let (cx, cy) = seat::commander_position(seat, i);
                BoardCard::from_card(card, cx, cy, username)
            })
            .collect();
        for card in &commanders {
            self.cards.insert(card.id.clone(), card.clone());
        }

        self.decks.insert(
            username.to_string(),
            Deck {
                id: username.to_string(),
                x,
                y,
                cards: resolved.library,
                commanders: resolved.commanders,
            },
        );
        self.deck_urls
            .insert(username.to_string(), deck_url.to_string());
        self.positions.insert(username.to_string(), seat);
        self.hand_sizes.insert(username.to_string(), 0);
        self.life_totals
            .insert(username.to_string(), self.starting_life);
        if self.turn.is_empty() {
            self.turn = username.to_string();
        }
        Some(commanders)
    }

    /// Removes every trace of `username`: seat, deck, hand, life and the
    /// cards they own. The turn moves on if they held it. Returns `false`
    /// if they were not seated.
    pub fn remove_player(&mut self, username: &str) -> bool {
        let Some(seat) = self.positions.remove(username) else {
            return false;
        };
        self.decks.remove(username);
        self.deck_urls.remove(username);
        self.hand_sizes.remove(username);
        self.life_totals.remove(username);
        self.cards.retain(|_, card| card.owner != username);
        if self.turn == username {
            self.turn = seat::next_turn(&self.positions, Some(seat));
        }
        true
    }

    /// Full state for a newly joined connection.
    pub fn snapshot(
        &self,
        users: Vec<String>,
        spectators: Vec<String>,
    ) -> BoardSnapshot {
        BoardSnapshot {
            cards: self.cards.values().cloned().collect(),
            decks: self.decks(),
            users,
            spectators,
            positions: self.positions.clone(),
            hand_sizes: self.hand_sizes.clone(),
            life_totals: self.life_totals.clone(),
            turn: self.turn.clone(),
            counters: self.counters.values().cloned().collect(),
            dice_rollers: self.dice_rollers.values().cloned().collect(),
        }
    }

    /// Applies one command from the seated player `sender`.
    ///
    /// Returns the event to broadcast, or `None` when the command changes
    /// nothing (an empty draw, a command naming a library that does not
    /// exist, `JOIN`, unknown types).
    pub fn apply(
        &mut self,
        sender: &str,
        msg: ClientMessage,
    ) -> Option<(Scope, ServerMessage)> {
        let event = match msg {
            ClientMessage::Join { .. } | ClientMessage::Unknown => return None,

            ClientMessage::DrawCard => {
                let deck = self.decks.get_mut(sender)?;
                if deck.cards.is_empty() {
                    return None;
                }
                deck.cards.remove(0);
                let hand_size = self.grow_hand(sender);
                ServerMessage::PlayerDrewCard {
                    player: sender.to_string(),
                    hand_size,
                }
            }

            ClientMessage::CardPlayedFromHand { mut card } => {
                card.owner = sender.to_string();
                self.cards.insert(card.id.clone(), card.clone());
                let hand_size = self.shrink_hand(sender);
                ServerMessage::CardPlayedFromHand {
                    card,
                    player: sender.to_string(),
                    hand_size,
                }
            }

            ClientMessage::CardPlayedFromLibrary { mut card, username } => {
                let player = or_sender(username, sender);
                self.take_from_library(&player, &card.id);
                card.owner = player.clone();
                self.cards.insert(card.id.clone(), card.clone());
                ServerMessage::CardPlayedFromLibrary { card, player }
            }

            ClientMessage::TapCard { id, tapped } => {
                self.card_mut(&id).tapped = tapped;
                ServerMessage::CardTapped { id, tapped }
            }

            ClientMessage::FlipCard { id, flip_index } => {
                self.card_mut(&id).flip_index = flip_index;
                ServerMessage::CardFlipped { id, flip_index }
            }

            ClientMessage::MoveCard {
                id,
                x,
                y,
                flip_index,
            } => {
                let card = self.card_mut(&id);
                card.x = x;
                card.y = y;
                if let Some(flip) = flip_index {
                    card.flip_index = flip;
                }
                ServerMessage::MoveCard {
                    id,
                    x,
                    y,
                    flip_index,
                }
            }

            ClientMessage::SpawnToken { mut card } => {
                if card.owner.is_empty() {
                    card.owner = sender.to_string();
                }
                self.cards.insert(card.id.clone(), card.clone());
                ServerMessage::TokenSpawned { card }
            }

            ClientMessage::TutorToHand { id, username } => {
                let player = or_sender(username, sender);
                self.take_from_library(&player, &id);
                let hand_size = self.grow_hand(&player);
                ServerMessage::TutoredToHand {
                    id,
                    player,
                    hand_size,
                }
            }

            ClientMessage::ReturnToHand { id, username } => {
                let removed = self.cards.remove(&id);
                let player = if !username.is_empty() {
                    username
                } else {
                    removed
                        .map(|card| card.owner)
                        .filter(|owner| !owner.is_empty())
                        .unwrap_or_else(|| sender.to_string())
                };
                let hand_size = self.grow_hand(&player);
                ServerMessage::ReturnToHand {
                    id,
                    player,
                    hand_size,
                }
            }

            ClientMessage::CardToTopOfDeck(transfer) => {
                let insertion =
                    self.put_in_library(sender, transfer, Placement::Top)?;
                ServerMessage::CardToTopOfDeck(insertion)
            }

            ClientMessage::CardToBottomOfDeck(transfer) => {
                let insertion =
                    self.put_in_library(sender, transfer, Placement::Bottom)?;
                ServerMessage::CardToBottomOfDeck(insertion)
            }

            ClientMessage::CardToShuffleInDeck(transfer) => {
                let insertion =
                    self.put_in_library(sender, transfer, Placement::Shuffle)?;
                return Some((
                    Scope::All,
                    ServerMessage::CardToShuffleInDeck(insertion),
                ));
            }

            ClientMessage::LifeTotalChange {
                username,
                life_total,
            } => {
                let life_total = life_total?;
                let player = or_sender(username, sender);
                *self.life_totals.get_mut(&player)? = life_total;
                ServerMessage::LifeTotalUpdated { player, life_total }
            }

            ClientMessage::PassTurn => {
                let from = self.positions.get(&self.turn).copied();
                self.turn = seat::next_turn(&self.positions, from);
                return Some((
                    Scope::All,
                    ServerMessage::TurnPassed {
                        turn: self.turn.clone(),
                    },
                ));
            }

            ClientMessage::UntapAll => {
                self.cards
                    .values_mut()
                    .filter(|card| card.owner == sender)
                    .for_each(|card| card.tapped = false);
                ServerMessage::UntappedAll {
                    player: sender.to_string(),
                }
            }

            ClientMessage::AddCounter { mut counters } => {
                if counters.is_empty() {
                    return None;
                }
                for counter in &mut counters {
                    if counter.owner.is_empty() {
                        counter.owner = sender.to_string();
                    }
                    self.counters.insert(counter.id.clone(), counter.clone());
                }
                ServerMessage::CounterAdded { counters }
            }

            ClientMessage::MoveCounter { id, x, y } => {
                let counter = self.counter_mut(&id);
                counter.x = x;
                counter.y = y;
                ServerMessage::CounterMoved { id, x, y }
            }

            ClientMessage::UpdateCounter { id, count } => {
                self.counter_mut(&id).count = count;
                ServerMessage::CounterUpdated { id, count }
            }

            ClientMessage::DeleteCounter { id } => {
                self.counters.remove(&id);
                ServerMessage::CounterDeleted { id }
            }

            ClientMessage::AddDiceRoller(roller) => {
                self.dice_rollers.insert(roller.id.clone(), roller.clone());
                ServerMessage::DiceRollerAdded(roller)
            }

            ClientMessage::MoveDiceRoller { id, x, y } => {
                let roller = self
                    .dice_rollers
                    .entry(id.clone())
                    .or_insert_with(|| DiceRoller {
                        id: id.clone(),
                        ..DiceRoller::default()
                    });
                roller.x = x;
                roller.y = y;
                ServerMessage::DiceRollerMoved { id, x, y }
            }

            ClientMessage::DeleteDiceRoller { id } => {
                self.dice_rollers.remove(&id);
                ServerMessage::DiceRollerDeleted { id }
            }

            ClientMessage::ScryResolved { deck } => {
                let deck = self.replace_library(sender, deck, &[])?;
                ServerMessage::ScryResolved {
                    player: sender.to_string(),
                    deck,
                }
            }

            ClientMessage::SurveilResolved { deck, cards } => {
                let deck = self.replace_library(sender, deck, &cards)?;
                ServerMessage::SurveilResolved {
                    player: sender.to_string(),
                    deck,
                    graveyard: cards,
                }
            }
        };
        Some((Scope::Others, event))
    }

    fn card_mut(&mut self, id: &str) -> &mut BoardCard {
        self.cards
            .entry(id.to_string())
            .or_insert_with(|| BoardCard::placeholder(id))
    }

    fn counter_mut(&mut self, id: &str) -> &mut Counter {
        self.counters
            .entry(id.to_string())
            .or_insert_with(|| Counter {
                id: id.to_string(),
                ..Counter::default()
            })
    }

    fn grow_hand(&mut self, player: &str) -> u32 {
        match self.hand_sizes.get_mut(player) {
            Some(size) => {
                *size = size.saturating_add(1);
                *size
            }
            None => 0,
        }
    }

    fn shrink_hand(&mut self, player: &str) -> u32 {
        match self.hand_sizes.get_mut(player) {
            Some(size) => {
                *size = size.saturating_sub(1);
                *size
            }
            None => 0,
        }
    }

    fn take_from_library(&mut self, player: &str, card_id: &str) -> Option<Card> {
        let deck = self.decks.get_mut(player)?;
        let pos = deck.cards.iter().position(|c| c.id == card_id)?;
        Some(deck.cards.remove(pos))
    }

    fn put_in_library(
        &mut self,
        sender: &str,
        transfer: CardTransfer,
        placement: Placement,
    ) -> Option<DeckInsertion> {
        let CardTransfer {
            id,
            username,
            source,
            card,
        } = transfer;

        let board_owner = match source {
            CardSource::Board => self
                .cards
                .get(&id)
                .map(|c| c.owner.clone())
                .filter(|owner| !owner.is_empty()),
            CardSource::Hand => None,
        };
        let player = if !username.is_empty() {
            username
        } else {
            board_owner.unwrap_or_else(|| sender.to_string())
        };
        if !self.decks.contains_key(&player) {
            tracing::debug!(%player, card_id = %id, "no library to put card into");
            return None;
        }

        let on_board = match source {
            CardSource::Board => self.cards.remove(&id),
            CardSource::Hand => {
                self.shrink_hand(sender);
                None
            }
        };
        let card = on_board
            .or(card)
            .unwrap_or_else(|| BoardCard::placeholder(&id));
        let card = Card::from(&card);

        let deck = self.decks.get_mut(&player)?;
        match placement {
            Placement::Top => deck.cards.insert(0, card),
            Placement::Bottom => deck.cards.push(card),
            Placement::Shuffle => {
                deck.cards.push(card);
                deck.cards.shuffle(&mut rand::rng());
            }
        }
        let reshuffled = matches!(placement, Placement::Shuffle).then(|| deck.clone());

        Some(DeckInsertion {
            id,
            player,
            source,
            from: sender.to_string(),
            hand_size: self.hand_size(sender).unwrap_or(0),
            deck: reshuffled,
        })
    }

    /// Swaps in a client-reordered library for `player`. `removed` are
    /// cards the client reports as having left the library.
    fn replace_library(
        &mut self,
        player: &str,
        mut submitted: Deck,
        removed: &[BoardCard],
    ) -> Option<Deck> {
        let current = self.decks.get_mut(player)?;

        let mut before: Vec<&str> =
            current.cards.iter().map(|c| c.id.as_str()).collect();
        let mut after: Vec<&str> = submitted
            .cards
            .iter()
            .map(|c| c.id.as_str())
            .chain(removed.iter().map(|c| c.id.as_str()))
            .collect();
        before.sort_unstable();
        after.sort_unstable();
        if before != after {
            tracing::debug!(
                %player,
                before = before.len(),
                after = after.len(),
                "submitted library does not match the stored one"
            );
        }

        submitted.id = player.to_string();
        *current = submitted.clone();
        Some(submitted)
    }
}

fn or_sender(username: String, sender: &str) -> String {
    if username.is_empty() {
        sender.to_string()
    } else {
        username
    }
}
