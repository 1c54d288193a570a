//! Deck import from Archidekt.
//!
//! Players join with the URL of a public Archidekt deck page. The deck is
//! fetched from Archidekt's JSON API and every copy of every card becomes
//! its own [`Card`], with artwork served by Scryfall.

use std::time::Duration;

use planeboard_protocol::Card;
use planeboard_room::{DeckError, DeckResolver, ResolvedDeck};
use rand::seq::SliceRandom;
use serde::Deserialize;
use url::Url;

use crate::PlaneboardError;

const DEFAULT_API_BASE: &str = "https://archidekt.com/api/decks";
const COMMANDER_CATEGORY: &str = "Commander";
const DOUBLE_FACED_LAYOUTS: &[&str] =
    &["transform", "modal_dfc", "double_faced_token", "reversible_card"];

/// A [`DeckResolver`] backed by the Archidekt API.
#[derive(Debug, Clone)]
pub struct ArchidektResolver {
    client: reqwest::Client,
    api_base: String,
}

impl ArchidektResolver {
    /// Builds a resolver whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, PlaneboardError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("planeboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Points the resolver at another API root (e.g. a mirror).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

impl DeckResolver for ArchidektResolver {
    async fn resolve(&self, deck_url: &str) -> Result<ResolvedDeck, DeckError> {
        let api_url = format!("{}/{}/", self.api_base, deck_id(deck_url)?);
        tracing::debug!(%api_url, "fetching deck");

        let response = self
            .client
            .get(&api_url)
            .send()
            .await
            .map_err(|e| DeckError::Fetch(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%api_url, %status, "deck service refused");
            return Err(DeckError::Status(status.as_u16()));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| DeckError::Fetch(e.to_string()))?;

        let deck = parse_deck(&body)?;
        tracing::debug!(
            %api_url,
            library = deck.library.len(),
            commanders = deck.commanders.len(),
            "deck fetched"
        );
        Ok(deck)
    }
}

/// Extracts the deck id from `https://archidekt.com/decks/<id>/<slug>`.
fn deck_id(deck_url: &str) -> Result<String, DeckError> {
    let invalid = || DeckError::InvalidUrl(deck_url.to_string());
    let url = Url::parse(deck_url).map_err(|_| invalid())?;
    let mut segments = url.path_segments().ok_or_else(invalid)?;
    match (segments.next(), segments.next()) {
        (Some("decks"), Some(id)) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(invalid()),
    }
}

#[derive(Debug, Deserialize)]
struct ArchidektDeck {
    #[serde(default)]
    cards: Vec<DeckEntry>,
}

#[derive(Debug, Deserialize)]
struct DeckEntry {
    #[serde(default)]
    quantity: u32,
    #[serde(default)]
    categories: Option<Vec<String>>,
    card: CardRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardRecord {
    id: i64,
    #[serde(default)]
    collector_number: String,
    #[serde(default)]
    edition: Edition,
    #[serde(default)]
    oracle_card: OracleCard,
}

#[derive(Debug, Default, Deserialize)]
struct Edition {
    #[serde(default, rename = "editioncode")]
    edition_code: String,
}

#[derive(Debug, Default, Deserialize)]
struct OracleCard {
    #[serde(default)]
    name: String,
    #[serde(default)]
    layout: String,
    #[serde(default)]
    tokens: Option<Vec<serde_json::Value>>,
}

/// Turns an Archidekt API response into a shuffled library and the
/// commander list.
fn parse_deck(body: &[u8]) -> Result<ResolvedDeck, DeckError> {
    let deck: ArchidektDeck =
        serde_json::from_slice(body).map_err(|e| DeckError::Parse(e.to_string()))?;

    let mut resolved = ResolvedDeck::default();
    for entry in &deck.cards {
        let is_commander = entry
            .categories
            .iter()
            .flatten()
            .any(|c| c == COMMANDER_CATEGORY);
        let record = &entry.card;
        let image_url = scryfall_image(record, false);
        let back_image_url = DOUBLE_FACED_LAYOUTS
            .contains(&record.oracle_card.layout.as_str())
            .then(|| scryfall_image(record, true));
        let has_tokens = record
            .oracle_card
            .tokens
            .as_ref()
            .is_some_and(|tokens| !tokens.is_empty());

        for _ in 0..entry.quantity {
            let card = Card {
                id: format!("{}-{:08x}", record.id, rand::random::<u32>()),
                name: record.oracle_card.name.clone(),
                image_url: image_url.clone(),
                back_image_url: back_image_url.clone(),
                has_tokens,
            };
            if is_commander {
                resolved.commanders.push(card);
            } else {
                resolved.library.push(card);
            }
        }
    }

    resolved.library.shuffle(&mut rand::rng());
    Ok(resolved)
}

fn scryfall_image(record: &CardRecord, back: bool) -> String {
    let mut url = format!(
        "https://api.scryfall.com/cards/{}/{}?format=image&version=normal",
        record.edition.edition_code, record.collector_number
    );
    if back {
        url.push_str("&face=back");
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": 1234,
        "name": "Test deck",
        "cards": [
            {
                "quantity": 1,
                "categories": ["Commander"],
                "card": {
                    "id": 11,
                    "collectorNumber": "5",
                    "edition": { "editioncode": "cmr" },
                    "oracleCard": { "name": "Commander One", "layout": "normal", "tokens": [] }
                }
            },
            {
                "quantity": 3,
                "categories": ["Land"],
                "card": {
                    "id": 22,
                    "collectorNumber": "280",
                    "edition": { "editioncode": "m21" },
                    "oracleCard": { "name": "Forest", "layout": "normal" }
                }
            },
            {
                "quantity": 1,
                "categories": null,
                "card": {
                    "id": 33,
                    "collectorNumber": "120",
                    "edition": { "editioncode": "znr" },
                    "oracleCard": {
                        "name": "Valakut Awakening",
                        "layout": "modal_dfc",
                        "tokens": [{ "name": "Goblin" }]
                    }
                }
            }
        ]
    }"#;

    #[test]
    fn test_deck_id_from_page_url() {
        assert_eq!(
            deck_id("https://archidekt.com/decks/1234/my-deck").unwrap(),
            "1234"
        );
        assert_eq!(deck_id("https://archidekt.com/decks/99").unwrap(), "99");
    }

    #[test]
    fn test_deck_id_rejects_other_urls() {
        for url in [
            "not a url",
            "https://archidekt.com/",
            "https://archidekt.com/collection/1234",
            "https://archidekt.com/decks/",
        ] {
            assert!(
                matches!(deck_id(url), Err(DeckError::InvalidUrl(_))),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_splits_commanders_and_expands_quantities() {
        let deck = parse_deck(SAMPLE.as_bytes()).unwrap();
        assert_eq!(deck.commanders.len(), 1);
        assert_eq!(deck.commanders[0].name, "Commander One");
        assert_eq!(deck.library.len(), 4);
        assert_eq!(
            deck.library.iter().filter(|c| c.name == "Forest").count(),
            3
        );
    }

    #[test]
    fn test_every_copy_gets_its_own_id() {
        let deck = parse_deck(SAMPLE.as_bytes()).unwrap();
        let mut ids: Vec<&str> =
            deck.library.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);

        let forest = deck.library.iter().find(|c| c.name == "Forest").unwrap();
        let (card_id, suffix) = forest.id.split_once('-').unwrap();
        assert_eq!(card_id, "22");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_images_and_flags() {
        let deck = parse_deck(SAMPLE.as_bytes()).unwrap();
        let forest = deck.library.iter().find(|c| c.name == "Forest").unwrap();
        assert_eq!(
            forest.image_url,
            "https://api.scryfall.com/cards/m21/280?format=image&version=normal"
        );
        assert_eq!(forest.back_image_url, None);
        assert!(!forest.has_tokens);

        let mdfc = deck
            .library
            .iter()
            .find(|c| c.name == "Valakut Awakening")
            .unwrap();
        assert_eq!(
            mdfc.back_image_url.as_deref(),
            Some("https://api.scryfall.com/cards/znr/120?format=image&version=normal&face=back")
        );
        assert!(mdfc.has_tokens);
        assert!(!deck.commanders[0].has_tokens);
    }

    #[test]
    fn test_malformed_body_is_a_parse_error() {
        assert!(matches!(
            parse_deck(b"<html>nope</html>"),
            Err(DeckError::Parse(_))
        ));
    }

    /// Answers one HTTP request on a local port and hands back the
    /// request line.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api/decks", listener.local_addr().unwrap());
        let task = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&request)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });
        (base, task)
    }

    #[tokio::test]
    async fn test_resolve_fetches_the_api_url() {
        let (base, request) = serve_once("200 OK", SAMPLE).await;
        let resolver = ArchidektResolver::new(Duration::from_secs(5))
            .unwrap()
            .with_api_base(format!("{base}/"));

        let deck = resolver
            .resolve("https://archidekt.com/decks/1234/my-deck")
            .await
            .unwrap();
        assert_eq!(deck.commanders.len(), 1);
        assert_eq!(deck.library.len(), 4);
        assert_eq!(request.await.unwrap(), "GET /api/decks/1234/ HTTP/1.1");
    }

    #[tokio::test]
    async fn test_resolve_reports_refusal_status() {
        let (base, _request) = serve_once("404 Not Found", "{}").await;
        let resolver = ArchidektResolver::new(Duration::from_secs(5))
            .unwrap()
            .with_api_base(base);

        let result = resolver.resolve("https://archidekt.com/decks/99").await;
        assert_eq!(result, Err(DeckError::Status(404)));
    }

    #[tokio::test]
    async fn test_invalid_url_fails_without_a_request() {
        let resolver = ArchidektResolver::new(Duration::from_secs(1)).unwrap();
        let result = resolver.resolve("https://example.com/nothing").await;
        assert!(matches!(result, Err(DeckError::InvalidUrl(_))));
    }
}
