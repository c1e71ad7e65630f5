use crate::catalog::CatalogCard;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Where live-catalog cards come from.
#[async_trait]
pub trait CardSource: Send + Sync {
    fn name(&self) -> String;
    async fn fetch_cards(&self) -> Result<Vec<CatalogCard>>;
}

/// Serves a fixed list of cards, e.g. captured from a rendered page.
#[derive(Debug, Clone, Default)]
pub struct StaticCardSource {
    cards: Vec<CatalogCard>,
}

impl StaticCardSource {
    pub fn new(cards: Vec<CatalogCard>) -> Self {
        Self { cards }
    }

    /// Reads a JSON array of cards.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let cards: Vec<CatalogCard> = serde_json::from_str(&content)?;
        Ok(Self::new(cards))
    }
}

#[async_trait]
impl CardSource for StaticCardSource {
    fn name(&self) -> String {
        "static".to_string()
    }

    async fn fetch_cards(&self) -> Result<Vec<CatalogCard>> {
        Ok(self.cards.clone())
    }
}

#[derive(Debug, Clone)]
pub struct CardSelectors {
    pub card_css: String,
    pub card: Selector,
    pub link: Selector,
    pub viewers: Selector,
    pub badge_text: String,
}

impl CardSelectors {
    pub fn new(card: &str, link: &str, viewers: &str, badge_text: &str) -> Result<Self> {
        Ok(Self {
            card_css: card.to_string(),
            card: parse_selector(card)?,
            link: parse_selector(link)?,
            viewers: parse_selector(viewers)?,
            badge_text: badge_text.to_string(),
        })
    }
}

pub fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Config(format!("Invalid selector '{}': {}", css, e)))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Fetches the catalog page over HTTP and reads cards from its markup.
pub struct HtmlCatalogSource {
    pub url: String,
    pub client: Client,
    pub selectors: CardSelectors,
}

impl HtmlCatalogSource {
    pub fn new(url: String, selectors: CardSelectors, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            url,
            client,
            selectors,
        })
    }

    pub fn cards_from_html(&self, html: &str) -> Vec<CatalogCard> {
        let doc = Html::parse_document(html);
        let sel = &self.selectors;

        let cards = doc
            .select(&sel.card)
            .map(|card| {
                let href = card
                    .select(&sel.link)
                    .next()
                    .and_then(|link| link.value().attr("href"))
                    .map(str::to_string);
                let viewer_text = card
                    .select(&sel.viewers)
                    .next()
                    .map(|node| element_text(node).trim().to_string());

                CatalogCard {
                    live_badge: element_text(card).contains(sel.badge_text.as_str()),
                    href,
                    viewer_text,
                }
            })
            .collect();
        cards
    }
}

#[async_trait]
impl CardSource for HtmlCatalogSource {
    fn name(&self) -> String {
        self.url.clone()
    }

    async fn fetch_cards(&self) -> Result<Vec<CatalogCard>> {
        log::info!("Visiting: {}", self.url);

        let res = self.client.get(&self.url).send().await?.error_for_status()?;
        let html = res.text().await?;
        log::debug!("HTML length: {} bytes", html.len());

        let cards = self.cards_from_html(&html);
        log::info!(
            "Card selector '{}' found {} cards on {}",
            self.selectors.card_css,
            cards.len(),
            self.url
        );
        Ok(cards)
    }
}
