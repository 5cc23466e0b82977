//! Flux kanban client
//!
//! Talks to the board's GraphQL API: lists cards sitting in a stage, pulls
//! card fields on demand, comments, and moves cards between stages. Also
//! extracts the PR links buried in card text, which is how cards and pull
//! requests are tied together.

use crate::error::{Error, Result};
use crate::types::{Card, CardField, CardStage, PrRef};
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::debug;

static PR_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https://github\.com/(?P<owner>[\w.-]+)/(?P<repo>[\w.-]+)/pull/(?P<number>\d+)")
        .unwrap()
});

/// Extract GitHub PR references from free text, deduplicated by URL
/// in first-seen order.
pub fn extract_pr_refs(text: &str) -> Vec<PrRef> {
    let mut refs: Vec<PrRef> = Vec::new();
    for capture in PR_URL.captures_iter(text) {
        let url = capture[0].to_string();
        if refs.iter().any(|r| r.url == url) {
            continue;
        }
        let Ok(number) = capture["number"].parse() else {
            continue;
        };
        refs.push(PrRef {
            url,
            owner: capture["owner"].to_string(),
            repo: capture["repo"].to_string(),
            number,
        });
    }
    refs
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct Edges<T> {
    edges: Vec<Edge<T>>,
}

#[derive(Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardNode {
    id: String,
    name: String,
    description: Option<String>,
    current_stage: StageNode,
    #[serde(default)]
    labels: Vec<LabelNode>,
}

#[derive(Deserialize)]
struct StageNode {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct LabelNode {
    name: String,
}

impl From<CardNode> for Card {
    fn from(node: CardNode) -> Self {
        Self {
            id: node.id,
            name: node.name,
            description: node.description,
            current_stage: CardStage {
                id: node.current_stage.id,
                name: node.current_stage.name,
            },
            labels: node.labels.into_iter().map(|l| l.name).collect(),
            fields: Vec::new(),
        }
    }
}

/// Client for the Flux board API
pub struct FluxClient {
    client: Client,
    api_url: String,
    token: String,
}

impl FluxClient {
    /// Create a client against `api_url` (the board's GraphQL endpoint)
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("pr-pilot")
            .build()
            .map_err(|e| Error::Flux(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            token: token.to_string(),
        })
    }

    async fn graphql<T: DeserializeOwned>(&self, payload: &serde_json::Value) -> Result<T> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::Flux(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Flux(format!("returned {}", response.status())));
        }

        let envelope: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Flux(format!("failed to parse response: {e}")))?;

        if let Some(errors) = envelope.errors
            && !errors.is_empty()
        {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(Error::Flux(messages.join(", ")));
        }

        envelope
            .data
            .ok_or_else(|| Error::Flux("no data in response".to_string()))
    }

    /// Cards currently sitting in a stage, oldest first
    pub async fn cards_in_stage(&self, stage_id: &str) -> Result<Vec<Card>> {
        debug!(stage_id, "listing cards in stage");

        #[derive(Deserialize)]
        struct Data {
            stage: Option<StageCards>,
        }

        #[derive(Deserialize)]
        struct StageCards {
            cards: Edges<CardNode>,
        }

        let data: Data = self
            .graphql(&serde_json::json!({
                "query": r"
                    query CardsInStage($stageId: ID!) {
                        stage(id: $stageId) {
                            cards(first: 30) {
                                edges {
                                    node {
                                        id
                                        name
                                        description
                                        currentStage { id name }
                                        labels { name }
                                    }
                                }
                            }
                        }
                    }
                ",
                "variables": { "stageId": stage_id }
            }))
            .await?;

        let stage = data
            .stage
            .ok_or_else(|| Error::NotFound(format!("Flux stage {stage_id}")))?;

        let cards: Vec<Card> = stage.cards.edges.into_iter().map(|e| e.node.into()).collect();
        debug!(count = cards.len(), "listed cards");
        Ok(cards)
    }

    /// Custom fields of a card (field values can also carry PR links)
    pub async fn card_fields(&self, card_id: &str) -> Result<Vec<CardField>> {
        debug!(card_id, "fetching card fields");

        #[derive(Deserialize)]
        struct Data {
            card: Option<CardWithFields>,
        }

        #[derive(Deserialize)]
        struct CardWithFields {
            fields: Vec<FieldNode>,
        }

        #[derive(Deserialize)]
        struct FieldNode {
            name: String,
            value: Option<String>,
        }

        let data: Data = self
            .graphql(&serde_json::json!({
                "query": r"
                    query CardFields($cardId: ID!) {
                        card(id: $cardId) {
                            fields { name value }
                        }
                    }
                ",
                "variables": { "cardId": card_id }
            }))
            .await?;

        let card = data
            .card
            .ok_or_else(|| Error::NotFound(format!("Flux card {card_id}")))?;

        Ok(card
            .fields
            .into_iter()
            .map(|f| CardField {
                title: f.name,
                value: f.value.unwrap_or_default(),
            })
            .collect())
    }

    /// Comment on a card
    pub async fn comment_card(&self, card_id: &str, text: &str) -> Result<()> {
        debug!(card_id, "commenting on card");

        #[derive(Deserialize)]
        struct Data {
            #[allow(dead_code)]
            #[serde(rename = "createComment")]
            create_comment: serde_json::Value,
        }

        let _: Data = self
            .graphql(&serde_json::json!({
                "query": r"
                    mutation CommentCard($cardId: ID!, $text: String!) {
                        createComment(input: { cardId: $cardId, text: $text }) {
                            comment { id }
                        }
                    }
                ",
                "variables": { "cardId": card_id, "text": text }
            }))
            .await?;
        Ok(())
    }

    /// Move a card to another stage
    pub async fn move_card(&self, card_id: &str, stage_id: &str) -> Result<()> {
        debug!(card_id, stage_id, "moving card");

        #[derive(Deserialize)]
        struct Data {
            #[allow(dead_code)]
            #[serde(rename = "moveCardToStage")]
            move_card_to_stage: serde_json::Value,
        }

        let _: Data = self
            .graphql(&serde_json::json!({
                "query": r"
                    mutation MoveCard($cardId: ID!, $stageId: ID!) {
                        moveCardToStage(input: { cardId: $cardId, destinationStageId: $stageId }) {
                            card { id }
                        }
                    }
                ",
                "variables": { "cardId": card_id, "stageId": stage_id }
            }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_dedupes_pr_refs() {
        let text = "\
Deploy https://github.com/acme/widgets/pull/42 together with
HTTPS://github.com/acme/gadgets/pull/7, then re-check
https://github.com/acme/widgets/pull/42.
";
        let refs = extract_pr_refs(text);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].owner, "acme");
        assert_eq!(refs[0].repo, "widgets");
        assert_eq!(refs[0].number, 42);
        assert_eq!(refs[1].number, 7);
    }

    #[test]
    fn no_refs_in_plain_text() {
        assert!(extract_pr_refs("nothing to see here").is_empty());
    }

    #[tokio::test]
    async fn lists_cards_in_stage() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/graphql")
            .match_header("authorization", "Bearer flux-token")
            .with_status(200)
            .with_body(
                r#"{
                    "data": {
                        "stage": {
                            "cards": {
                                "edges": [
                                    {
                                        "node": {
                                            "id": "c1",
                                            "name": "Ship widgets",
                                            "description": "https://github.com/acme/widgets/pull/42",
                                            "currentStage": { "id": "s1", "name": "Publish" },
                                            "labels": [{ "name": "release" }]
                                        }
                                    }
                                ]
                            }
                        }
                    }
                }"#,
            )
            .create_async()
            .await;

        let client = FluxClient::new(&format!("{}/api/graphql", server.url()), "flux-token")
            .unwrap();
        let cards = client.cards_in_stage("s1").await.unwrap();
        mock.assert_async().await;

        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].name, "Ship widgets");
        assert_eq!(cards[0].labels, ["release"]);
        assert_eq!(extract_pr_refs(&cards[0].search_text()).len(), 1);
    }

    #[tokio::test]
    async fn surfaces_graphql_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/graphql")
            .with_status(200)
            .with_body(r#"{ "data": null, "errors": [{ "message": "stage not found" }] }"#)
            .create_async()
            .await;

        let client = FluxClient::new(&format!("{}/api/graphql", server.url()), "t").unwrap();
        let err = client.cards_in_stage("missing").await.unwrap_err();
        assert!(err.to_string().contains("stage not found"));
    }
}
