//! Prompt construction for the extraction model.

use super::{EpisodeContext, Message};

const SYSTEM_PROMPT: &str = "\
You extract knowledge graph nodes and edges from episodes of text. \
Respond only with JSON matching the requested schema.

Guidelines:
1. Extract the significant real-world entities, actors, and concepts that appear in the CURRENT EPISODE.
2. For message episodes, the speaker (the part before the colon) is always an entity.
3. Give each entity a broad entity_type such as Person, Organization, Place, Event, or Concept.
4. Summarize what the episode says about each entity in one sentence.
5. Extract factual relationships between pairs of extracted entities. Name each relation in UPPER_SNAKE_CASE (e.g. WORKS_AT) and state the fact as one standalone sentence.
6. Use the PREVIOUS EPISODES only to resolve references; extract entities and facts from the CURRENT EPISODE alone.
7. Never invent information that is not in the episodes.";

/// Build the message sequence for extracting one episode.
pub fn extraction_messages(ctx: &EpisodeContext<'_>) -> Vec<Message> {
    vec![Message::system(SYSTEM_PROMPT), Message::user(user_prompt(ctx))]
}

fn user_prompt(ctx: &EpisodeContext<'_>) -> String {
    let mut prompt = String::new();

    prompt.push_str("<PREVIOUS EPISODES>\n");
    for episode in ctx.previous_episodes {
        prompt.push_str(&episode.content);
        prompt.push('\n');
    }
    prompt.push_str("</PREVIOUS EPISODES>\n");

    prompt.push_str("<CURRENT EPISODE>\n");
    prompt.push_str(&format!(
        "name: {}\nsource: {} ({})\ncontent:\n{}\n",
        ctx.name,
        ctx.source.as_str(),
        ctx.source_description,
        ctx.content
    ));
    prompt.push_str("</CURRENT EPISODE>");

    prompt
}
