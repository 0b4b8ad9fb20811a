//! Prompt assembly under a context budget.
//!
//! The [`PromptAssembler`] turns a query and its ranked retrieval result into
//! a [`GenerationRequest`]. Every passage in the context block carries a
//! `[Source N: document chars start-end]` tag pointing back at the chunk it
//! came from, so the explanation can be checked against its evidence.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::SearchResult;
use crate::error::{RagError, Result};
use crate::retriever::validate_query;

/// Instructions used when reference passages are supplied.
pub const GROUNDED_PREAMBLE: &str = "You are a helpful medical assistant who explains complex \
medical concepts in simple terms. Rely on the reference passages supplied in the context and \
cite them by their source number. Your explanation should be easy to understand for people \
without medical training, accurate and grounded in the provided context, empathetic and clear, \
and should mention relevant precautions or next steps where applicable. If the context does not \
cover the question, say so before answering from general knowledge.";

/// Instructions used when no reference passages are available.
pub const UNGROUNDED_PREAMBLE: &str = "You are a helpful medical assistant who explains complex \
medical concepts in simple terms. No reference documents are available for this question, so \
answer from general medical knowledge. Your explanation should be easy to understand for people \
without medical training, accurate, empathetic and clear, and should mention relevant \
precautions or next steps where applicable.";

const CONTEXT_RULE: &str = "-------------------";
const ENTRY_SEPARATOR: &str = "\n\n";

/// One passage of the context block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextEntry {
    /// 1-based rank of the passage in the retrieval result.
    pub rank: usize,
    /// Document the passage came from.
    pub document_id: String,
    /// Character offset of the passage start within the document.
    pub start_offset: usize,
    /// Character offset one past the passage end within the document.
    pub end_offset: usize,
    /// Passage text, possibly cut short (see [`truncated`](Self::truncated)).
    pub text: String,
    /// Similarity score of the passage.
    pub score: f32,
    /// Whether the passage text was cut to fit the budget.
    pub truncated: bool,
}

impl ContextEntry {
    fn header(&self) -> String {
        format!(
            "[Source {}: {} chars {}-{}]",
            self.rank, self.document_id, self.start_offset, self.end_offset
        )
    }

    fn render(&self) -> String {
        format!("{}\n{}", self.header(), self.text)
    }

    fn rendered_chars(&self) -> usize {
        self.header().chars().count() + 1 + self.text.chars().count()
    }
}

/// A fully composed request for the language model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    /// Fixed task instructions.
    pub system_instructions: String,
    /// Passages included in the context block, best first.
    pub context: Vec<ContextEntry>,
    /// The user's question or medical text to explain.
    pub user_query: String,
    /// Retrieval results backing the context entries, in the same order.
    pub sources: Vec<SearchResult>,
    /// Whether any passage was cut to fit the budget.
    pub truncated: bool,
    /// Budget the context block was fitted to, in characters.
    pub max_context_chars: usize,
}

impl GenerationRequest {
    /// Whether the request carries any reference passages.
    pub fn is_grounded(&self) -> bool {
        !self.context.is_empty()
    }

    /// The tagged passages joined into one block.
    pub fn context_block(&self) -> String {
        self.context.iter().map(ContextEntry::render).collect::<Vec<_>>().join(ENTRY_SEPARATOR)
    }

    /// Size of [`context_block`](Self::context_block) in characters; never above the budget.
    pub fn context_chars(&self) -> usize {
        block_chars(&self.context)
    }

    /// The user turn: context block (if any) followed by the query.
    pub fn user_message(&self) -> String {
        if self.is_grounded() {
            format!(
                "Context information is below:\n{CONTEXT_RULE}\n{}\n{CONTEXT_RULE}\n\n\
                 Given the context above, please explain the following in simple, \
                 patient-friendly terms:\n{}\n\nExplanation:",
                self.context_block(),
                self.user_query
            )
        } else {
            format!(
                "Please explain the following in simple, patient-friendly terms:\n{}\n\nExplanation:",
                self.user_query
            )
        }
    }

    /// The whole request as a single prompt string.
    pub fn prompt(&self) -> String {
        format!("{}\n\n{}", self.system_instructions, self.user_message())
    }
}

fn block_chars(entries: &[ContextEntry]) -> usize {
    let separators = entries.len().saturating_sub(1) * ENTRY_SEPARATOR.len();
    entries.iter().map(ContextEntry::rendered_chars).sum::<usize>() + separators
}

/// Builds [`GenerationRequest`]s within a fixed context budget.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    max_context_chars: usize,
    grounded_preamble: String,
    ungrounded_preamble: String,
}

impl PromptAssembler {
    /// Create an assembler whose context block never exceeds `max_context_chars`.
    pub fn new(max_context_chars: usize) -> Self {
        Self {
            max_context_chars,
            grounded_preamble: GROUNDED_PREAMBLE.to_string(),
            ungrounded_preamble: UNGROUNDED_PREAMBLE.to_string(),
        }
    }

    /// Replace the instructions used when passages are supplied.
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.grounded_preamble = preamble.into();
        self
    }

    /// The context budget in characters.
    pub fn max_context_chars(&self) -> usize {
        self.max_context_chars
    }

    /// Compose a request from `query` and its ranked `results`.
    ///
    /// Passages are added in rank order; when the budget would be exceeded the
    /// lowest-ranked passages are dropped whole. Only if the best passage alone
    /// does not fit is its text cut at the end, and the request marked truncated.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ValidationError`] for an empty query, or when
    /// `results` is non-empty but the budget cannot hold even a cut-down best
    /// passage. A request is only ungrounded when there was nothing to ground it on.
    pub fn assemble(&self, query: &str, results: &[SearchResult]) -> Result<GenerationRequest> {
        validate_query(query)?;

        let mut context: Vec<ContextEntry> = Vec::with_capacity(results.len());
        let mut sources = Vec::with_capacity(results.len());
        for (i, result) in results.iter().enumerate() {
            let entry = ContextEntry {
                rank: i + 1,
                document_id: result.chunk.document_id.clone(),
                start_offset: result.chunk.start_offset,
                end_offset: result.chunk.end_offset,
                text: result.chunk.text.clone(),
                score: result.score,
                truncated: false,
            };
            let separator = if context.is_empty() { 0 } else { ENTRY_SEPARATOR.len() };
            if block_chars(&context) + separator + entry.rendered_chars() > self.max_context_chars {
                break;
            }
            context.push(entry);
            sources.push(result.clone());
        }

        let mut truncated = false;
        if context.is_empty() {
            if let Some(top) = results.first() {
                let entry = self.truncate_to_budget(top).ok_or_else(|| {
                    warn!(budget = self.max_context_chars, "context budget too small for any passage");
                    RagError::validation(format!(
                        "max_context_chars ({}) cannot hold the source tag and any text of '{}'",
                        self.max_context_chars, top.chunk.id
                    ))
                })?;
                truncated = true;
                context.push(entry);
                sources.push(top.clone());
            }
        }

        if context.len() < results.len() {
            debug!(
                kept = context.len(),
                dropped = results.len() - context.len(),
                truncated,
                "fitted context to budget"
            );
        }

        let system_instructions = if context.is_empty() {
            self.ungrounded_preamble.clone()
        } else {
            self.grounded_preamble.clone()
        };

        Ok(GenerationRequest {
            system_instructions,
            context,
            user_query: query.to_string(),
            sources,
            truncated,
            max_context_chars: self.max_context_chars,
        })
    }

    /// Cut `result`'s text so that its rendered entry fills the budget exactly.
    ///
    /// Returns `None` when the source tag leaves no room for any text.
    fn truncate_to_budget(&self, result: &SearchResult) -> Option<ContextEntry> {
        let mut entry = ContextEntry {
            rank: 1,
            document_id: result.chunk.document_id.clone(),
            start_offset: result.chunk.start_offset,
            end_offset: result.chunk.end_offset,
            text: String::new(),
            score: result.score,
            truncated: true,
        };
        // the tag with the full end offset is at least as long as the final one
        let overhead = entry.header().chars().count() + 1;
        let keep = self.max_context_chars.checked_sub(overhead).filter(|keep| *keep > 0)?;

        entry.text = result.chunk.text.chars().take(keep).collect();
        entry.end_offset = entry.start_offset + entry.text.chars().count();
        Some(entry)
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(crate::config::RagConfig::default().max_context_chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;

    fn result(doc: &str, start: usize, text: &str, score: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: format!("{doc}_{start}"),
                document_id: doc.to_string(),
                start_offset: start,
                end_offset: start + text.chars().count(),
                text: text.to_string(),
                metadata: Default::default(),
            },
            score,
        }
    }

    #[test]
    fn entries_are_tagged_with_their_source() {
        let assembler = PromptAssembler::new(1000);
        let results = [result("cardio.pdf", 10, "Angina is chest pain.", 0.9)];
        let request = assembler.assemble("what is angina", &results).unwrap();
        assert_eq!(
            request.context_block(),
            "[Source 1: cardio.pdf chars 10-31]\nAngina is chest pain."
        );
        assert!(request.prompt().starts_with(GROUNDED_PREAMBLE));
        assert!(request.prompt().contains("what is angina"));
    }

    #[test]
    fn lowest_ranked_entries_are_dropped_first() {
        let results = [
            result("a", 0, &"x".repeat(40), 0.9),
            result("b", 0, &"y".repeat(40), 0.8),
            result("c", 0, &"z".repeat(40), 0.7),
        ];
        let one = PromptAssembler::new(10_000).assemble("q", &results[..1]).unwrap().context_chars();
        let request = PromptAssembler::new(one * 2 + 1).assemble("q", &results).unwrap();
        assert_eq!(request.context.len(), 1);
        assert_eq!(request.context[0].document_id, "a");
        assert_eq!(request.sources.len(), 1);
        assert!(!request.truncated);
    }

    #[test]
    fn oversized_top_entry_is_cut_at_its_end() {
        let results = [result("a", 0, &"x".repeat(500), 0.9)];
        let request = PromptAssembler::new(100).assemble("q", &results).unwrap();
        assert!(request.truncated);
        assert!(request.context[0].truncated);
        assert!(request.context_chars() <= 100);
        assert!(request.context_chars() >= 98);
        assert!(request.context[0].text.chars().all(|c| c == 'x'));
    }

    #[test]
    fn budget_without_room_for_the_top_passage_is_rejected() {
        let results = [result("cardio.pdf", 0, &"x".repeat(500), 0.9)];
        let err = PromptAssembler::new(30).assemble("what is hypertension", &results).unwrap_err();
        assert!(matches!(err, RagError::ValidationError(_)));
    }

    #[test]
    fn no_results_uses_the_ungrounded_preamble() {
        let request = PromptAssembler::new(100).assemble("explain diabetes", &[]).unwrap();
        assert!(!request.is_grounded());
        assert_eq!(request.system_instructions, UNGROUNDED_PREAMBLE);
        assert!(!request.user_message().contains("Context information"));
    }

    #[test]
    fn empty_query_is_rejected() {
        let err = PromptAssembler::new(100).assemble("  ", &[]).unwrap_err();
        assert!(matches!(err, RagError::ValidationError(_)));
    }
}
