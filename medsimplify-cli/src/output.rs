//! Rendering answers for the terminal.

use medsimplify_rag::Answer;

const PREVIEW_CHARS: usize = 240;

/// Render an answer with its numbered sources.
pub fn render_answer(answer: &Answer) -> String {
    let mut out = String::from("Simplified explanation\n\n");
    out.push_str(&format!("{}\n\n", answer.explanation));

    if !answer.is_grounded() {
        out.push_str(
            "No grounding sources used: the explanation comes from general model knowledge.\n",
        );
        return out;
    }

    out.push_str("Sources\n");
    for (i, source) in answer.sources.iter().enumerate() {
        let chunk = &source.chunk;
        out.push_str(&format!(
            "\n[{}] {} (chars {}-{}, score {:.3})\n",
            i + 1,
            chunk.document_id,
            chunk.start_offset,
            chunk.end_offset,
            source.score
        ));
        out.push_str(&preview(&chunk.text));
        out.push('\n');
    }
    if answer.context_truncated {
        out.push_str("\n(the top source was shortened to fit the context budget)\n");
    }
    out
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use medsimplify_rag::{Chunk, SearchResult};

    #[test]
    fn ungrounded_answers_say_so() {
        let answer = Answer {
            explanation: "Diabetes means high blood sugar.".into(),
            sources: Vec::new(),
            context_truncated: false,
        };
        let rendered = render_answer(&answer);
        assert!(rendered.contains("Diabetes means high blood sugar."));
        assert!(rendered.contains("No grounding sources used"));
    }

    #[test]
    fn sources_are_numbered_with_offsets() {
        let answer = Answer {
            explanation: "Angina is chest pain.".into(),
            sources: vec![SearchResult {
                chunk: Chunk {
                    id: "cardio_0".into(),
                    document_id: "cardio.txt".into(),
                    start_offset: 0,
                    end_offset: 21,
                    text: "Angina is chest pain.".into(),
                    metadata: Default::default(),
                },
                score: 0.8124,
            }],
            context_truncated: false,
        };
        let rendered = render_answer(&answer);
        assert!(rendered.starts_with("Simplified explanation\n\nAngina is chest pain.\n\nSources\n"));
        assert!(rendered.contains("[1] cardio.txt (chars 0-21, score 0.812)\nAngina is chest pain.\n"));
        assert!(!rendered.contains("shortened"));
    }

    #[test]
    fn truncated_context_is_noted() {
        let answer = Answer {
            explanation: "Angina is chest pain.".into(),
            sources: vec![SearchResult {
                chunk: Chunk {
                    id: "cardio_0".into(),
                    document_id: "cardio.txt".into(),
                    start_offset: 0,
                    end_offset: 300,
                    text: "x".repeat(300),
                    metadata: Default::default(),
                },
                score: 0.5,
            }],
            context_truncated: true,
        };
        let rendered = render_answer(&answer);
        assert!(rendered.contains(&format!("{}...\n", "x".repeat(PREVIEW_CHARS))));
        assert!(rendered.ends_with("(the top source was shortened to fit the context budget)\n"));
    }
}
