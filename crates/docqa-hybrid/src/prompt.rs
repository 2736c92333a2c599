//! Prompt assembly for the answer-synthesis step that follows retrieval.

use anyhow::Context;

use crate::pipeline::Passage;
use crate::session::Session;

const DEFAULT_TEMPLATE: &str = "
Answer the following question only with information found in the context.
Search the entire context before answering.
Give a long, detailed answer.

After answering, suggest two follow-up queries the user might find useful,
formatted exactly as a numbered list.

<context>
{context}
</context>

# Question: {input}
";

/// A question-answering prompt with `{context}` and `{input}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self { template: DEFAULT_TEMPLATE.to_string() }
    }
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Passages joined by blank lines, in rank order.
    pub fn context(passages: &[Passage]) -> String {
        passages.iter().map(|p| p.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n")
    }

    pub fn render(&self, question: &str, passages: &[Passage]) -> String {
        self.template.replace("{context}", &Self::context(passages)).replace("{input}", question)
    }
}

/// A language model turning a rendered prompt into an answer.
pub trait AnswerSynthesizer: Send + Sync {
    fn synthesize(&self, prompt: &str) -> anyhow::Result<String>;
}

/// An answer plus the passages it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub passages: Vec<Passage>,
}

/// Retrieves passages for `question`, renders the prompt and asks the
/// synthesizer.
pub async fn ask(
    session: &Session,
    template: &PromptTemplate,
    synthesizer: &dyn AnswerSynthesizer,
    question: &str,
    k: usize,
) -> anyhow::Result<Answer> {
    let passages = session.answerable_passages(question, k).await?;
    let prompt = template.render(question, &passages);
    let text = synthesizer.synthesize(&prompt).context("answer synthesis failed")?;
    Ok(Answer { text, passages })
}
