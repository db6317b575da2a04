use std::sync::Arc;
use tracing::{debug, info};

use advisor_core::error::{Error, Result};
use advisor_core::traits::{Generator, Prompt};
use advisor_core::types::{Answer, RankedContext};

/// Exact reply when the context does not cover the question.
pub const ABSENCE_STATEMENT: &str = "There is no mention in the provided context.";

/// The kind of answer a query is asking for. Selects the output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIntent {
    ListSchemes,
    SchemeDetails,
    EligibilityCheck,
    General,
}

const ELIGIBILITY_CUES: &[&str] = &[
    "eligib", "qualify", "suit", "am i ", "i am ", "i'm ", "we are ", "my company", "our company", "my business", "our business", "turnover",
];
const LIST_CUES: &[&str] = &["list", "available", "which schemes", "what schemes", "all schemes", "schemes for", "options"];
const DETAIL_CUES: &[&str] = &["tell me about", "details", "detail of", "benefit", "what is", "explain", "objective", "about the"];

impl QueryIntent {
    /// Keyword classification; profile/eligibility wording wins over listing,
    /// which wins over details.
    pub fn classify(query: &str) -> Self {
        let q = format!("{} ", query.to_lowercase());
        let has = |cues: &[&str]| cues.iter().any(|c| q.contains(c));
        if has(ELIGIBILITY_CUES) {
            QueryIntent::EligibilityCheck
        } else if has(LIST_CUES) {
            QueryIntent::ListSchemes
        } else if has(DETAIL_CUES) {
            QueryIntent::SchemeDetails
        } else {
            QueryIntent::General
        }
    }

    fn format_section(self) -> &'static str {
        match self {
            QueryIntent::ListSchemes => LIST_FORMAT,
            QueryIntent::SchemeDetails => DETAILS_FORMAT,
            QueryIntent::EligibilityCheck => ELIGIBILITY_FORMAT,
            QueryIntent::General => GENERAL_FORMAT,
        }
    }
}

pub const SYSTEM_PROMPT: &str = r#"You are a scheme eligibility analyst for MSMEs, NGOs and startups. You answer questions about government and institutional schemes using only the retrieved text chunks supplied with each question.

Rules:
1. The retrieved context is your only source of truth. Do not use outside knowledge, even about schemes you recognise.
2. If the answer is not in the context, reply exactly: "There is no mention in the provided context."
3. Never invent benefits, limits, amounts or criteria. Quote figures exactly as written.
4. Do not recommend schemes that do not appear in the context.
5. Match an abbreviation to a full scheme name only when the full name appears in the context.
6. If the context names a scheme but gives no details about it, say: "The scheme [Name] is mentioned, but the document provides no details regarding its benefits or eligibility."
"#;

const LIST_FORMAT: &str = r#"The user wants a list of schemes. Extract distinct scheme names from the context. Leave out section headers, page numbers, document codes and generic labels such as "Introduction" or "Eligibility Criteria". List each scheme once.
Format:
* **[Scheme Name]**: [one-line summary taken from the context, or only the name if there is none]"#;

const DETAILS_FORMAT: &str = r#"The user wants details of one scheme. Extract its objective, benefits and eligibility from the context.
Format:
* **Scheme Name:** [full name]
* **Objective:** [from the context]
* **Key Benefits:** [bullet points from the context]
* **Eligibility:** [from the context, if stated]"#;

const ELIGIBILITY_FORMAT: &str = r##"The user describes their profile and asks which schemes fit. Extract their data (turnover, sector, registration type and similar), find each scheme's eligibility rules in the context and compare them.
Format:
* **Scheme:** [name]
* **Verdict:** [Highly Suitable / Potentially Suitable / Not Suitable / Need More Info]
* **Reasoning:** [the user's value against the scheme's limit, both as written]
If a needed detail is missing, ask for it: "To confirm eligibility for [Scheme Name], please provide your [missing detail].""##;

const GENERAL_FORMAT: &str = "Answer concisely in plain sentences, citing scheme names as they appear in the context.";

/// Renders the system instructions and the user turn for `query` over `context`.
pub fn build_prompt(query: &str, context: &RankedContext) -> Prompt {
    let intent = QueryIntent::classify(query);
    let user = format!(
        "{}\n\nAnswer ONLY from the retrieved context below. Do not add anything that is not explicitly stated in it.\n\nRetrieved context:\n{}\n\nQuestion: {}",
        intent.format_section(),
        context.context_block(),
        query.trim()
    );
    Prompt { system: SYSTEM_PROMPT.to_string(), user }
}

pub struct AnswerSynthesizer {
    generator: Arc<dyn Generator>,
}

impl AnswerSynthesizer {
    pub fn new(generator: Arc<dyn Generator>) -> Self { Self { generator } }

    /// Generates an answer grounded in `context`. An empty context yields
    /// [`ABSENCE_STATEMENT`] without calling the model. Provider failures are
    /// returned as [`Error::Synthesis`] and never retried here.
    pub async fn answer(&self, query: &str, context: RankedContext) -> Result<Answer> {
        if context.is_empty() {
            info!("no context for '{}', answering with absence statement", query);
            return Ok(Answer { text: ABSENCE_STATEMENT.to_string(), used_context: context });
        }
        let prompt = build_prompt(query, &context);
        debug!("prompt for '{}' uses {} chunks ({:?})", query, context.len(), QueryIntent::classify(query));
        let text = self.generator.generate(&prompt).await.map_err(|e| Error::Synthesis(e.to_string()))?;
        Ok(Answer { text, used_context: context })
    }
}
