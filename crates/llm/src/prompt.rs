//! Prompt construction and fixed response templates
//!
//! Every model call in the pipeline goes through one of these builders so
//! the wording lives in one place. The synthesis prompt is the primary
//! grounding control; do not loosen it.

/// Fixed sentence the model must emit when the context lacks the answer
pub const NOT_FOUND_SENTENCE: &str = "The answer is not available in the provided documents.";

/// Classification rubric prompt
///
/// Asks for exactly one category token; the classifier parses by substring
/// with a fixed precedence, so extra prose from the model is tolerated.
pub fn classification_prompt(query: &str) -> String {
    format!(
        "Classify the user message into exactly ONE category.\n\
         \n\
         Categories:\n\
         - GREETING: salutations, pleasantries, thanks\n\
         - SESSION: user shares personal details, introduces themselves\n\
         - GENERAL: general knowledge, news, coding, math\n\
         - DOMAIN: questions about our internal documents, contracts, leases\n\
         - DEPENDENT: follow-up that needs earlier conversation to make sense\n\
         \n\
         User message: {}\n\
         \n\
         Respond with exactly one category name and nothing else.",
        query
    )
}

/// Rewrite/expansion prompt for ambiguous follow-ups
///
/// `history` is the last few turns rendered as `role: text` lines. The model
/// is asked for a standalone rewrite plus two auxiliary queries; the caller
/// concatenates all three into one composite search string.
pub fn rewrite_prompt(query: &str, history: &[String]) -> String {
    format!(
        "Conversation so far:\n{}\n\
         \n\
         Follow-up question: {}\n\
         \n\
         Rewrite the follow-up as one standalone question that needs no\n\
         conversation context. Then add, each on its own line:\n\
         1. A short keyword search query for the same information need.\n\
         2. A one-sentence hypothetical answer snippet.\n\
         Do not explain or apologize.",
        history.join("\n"),
        query
    )
}

/// Name extraction prompt for SESSION messages
pub fn name_extraction_prompt(query: &str) -> String {
    format!(
        "The user said: \"{}\"\n\
         If the user told you how they want to be addressed, respond with\n\
         that name only. Otherwise respond with exactly NONE.",
        query
    )
}

/// Strict grounded synthesis prompt
///
/// Context-bound by construction: answer only from the passages, emit the
/// fixed not-found sentence when they do not contain the answer, never use
/// outside knowledge, mirror the question's language.
pub fn synthesis_prompt(context: &str, question: &str) -> String {
    format!(
        "Context information is below.\n\
         ---------------------\n\
         {}\n\
         ---------------------\n\
         Given the context information and not prior knowledge, answer the question.\n\
         Rules:\n\
         - Use ONLY the context above. Never use outside knowledge.\n\
         - If the context does not contain the answer, reply exactly: {}\n\
         - Answer in the same language as the question.\n\
         \n\
         Question: {}\n\
         Answer:",
        context, NOT_FOUND_SENTENCE, question
    )
}

/// Fixed user-facing replies for every canned branch
pub struct ResponseTemplates;

impl ResponseTemplates {
    /// Greeting, optionally personalized
    pub fn greeting(name: Option<&str>) -> String {
        match name {
            Some(name) => format!(
                "Hello {}! How can I help you with our documents today?",
                name
            ),
            None => "Hello! How can I help you with our documents today?".to_string(),
        }
    }

    /// Refusal for out-of-domain questions
    pub fn general_refusal(name: Option<&str>) -> String {
        match name {
            Some(name) => format!(
                "Sorry {}, I can only answer questions about the documents in our internal knowledge base.",
                name
            ),
            None => "Sorry, I can only answer questions about the documents in our internal knowledge base.".to_string(),
        }
    }

    /// Ask the user to restate an unanchored follow-up
    pub fn clarification() -> String {
        "Could you rephrase your question with a bit more detail? I don't have enough \
         context from our conversation to know what you are referring to."
            .to_string()
    }

    /// Corrective fallback when retrieved evidence is missing or weak
    pub fn low_confidence() -> String {
        "I searched the internal database, but the retrieved documents do not seem \
         relevant to your specific question. Please contact an admin to upload more data."
            .to_string()
    }

    /// Substitute answer when the hallucination screen trips
    pub fn screen_refusal() -> String {
        "I apologize, but I could not find a reliable answer to that in the indexed \
         documents."
            .to_string()
    }

    /// Acknowledgment after remembering a name
    pub fn name_ack(name: &str) -> String {
        format!("Nice to meet you, {}! I'll remember that.", name)
    }

    /// Acknowledgment when no name could be extracted
    pub fn generic_ack() -> String {
        "Understood.".to_string()
    }

    /// Access denied
    pub fn forbidden() -> String {
        "You do not have permission to perform this action.".to_string()
    }
}
