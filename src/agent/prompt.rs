/// Combines the document context and the user's question into the single
/// prompt sent to the model.
pub fn build_prompt(message: &str, document_context: &str) -> String {
    format!(
        "Based on the document titled \"{document_context}\", please answer the following question: {message}"
    )
}
