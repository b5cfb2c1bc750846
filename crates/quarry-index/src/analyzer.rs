//! Text analysis pipeline for user-defined fields.
//!
//! Internal metadata fields always use Tantivy's `raw` tokenizer; user text
//! fields share one registered analyzer. The default pipeline is:
//! 1. `SimpleTokenizer` - splits on whitespace and punctuation
//! 2. `LowerCaser` - converts tokens to lowercase
//! 3. `RemoveLongFilter` - removes tokens longer than 40 bytes
//!
//! Callers may hand a different `TextAnalyzer` to the writer configuration
//! source; it is registered under the same name so the schema stays valid.

use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer};

/// Name of the analyzer registered with Tantivy for user text fields.
pub const QUARRY_TOKENIZER: &str = "quarry_text";

/// Maximum token length in bytes before filtering.
const MAX_TOKEN_LENGTH: usize = 40;

/// Builds the default quarry text analyzer.
pub fn default_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
        .build()
}

#[cfg(test)]
mod test {
    use tantivy::tokenizer::TokenStream;

    use super::*;

    #[test]
    fn lowercases_and_splits() {
        let mut analyzer = default_analyzer();
        let mut stream = analyzer.token_stream("Hello, Quarry-Core");

        let mut tokens = Vec::new();
        while let Some(token) = stream.next() {
            tokens.push(token.text.clone());
        }

        assert_eq!(tokens, vec!["hello", "quarry", "core"]);
    }

    #[test]
    fn drops_overlong_tokens() {
        let mut analyzer = default_analyzer();
        let long = "x".repeat(MAX_TOKEN_LENGTH + 1);
        let mut stream = analyzer.token_stream(&long);
        assert!(stream.next().is_none());
    }
}
