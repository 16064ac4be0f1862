//! Token counting shared by the chunker's sizing decisions (§4.3) and the
//! max-token hard-cut split path.

use std::sync::LazyLock;
use tiktoken_rs::CoreBPE;

static ENCODER: LazyLock<CoreBPE> =
    LazyLock::new(|| tiktoken_rs::cl100k_base().expect("cl100k_base encoder data is bundled"));

/// Count tokens in `text` using the cl100k_base encoding.
#[must_use]
pub fn count_tokens(text: &str) -> usize {
    ENCODER.encode_with_special_tokens(text).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_zero_tokens() {
        assert_eq!(count_tokens(""), 0);
    }

    #[test]
    fn longer_text_has_more_tokens() {
        let short = count_tokens("Loan amount.");
        let long = count_tokens("Loan amount must not exceed five hundred thousand dollars.");
        assert!(long > short);
    }
}
