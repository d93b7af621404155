//! Sentence-aware text chunking.

use text_splitter::{ChunkConfig, ChunkSizer, TextSplitter};

/// Measures chunks in whitespace-separated words.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCount;

impl ChunkSizer for WordCount {
    fn size(&self, chunk: &str) -> usize {
        chunk.split_whitespace().count()
    }
}

/// Splits text into chunks of at most `chunk_size_words` words.
///
/// The splitter keeps sentences and paragraphs whole where they fit, and only
/// falls back to word boundaries for sentences longer than the target.
pub fn chunk_text(text: &str, chunk_size_words: usize) -> Vec<String> {
    let config = ChunkConfig::new(chunk_size_words.max(1)).with_sizer(WordCount);
    let splitter = TextSplitter::new(config);

    splitter
        .chunks(text)
        .filter(|chunk| !chunk.trim().is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(chunks: &[String]) -> Vec<&str> {
        chunks.iter().flat_map(|c| c.split_whitespace()).collect()
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("One sentence. Another one.", 200);
        assert_eq!(chunks, vec!["One sentence. Another one."]);
    }

    #[test]
    fn test_chunks_stay_within_target() {
        let text = "Revenue grew in the north. Costs fell sharply in the south. \
                    Margins held steady overall. Hiring slowed.";
        let chunks = chunk_text(text, 6);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| WordCount.size(c) <= 6));
        assert_eq!(words(&chunks), text.split_whitespace().collect::<Vec<_>>());
    }

    #[test]
    fn test_sentences_kept_whole_when_they_fit() {
        let chunks = chunk_text("a b c. d e f. g h i.", 4);
        assert_eq!(chunks, vec!["a b c.", "d e f.", "g h i."]);
    }

    #[test]
    fn test_long_sentence_is_split() {
        let text = (0..12).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let chunks = chunk_text(&text, 5);

        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| WordCount.size(c) <= 5));
        assert_eq!(words(&chunks).len(), 12);
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("   ", 200).is_empty());
    }

    #[test]
    fn test_word_count_sizer() {
        assert_eq!(WordCount.size("  two\twords \n"), 2);
        assert_eq!(WordCount.size(""), 0);
    }
}
