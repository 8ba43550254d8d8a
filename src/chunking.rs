//! Word-window chunking of extracted text units
//!
//! Each unit is split on whitespace and cut into consecutive, non-overlapping
//! windows of at most `max_words` words. Units are chunked independently and the
//! resulting chunks are concatenated in input order.

use serde::Deserialize;
use serde::Serialize;

use crate::errors::Result;
use crate::errors::TableRagError;

/// A bounded-length segment of one text unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `"{unit}-{window}"`, unique within one chunking pass
    pub id: String,
    pub text: String,
    /// Index of the originating non-empty unit
    pub unit: usize,
    /// Window index inside the unit
    pub window: usize,
    /// Position in the concatenated chunk sequence
    pub source_order: usize,
}

impl Chunk {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Split `texts` into ordered chunks of at most `max_words` words
///
/// Empty and whitespace-only units are skipped and do not consume a unit index.
pub fn chunk_texts<S: AsRef<str>>(texts: &[S], max_words: usize) -> Result<Vec<Chunk>> {
    if max_words == 0 {
        return Err(TableRagError::InvalidArgument(
            "max_words must be at least 1".to_string(),
        ));
    }

    let mut chunks = Vec::new();
    let units = texts
        .iter()
        .map(AsRef::as_ref)
        .filter(|text| !text.trim().is_empty());

    for (unit, text) in units.enumerate() {
        let words: Vec<&str> = text.split_whitespace().collect();
        for (window, group) in words.chunks(max_words).enumerate() {
            chunks.push(Chunk {
                id: format!("{unit}-{window}"),
                text: group.join(" "),
                unit,
                window,
                source_order: chunks.len(),
            });
        }
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_shoe_corpus_three_words() {
        let corpus = ["The red shoe sells well", "The blue shoe is discontinued"];
        let chunks = chunk_texts(&corpus, 3).unwrap();

        assert_eq!(
            texts(&chunks),
            vec!["The red shoe", "sells well", "The blue shoe", "is discontinued"]
        );
        assert!(chunks.iter().all(|c| c.word_count() <= 3));
        assert_eq!(
            chunks.iter().map(|c| c.source_order).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert_eq!(chunks[3].id, "1-1");
    }

    #[test]
    fn test_short_unit_is_single_chunk() {
        let chunks = chunk_texts(&["only three words"], 200).unwrap();
        assert_eq!(texts(&chunks), vec!["only three words"]);
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let chunks = chunk_texts(&["  spaced\tout \n words  "], 2).unwrap();
        assert_eq!(texts(&chunks), vec!["spaced out", "words"]);
    }

    #[test]
    fn test_empty_units_skipped() {
        let chunks = chunk_texts(&["", "   ", "kept text", "\n"], 5).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].unit, 0);
        assert_eq!(chunks[0].text, "kept text");
    }

    #[test]
    fn test_zero_max_words_rejected() {
        let result = chunk_texts(&["anything"], 0);
        assert!(matches!(result, Err(TableRagError::InvalidArgument(_))));
    }

    #[test]
    fn test_lossless_and_full_windows() {
        let corpus = [
            "a b c d e f g h i j k",
            "one",
            "alpha beta gamma delta epsilon zeta eta theta",
        ];

        for max_words in 1..=12 {
            let chunks = chunk_texts(&corpus, max_words).unwrap();

            for (unit, original) in corpus.iter().enumerate() {
                let unit_chunks: Vec<&Chunk> = chunks.iter().filter(|c| c.unit == unit).collect();

                let rejoined = unit_chunks
                    .iter()
                    .map(|c| c.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                assert_eq!(
                    rejoined.split_whitespace().collect::<Vec<_>>(),
                    original.split_whitespace().collect::<Vec<_>>(),
                    "unit {unit} with max_words {max_words}"
                );

                let (last, full) = unit_chunks.split_last().unwrap();
                assert!(full.iter().all(|c| c.word_count() == max_words));
                assert!(last.word_count() >= 1 && last.word_count() <= max_words);
            }
        }
    }
}
