//! Character-budget tweet segmentation

use serde::{Deserialize, Serialize};

/// Default tweet budget in characters
pub const MAX_TWEET_LENGTH: usize = 280;

/// Room kept free in every chunk for a `"{i}/{N} "` prefix
///
/// Applied uniformly whatever the real prefix width; chunks of short threads
/// end up slightly shorter than they could be.
pub const NUMBERING_RESERVE: usize = 10;

const ELLIPSIS: char = '…';

/// One tweet of a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    /// 1-based position in the thread
    pub index: usize,
    pub total: usize,
    pub content: String,
    pub char_count: usize,
}

impl Tweet {
    pub fn new(index: usize, total: usize, content: String) -> Self {
        let char_count = content.chars().count();
        Self {
            index,
            total,
            content,
            char_count,
        }
    }
}

/// Greedy word packer
///
/// Text is split on whitespace and packed into chunks of at most
/// `max_length` characters. A single word longer than the budget becomes its
/// own oversized chunk; it is truncated only when a numbering prefix has to
/// fit in front of it.
#[derive(Debug, Clone, Copy)]
pub struct TweetSegmenter {
    max_length: usize,
}

impl Default for TweetSegmenter {
    fn default() -> Self {
        Self::new(MAX_TWEET_LENGTH)
    }
}

impl TweetSegmenter {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(1),
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Split `text` into tweets, numbering them `"{i}/{N} "` when asked and N > 1
    pub fn split(&self, text: &str, with_numbering: bool) -> Vec<Tweet> {
        let reserve = if with_numbering { NUMBERING_RESERVE } else { 0 };
        let chunks = self.pack(text, reserve);
        let total = chunks.len();

        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let index = i + 1;
                let content = if with_numbering && total > 1 {
                    self.number(index, total, &chunk)
                } else {
                    chunk
                };
                Tweet::new(index, total, content)
            })
            .collect()
    }

    fn pack(&self, text: &str, reserve: usize) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for word in text.split_whitespace() {
            let word_len = word.chars().count();

            if current.is_empty() {
                current.push_str(word);
                current_len = word_len;
                continue;
            }

            if current_len + 1 + word_len + reserve > self.max_length {
                chunks.push(std::mem::take(&mut current));
                current.push_str(word);
                current_len = word_len;
            } else {
                current.push(' ');
                current.push_str(word);
                current_len += 1 + word_len;
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// Prefix a chunk; the content, never the prefix, gives way when over budget
    fn number(&self, index: usize, total: usize, chunk: &str) -> String {
        let prefix = format!("{index}/{total} ");
        let prefix_len = prefix.chars().count();
        let chunk_len = chunk.chars().count();

        if prefix_len + chunk_len <= self.max_length {
            return prefix + chunk;
        }

        let keep = self.max_length.saturating_sub(prefix_len + 1);
        let mut out = prefix;
        out.extend(chunk.chars().take(keep));
        out.push(ELLIPSIS);
        out
    }
}

/// Remove a leading `"{i}/{N} "` prefix
pub fn strip_numbering(content: &str) -> &str {
    let Some((head, rest)) = content.split_once(' ') else {
        return content;
    };
    match head.split_once('/') {
        Some((i, n))
            if !i.is_empty()
                && !n.is_empty()
                && i.bytes().all(|b| b.is_ascii_digit())
                && n.bytes().all(|b| b.is_ascii_digit()) =>
        {
            rest
        }
        _ => content,
    }
}
