//! External text-to-thread generators

use async_trait::async_trait;
use thiserror::Error;

/// Failure of an external generator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("generator unavailable: {0}")]
    Unavailable(String),

    #[error("generator timed out")]
    Timeout,

    #[error("generator returned unusable output: {0}")]
    InvalidOutput(String),
}

/// A service that writes a thread from article text, typically an LLM
///
/// The pipeline treats it as unreliable: any error, timeout or invalid
/// output falls back to the deterministic segmenter.
#[async_trait]
pub trait TweetGenerator: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Produce tweet texts for `text`, each at most `max_length` chars
    async fn generate(&self, text: &str, max_length: usize) -> Result<Vec<String>, GeneratorError>;
}

/// Trim parts and check them against the budget
pub fn validate_output(parts: Vec<String>, max_length: usize) -> Result<Vec<String>, GeneratorError> {
    let parts: Vec<String> = parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    if parts.is_empty() {
        return Err(GeneratorError::InvalidOutput("no tweets".to_string()));
    }

    if let Some((i, part)) = parts
        .iter()
        .enumerate()
        .find(|(_, p)| p.chars().count() > max_length)
    {
        return Err(GeneratorError::InvalidOutput(format!(
            "tweet {} is {} chars, budget is {max_length}",
            i + 1,
            part.chars().count()
        )));
    }

    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_parts_dropped() {
        let parts = validate_output(vec![" one ".into(), "".into(), "two".into()], 280).unwrap();
        assert_eq!(parts, vec!["one", "two"]);
    }

    #[test]
    fn test_empty_output_rejected() {
        assert!(matches!(
            validate_output(vec!["  ".into()], 280),
            Err(GeneratorError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_oversized_part_rejected() {
        let err = validate_output(vec!["ok".into(), "x".repeat(281)], 280).unwrap_err();
        assert_eq!(
            err,
            GeneratorError::InvalidOutput("tweet 2 is 281 chars, budget is 280".to_string())
        );
    }
}
