use std::fmt;
use std::sync::Arc;

/// Raw poster bytes attached to a question.
///
/// The core never decodes these; an empty payload means the poster could not
/// be fetched and the presentation layer should show a placeholder.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PosterImage(Arc<[u8]>);

impl PosterImage {
    #[must_use]
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for PosterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PosterImage({} bytes)", self.0.len())
    }
}

/// A yes/no question about a movie poster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    prompt: String,
    image: PosterImage,
    correct_answer: bool,
}

impl Question {
    #[must_use]
    pub fn new(prompt: impl Into<String>, image: PosterImage, correct_answer: bool) -> Self {
        Self {
            prompt: prompt.into(),
            image,
            correct_answer,
        }
    }

    /// Convenience for questions without a poster.
    #[must_use]
    pub fn text_only(prompt: impl Into<String>, correct_answer: bool) -> Self {
        Self::new(prompt, PosterImage::empty(), correct_answer)
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn image(&self) -> &PosterImage {
        &self.image
    }

    #[must_use]
    pub fn correct_answer(&self) -> bool {
        self.correct_answer
    }

    #[must_use]
    pub fn is_correct(&self, answer: bool) -> bool {
        self.correct_answer == answer
    }
}
