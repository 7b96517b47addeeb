//! Text cleaning ahead of segmentation.

mod cleaner;
mod markdown;
mod protect;
mod stopwords;

pub use cleaner::{clean_text, normalize_whitespace, TextCleaner};
pub use markdown::strip_markdown;
pub use protect::Protected;
pub use stopwords::Stopwords;
