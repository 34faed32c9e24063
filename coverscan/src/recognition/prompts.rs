/// Instruction sent with every cover image, asking for the smallest reply the
/// normalizer can parse.
pub const COVER_PROMPT: &str = r#"This is a book cover. Please identify the book title and author. Return ONLY a JSON response in the format: {"title": "Book Title", "author": "Author Name"} without any markdown formatting. If you cannot read a field, leave it as an empty string."#;

/// Reply length cap for remote providers.
pub const MAX_REPLY_TOKENS: u32 = 300;
