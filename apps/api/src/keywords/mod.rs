// Keyword extraction: static vocabulary, the ranking engine, and its preview endpoint.
// Pure code only; nothing here performs I/O.

pub mod dictionary;
pub mod extractor;
pub mod handlers;
