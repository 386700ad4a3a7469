// Insights: transcript lookup, quote scoring and the HTTP handlers around them.
// The extractor is pure; all I/O lives behind the TranscriptSource trait.

pub mod extractor;
pub mod handlers;
pub mod lexicon;
pub mod locator;
pub mod source;
