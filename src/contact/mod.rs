//! Contact extraction
//!
//! [`ContactRecord`] is the normalized, additive result stored on every
//! opportunity; [`ContactExtractor`] fills it by cascading over the site's
//! pages, the registration record and finally conventional addresses.

mod extractor;
mod record;

pub use extractor::ContactExtractor;
pub use record::{Confidence, ContactRecord, ContactSource, ExtractionDetails, RECORD_VERSION};
