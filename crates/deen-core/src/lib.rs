pub mod cache;
pub mod dictionary;
pub mod equiv;
pub mod line;
pub mod pattern;
pub mod preprocess;
pub mod progress;
pub mod search;

pub use cache::ResultCache;
pub use dictionary::{DictHandle, Dictionary};
pub use pattern::{SearchPattern, make_search_pattern};
pub use preprocess::clean_search_term;
pub use search::{SearchError, SearchOptions, SearchOutcome, search_dict};
