//! The four matching strategies that feed the result pool (§4).

pub mod cross_source;
pub mod email_domain;
pub mod fuzzy_name;
pub mod identifier;

pub use cross_source::CrossSourceValidator;
pub use email_domain::EmailDomainBooster;
pub use fuzzy_name::FuzzyNameMatcher;
pub use identifier::{ein_matches, IdentifierMatcher};
