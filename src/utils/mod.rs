pub mod path_validator;
pub mod pattern;

pub use path_validator::PathValidator;
pub use pattern::PatternMatcher;
