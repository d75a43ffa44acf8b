mod discover;
mod prompt;
mod select;

pub use discover::{
    detect_legacy_instance, discover_candidates, Candidate, DATA_DIR_SUFFIX,
    DEFAULT_INSTANCE_NAME,
};
pub use prompt::{Answer, Prompter};
pub use select::{
    resolve_instance, select_candidate, Resolution, ResolutionSource, ResolverPaths,
};
