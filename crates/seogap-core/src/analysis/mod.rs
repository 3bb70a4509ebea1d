//! Pure analysis helpers used by the pipeline stages.

pub mod domain;
pub mod json;
pub mod outline;
pub mod patterns;
pub mod ranking;
pub mod recommendations;
pub mod score;
pub mod validation;

pub use domain::{normalize_host, same_site};
pub use outline::parse_content_outline;
pub use patterns::aggregate;
pub use ranking::detect_ranking;
pub use score::compute_score;
