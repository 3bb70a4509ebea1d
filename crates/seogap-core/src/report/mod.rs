pub mod console;
pub mod markdown;

pub use console::inspect;
pub use markdown::to_markdown;
