// Card layout: text measurement, wrap-and-fit, font resolution and compositing.
// Everything here is synchronous CPU work; async callers go through
// tokio::task::spawn_blocking.

pub mod card;
pub mod fit;
pub mod font_metrics;
pub mod fonts;

pub use card::CardCompositor;
pub use font_metrics::CardFont;
pub use fonts::{default_candidates, resolve_font};
