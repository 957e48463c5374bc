pub mod progress;

pub use progress::{format_duration, ProgressBar};
