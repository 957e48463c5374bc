pub mod loader;
pub mod transforms;

pub use loader::{channel_stats, DataLoader};
