pub mod cache;
pub mod info;
pub mod timeline;

pub use cache::SessionCache;
pub use timeline::{EntitySnapshot, EntityTimeline};
