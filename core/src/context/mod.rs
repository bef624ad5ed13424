mod area_index;
mod interner;

pub use area_index::{FileAreaEntry, extract_areas_from_file};
pub use interner::{IStr, empty_istr, intern, resolve};
