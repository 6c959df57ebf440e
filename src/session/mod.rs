pub mod ops;
pub mod store;

pub use ops::{request_visualization, save_as, select_and_load, toggle_playback};
pub use store::{Session, SessionStore};
