mod atomic_io;
mod envelope;
mod store;

pub use envelope::SAVE_FORMAT_VERSION;
pub use store::{SaveError, SaveStore};
