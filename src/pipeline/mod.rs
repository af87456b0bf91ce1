pub mod classify;
pub mod derive;
pub mod process_photo;
pub mod recovery;
