mod process_photo;
mod recovery;
