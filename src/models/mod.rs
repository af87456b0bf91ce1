pub mod _entities;
pub mod albums;
pub mod observational;
pub mod photo_groups;
pub mod photos;
pub mod users;
