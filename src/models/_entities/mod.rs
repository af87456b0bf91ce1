pub mod albums;
pub mod audit_logs;
pub mod album_views;
pub mod download_logs;
pub mod jobs;
pub mod photo_group_assignments;
pub mod photo_groups;
pub mod photo_views;
pub mod photos;
pub mod translations;
pub mod users;
