mod photos;
mod users;
