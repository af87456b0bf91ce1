pub mod album_cache;
