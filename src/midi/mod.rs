pub mod loader;
pub mod pacer;
pub mod player;
pub mod summary;
pub mod tempo;
pub mod track_data;
pub mod utils;
