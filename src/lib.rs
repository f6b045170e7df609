pub mod app;
pub mod config;
pub mod library;
pub mod logging;
pub mod lookup;
pub mod menu;
pub mod model;
pub mod playback;
pub mod player;
pub mod pod;
pub mod storage;
pub mod timer;
pub mod ui;
pub mod wheel;
