pub mod app;
pub mod audio;
pub mod catalog;
pub mod lyrics;
pub mod model;
pub mod player;
pub mod ui;
pub mod view;
