mod activity;
pub mod app;
pub mod camera;
pub mod surface;
