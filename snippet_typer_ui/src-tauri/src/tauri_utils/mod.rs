pub mod app_state;
pub mod event_bridge;
pub mod hotkeys;
pub mod store;
