pub mod action;
pub mod api;
pub mod app;
pub mod app_state;
pub mod catalog;
pub mod component;
pub mod components;
pub mod launcher;
pub mod poller;
pub mod registry;
pub mod theme;
pub mod tracker;
pub mod widgets;

#[cfg(test)]
mod test_support;
