pub mod controller;
pub mod events;
pub mod navigation;
pub mod state;
pub mod status;
pub mod stdio;
pub mod ui;
pub mod worker;

#[cfg(test)]
mod tests;
