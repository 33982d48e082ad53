pub mod config;
pub mod conversation;
pub mod db;
pub mod health;
pub mod locale;
pub mod reconcile;
pub mod status;
pub mod telegram;

#[cfg(test)]
mod testutil;
