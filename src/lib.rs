//! Telegram relay that translates user messages and scores them with a
//! depression text classifier, plus the HTTP prediction service it calls.

pub mod config;
pub mod logging;
pub mod translate;
pub mod prediction;
pub mod state;
pub mod routes;
pub mod bot;

#[cfg(test)]
pub(crate) mod test_support;
