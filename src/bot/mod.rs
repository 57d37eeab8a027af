pub mod telegram;
pub mod formatting;
pub mod handlers;
pub mod dispatcher;

pub use telegram::{TelegramClient, TelegramError};
pub use formatting::{format_model_results, DepressionLabel, FormatError};
pub use handlers::BotHandlers;
pub use dispatcher::Dispatcher;
