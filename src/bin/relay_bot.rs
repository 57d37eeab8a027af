use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use depression_relay::bot::{BotHandlers, Dispatcher, TelegramClient};
use depression_relay::config::Config;
use depression_relay::prediction::PredictionClient;
use depression_relay::translate::YandexTranslator;

#[tokio::main]
async fn main() -> Result<()> {
    depression_relay::logging::init();

    let config = Config::from_env()?;
    config.require_bot()?;

    let translator = Arc::new(YandexTranslator::from_config(&config.translator)?);
    let predictor = Arc::new(PredictionClient::from_config(&config.model_service)?);
    let telegram = Arc::new(TelegramClient::from_config(&config.telegram)?);

    let bot_username = match telegram.get_me().await {
        Ok(me) => {
            info!("Authorized as @{}", me.username.as_deref().unwrap_or("<unnamed>"));
            me.username
        }
        Err(e) => {
            warn!("getMe failed, commands with @mentions will not match: {}", e);
            None
        }
    };

    let handlers = Arc::new(
        BotHandlers::new(
            translator,
            predictor,
            &config.translator.source_language,
            &config.translator.target_language,
        )
        .with_bot_username(bot_username),
    );

    info!("Model service at {}", config.model_service.url);
    let dispatcher = Dispatcher::new(
        telegram,
        handlers,
        config.telegram.poll_timeout_secs,
        Duration::from_secs(config.telegram.retry_delay_secs),
    );

    dispatcher
        .start_polling(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    Ok(())
}
