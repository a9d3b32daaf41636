use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use qrelay::audit::AuditLog;
use qrelay::bot::{self, BotDelivery, MessageRouter, WorkerPool};
use qrelay::config::{self, Config};
use qrelay::qr::QrConfig;
use qrelay::server::{self, AppState};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Setup logging: stdout plus a non-blocking file under DATA_DIR/logs.
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("qrelay.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting qrelay...");
    info!("Secret mode: {:?}", config.secret_mode());
    match config.target_chat_id {
        Some(id) => info!("Delivery target chat: {id}"),
        None => info!("No delivery target configured; received links will only be logged"),
    }

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config::CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(config::READ_TIMEOUT_SECS))
        .build()
        .expect("Failed to build HTTP client");
    let bot = Bot::with_client(&config.api_key, client);

    // Get bot info
    let bot_username = match bot.get_me().await {
        Ok(me) => {
            info!("Bot user ID: {}, username: @{}", me.id, me.username());
            me.username().to_string()
        }
        Err(e) => {
            warn!("Failed to fetch bot identity: {e}");
            String::new()
        }
    };

    if let Err(e) = bot::commands::set_bot_commands(&bot).await {
        warn!("Failed to register command menu: {e}");
    }

    let delivery = Arc::new(BotDelivery::new(bot.clone()));
    let router = Arc::new(MessageRouter::new(
        Arc::clone(&delivery),
        QrConfig::default(),
        bot_username,
    ));

    let updates = {
        let router = Arc::clone(&router);
        WorkerPool::spawn(bot::WORKER_COUNT, bot::QUEUE_CAPACITY, move |update| {
            let router = Arc::clone(&router);
            async move { router.handle_update(update).await }
        })
    };

    let audit = AuditLog::open(config.data_dir.join("received_links.ndjson"))
        .await
        .expect("Failed to open audit log");

    let port = config.port;
    let use_polling = config.use_polling;

    let state = AppState {
        config: Arc::new(config),
        delivery,
        audit: Arc::new(audit),
        qr: QrConfig::default(),
        updates,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    info!("Listening on {addr}");

    let app = server::app(state);

    if use_polling {
        // Deployment without a public webhook: long-poll for updates while
        // the HTTP side keeps serving the health check and /receive_link.
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("HTTP server error: {e}");
            }
        });

        info!("Consuming updates by long polling");
        let handler = Update::filter_message().endpoint(on_message);
        Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![router])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    } else if let Err(e) = axum::serve(listener, app).await {
        error!("HTTP server error: {e}");
    }
}

async fn on_message(msg: Message, router: Arc<MessageRouter>) -> ResponseResult<()> {
    router.handle_message(&msg).await;
    Ok(())
}
