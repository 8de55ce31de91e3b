use std::sync::Arc;

use etcdbeat::{
    auth::{AuthGate, HttpAuthProbe},
    client::HttpStatsClient,
    config::{config_path, ConfigSettings, ResolvedConfig},
    errors::BeatError,
    publisher::{ChannelPublisher, PublishService},
    Etcdbeat, BEAT_NAME,
};
use log::{error, info};
use logger::logs;
use tokio::{signal, sync::mpsc};

#[tokio::main]
async fn main() -> Result<(), BeatError> {
    logs::init(BEAT_NAME);

    let path = config_path(std::env::args().nth(1));
    let settings = ConfigSettings::load_from_file(&path).inspect_err(|e| error!("Error reading configuration file: {}", e))?;
    let config = ResolvedConfig::resolve(&settings.input).inspect_err(|e| error!("Invalid configuration: {}", e))?;

    let client = HttpStatsClient::from_config(&config).map_err(|e| BeatError::Runtime(e.to_string()))?;
    let auth_gate = AuthGate::new(Box::new(HttpAuthProbe::new(reqwest::Client::new())));

    /* START - Publish service  */
    let (tx, rx) = mpsc::channel(1_000);
    let publisher = Arc::new(ChannelPublisher::new(tx));
    let publish_handle = tokio::spawn(PublishService::new(rx, tokio::io::stdout()).run());
    /* END - Publish service  */

    let mut beat = Etcdbeat::new(BEAT_NAME, config, Box::new(client), publisher, auth_gate);
    let stop_handle = beat.stop_handle();
    let mut beat_handle = tokio::spawn(async move { beat.run().await });

    // Look for termination signals
    tokio::select! {
        res = &mut beat_handle => {
            if let Err(e) = res {
                error!("{} poll loop failed!!!", BEAT_NAME);
                return Err(BeatError::Runtime(e.to_string()));
            }
        }
        _ = signal::ctrl_c() => {
            info!("CTRL + C TERMINATION!!!!");
            stop_handle.stop().await;
            beat_handle.await.map_err(|e| BeatError::Runtime(e.to_string()))?;
        },
    };

    publish_handle.await.map_err(|e| BeatError::Runtime(e.to_string()))?;
    info!("{} shutdown!!!", BEAT_NAME);

    Ok(())
}
