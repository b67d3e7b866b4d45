use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gmocoin_sdk::auth::Credentials;
use gmocoin_sdk::config::GmoConfig;
use gmocoin_sdk::rest::RestClient;
use gmocoin_sdk::stream::channels::Channel;
use gmocoin_sdk::stream::session::{MessageHandler, StreamSession};
use gmocoin_sdk::token::TokenKeeper;
use secrecy::SecretString;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

struct PrintHandler {
    label: &'static str,
}

#[async_trait]
impl MessageHandler for PrintHandler {
    async fn on_message(
        &mut self,
        message: Value,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        println!("[{}] {message}", self.label);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let config = Arc::new(GmoConfig::default());
        let credentials = Credentials::new(
            std::env::var("GMO_API_KEY").unwrap_or_default(),
            SecretString::new(std::env::var("GMO_API_SECRET").unwrap_or_default()),
        );
        let rest = Arc::new(RestClient::new(Arc::clone(&config), credentials));
        let cancel = CancellationToken::new();

        let (keeper, token) = TokenKeeper::new(Arc::clone(&rest));
        tokio::spawn(keeper.run(cancel.clone()));

        let public = StreamSession::public(
            Arc::clone(&config),
            Channel::PUBLIC.to_vec(),
            PrintHandler { label: "public" },
        );
        tokio::spawn(public.run(cancel.clone()));

        let private = StreamSession::private(
            Arc::clone(&config),
            Channel::PRIVATE.to_vec(),
            token,
            PrintHandler { label: "private" },
        );
        tokio::spawn(private.run(cancel.clone()));

        // Poll margin while the streams run, until ctrl-c.
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    cancel.cancel();
                    break;
                }
                _ = tokio::time::sleep(Duration::from_secs(5)) => {
                    let mut batch = rest.batch();
                    batch.margin();
                    for slot in rest.dispatch(batch).await {
                        match slot {
                            Ok(value) => println!("[margin] {value}"),
                            Err(err) => println!("[margin] failed: {err}"),
                        }
                    }
                }
            }
        }

        Ok(())
    })
}
