use std::error::Error;
use std::sync::Arc;

use gmocoin_sdk::auth::Credentials;
use gmocoin_sdk::config::GmoConfig;
use gmocoin_sdk::rest::RestClient;
use secrecy::SecretString;

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
        let client = RestClient::new(config, credentials);

        let mut batch = client.batch();
        batch.status();
        batch.ticker();
        batch.orderbooks();
        batch.trades(1, 10);

        for (index, slot) in client.dispatch(batch).await.into_iter().enumerate() {
            match slot {
                Ok(value) => println!("[{index}] {value}"),
                Err(err) => println!("[{index}] failed: {err}"),
            }
        }

        Ok(())
    })
}
