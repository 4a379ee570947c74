//! Print every headset event as JSON until Ctrl-C.
//!
//! ```text
//! RUST_LOG=debug cargo run --example monitor -- [config.toml]
//! ```

use cloudflight::{Config, Headset, HeadsetEvent};

#[tokio::main(flavor = "current_thread")]
async fn main() -> cloudflight::Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let headset = Headset::open(config)?;
    headset.subscribe_all(|event: &HeadsetEvent| match serde_json::to_string(event) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("unprintable event {event:?}: {e}"),
    });

    tokio::signal::ctrl_c().await?;
    println!("{}", serde_json::to_string(&headset.snapshot()).unwrap_or_default());
    headset.close().await;
    Ok(())
}
