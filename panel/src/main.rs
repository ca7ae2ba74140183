mod app;
mod buttons;
mod display;
mod hub;
#[cfg(feature = "rpi")]
mod epd;
#[cfg(feature = "rpi")]
mod hw;
mod input;
mod render;
mod scheduler;
mod worker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
