mod app;
mod commands;
mod logging;
mod rendering;

use app::App;

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    logging::init();
    App::default().run().await
}
