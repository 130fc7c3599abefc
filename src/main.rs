use anyhow::Context;
use goweli_app::App;
use goweli_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load Goweli settings")?;
    goweli_telemetry::init(&settings.telemetry)?;

    let app = App::bootstrap(settings).await?;
    app.serve(goweli_http::shutdown_signal()).await
}
