#[tokio::main]
async fn main() -> anyhow::Result<()> {
    reminder_alerts_lib::run().await
}
