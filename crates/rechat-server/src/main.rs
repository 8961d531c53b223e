#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rechat_server::run().await
}
