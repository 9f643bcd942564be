#[tokio::main]
async fn main() -> anyhow::Result<()> {
    site_header::start_server().await
}
