use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    scout_cli::main_entry().await
}
