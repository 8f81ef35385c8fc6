use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    postsearch_cli::main_entry().await
}
