#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sysrec_lib::run().await
}
