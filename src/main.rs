#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = exam_player::run().await {
        eprintln!("exam-player fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
