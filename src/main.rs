#[tokio::main]
async fn main() {
    if let Err(e) = deskpilot_lib::run().await {
        tracing::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
