use terraform_provider_petstore::{init_logging, serve, PetstoreProvider};

#[tokio::main]
async fn main() {
    init_logging();

    let provider = PetstoreProvider::new(env!("CARGO_PKG_VERSION"));
    tracing::info!(version = provider.version(), "Starting petstore provider");

    if let Err(e) = serve(provider).await {
        tracing::error!(error = %e, "Provider exited with error");
        std::process::exit(1);
    }
}
