use envstore_server::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    let store = MemoryStore::new();
    store.ensure_namespace(&config.namespace.default_namespace);

    let state = AppState::builder()
        .config(config.clone())
        .store(store)
        .build()?;

    let result = Server::new(config).serve(api::router(state)).await;
    shutdown_tracing();
    result
}
