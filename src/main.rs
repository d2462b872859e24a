#[tokio::main]
async fn main() {
    if let Err(err) = iot_mcp::mcp::server::run_stdio().await {
        eprintln!("iot-mcp: {}", err);
        std::process::exit(1);
    }
}
