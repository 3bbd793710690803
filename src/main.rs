#[tokio::main]
async fn main() {
    clause_scan::init_tracing();

    if let Err(e) = clause_scan::run(std::env::args().skip(1)).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
