use std::io::stdin;

use tinystatic::config::{Server, ServerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()?;

    let root = std::env::current_dir()?.join("static");
    std::fs::create_dir_all(&root)?;

    let config = ServerConfig::new()
        .base_addr("localhost:8080")
        .root_dir(root);
    let server = Server::new(config);
    server.start()?;

    println!("Press Enter to stop the server.");
    let mut line = String::new();
    stdin().read_line(&mut line)?;

    server.stop();
    Ok(())
}
