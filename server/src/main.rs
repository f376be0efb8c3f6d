use clap::Parser;
use log::info;
use server::network::Server;

/// Server for the game of Nim.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The host machine of the Nim server
    #[arg(default_value = "127.0.0.1")]
    host: String,

    /// The port listened to by the Nim server
    #[arg(default_value_t = shared::NIM_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for request logging");
    }

    let args = Args::parse();
    let server = Server::bind(&format!("{}:{}", args.host, args.port)).await?;
    info!("Server started");
    println!(
        "Listening on {}:{}... (^C to shut down)",
        args.host, args.port
    );

    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Shutting down...");
        }
    }

    Ok(())
}
