use clap::Parser;
use client::commands::TextClient;

/// Client for the game of Nim.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The host machine of the Nim server
    host: String,

    /// The port listened to by the Nim server
    #[arg(default_value_t = shared::NIM_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut client = match TextClient::connect(&args.host, args.port).await {
        Ok(client) => client,
        Err(err) => {
            println!("Could not connect to {}:{}!\n{err}", args.host, args.port);
            std::process::exit(1);
        }
    };

    client.run().await?;
    Ok(())
}
