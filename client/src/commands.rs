//! Interactive command loop and background poller
//!
//! The text client runs two activities over one connection: the prompt
//! loop handling user commands, and a poller task that issues PING once a
//! second while the user is idle at the prompt, so queued notifications
//! (opponent moves, game endings) surface without a command. An async
//! mutex over the connection keeps the two from interleaving requests;
//! the `prompting` flag only decides when polling is worthwhile.

use log::debug;
use shared::protocol::{is_valid_username, Command};
use shared::NimError;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tokio::time::interval;

use crate::network::{Connection, Exchange};

const PROMPT: &str = "> ";

/// How often the poller PINGs for queued notifications.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

const INVALID_NAME: &str =
    "Invalid name; must be 1 to 32 characters from A-Z a-z 0-9 _ - + .";

/// A text-based client for the game of Nim.
pub struct TextClient {
    connection: Arc<Mutex<Connection>>,
    /// True while the user is sitting at the prompt. The poller only
    /// PINGs then, so polls never queue up behind a command in flight.
    prompting: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    host: String,
    port: u16,
}

impl TextClient {
    pub async fn connect(host: &str, port: u16) -> Result<TextClient, NimError> {
        let connection = Connection::connect(host, port).await?;
        Ok(TextClient {
            connection: Arc::new(Mutex::new(connection)),
            prompting: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(true)),
            host: host.to_string(),
            port,
        })
    }

    /// Handles commands until the user quits, input ends, or the
    /// connection fails.
    pub async fn run(&mut self) -> Result<(), NimError> {
        println!("Welcome to Nim on {}:{}!", self.host, self.port);
        println!("Type 'help' for help, 'bye' to exit.");
        self.spawn_poller();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut send_bye = true;
        loop {
            if !self.running.load(Ordering::SeqCst) {
                // The poller hit a connection error; nothing left to send.
                send_bye = false;
                break;
            }

            print_prompt();
            self.prompting.store(true, Ordering::SeqCst);
            let line = lines.next_line().await?;
            self.prompting.store(false, Ordering::SeqCst);

            let Some(line) = line else {
                break; // end of input behaves like 'bye'
            };

            match self.handle_command(&line).await {
                Ok(true) => {}
                Ok(false) => {
                    // 'bye' already completed its exchange.
                    send_bye = false;
                    break;
                }
                Err(err) => {
                    println!("{err}");
                    send_bye = false;
                    break;
                }
            }
        }

        self.quit(send_bye).await;
        Ok(())
    }

    /// Parses and executes one input line. Returns `Ok(false)` when the
    /// user asked to exit.
    async fn handle_command(&self, line: &str) -> Result<bool, NimError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, arguments)) = tokens.split_first() else {
            return Ok(true);
        };

        match command {
            "help" => {
                print_help();
                Ok(true)
            }
            "login" => {
                let Some(args) = expect_args(command, arguments, &["NAME"]) else {
                    return Ok(true);
                };
                if !is_valid_username(args[0]) {
                    println!("{INVALID_NAME}");
                    return Ok(true);
                }
                self.issue(Command::Login(args[0].to_string())).await
            }
            "games" => {
                let Some(_) = expect_args(command, arguments, &[]) else {
                    return Ok(true);
                };
                self.issue(Command::Games).await
            }
            "who" => {
                let Some(_) = expect_args(command, arguments, &[]) else {
                    return Ok(true);
                };
                self.issue(Command::Who).await
            }
            "play" => {
                let Some(args) = expect_args(command, arguments, &["NAME"]) else {
                    return Ok(true);
                };
                if !is_valid_username(args[0]) {
                    println!("{INVALID_NAME}");
                    return Ok(true);
                }
                self.issue(Command::Play(args[0].to_string())).await
            }
            "remove" => {
                let Some(args) = expect_args(command, arguments, &["N", "S"]) else {
                    return Ok(true);
                };
                let Some(n) = natural("object count", args[0]) else {
                    return Ok(true);
                };
                let Some(s) = natural("set ID", args[1]) else {
                    return Ok(true);
                };
                self.issue(Command::Remove(n, s)).await
            }
            "observe" => {
                let Some(args) = expect_args(command, arguments, &["ID"]) else {
                    return Ok(true);
                };
                let Some(id) = natural("game ID", args[0]) else {
                    return Ok(true);
                };
                self.issue(Command::Observe(id)).await
            }
            "unobserve" => {
                let Some(args) = expect_args(command, arguments, &["ID"]) else {
                    return Ok(true);
                };
                let Some(id) = natural("game ID", args[0]) else {
                    return Ok(true);
                };
                self.issue(Command::Unobserve(id)).await
            }
            "bye" => {
                let Some(_) = expect_args(command, arguments, &[]) else {
                    return Ok(true);
                };
                self.issue(Command::Bye).await?;
                Ok(false)
            }
            unknown => {
                println!("Unknown command: '{unknown}'");
                Ok(true)
            }
        }
    }

    /// Sends one command and prints the exchange: notices in arrival
    /// order, then the terminal body.
    async fn issue(&self, command: Command) -> Result<bool, NimError> {
        let exchange = {
            let mut connection = self.connection.lock().await;
            connection.request(command).await?
        };
        print_exchange(&exchange);
        Ok(true)
    }

    /// Stops the poller and, unless the exchange already happened or the
    /// connection is gone, sends a best-effort BYE.
    async fn quit(&self, send_bye: bool) {
        self.running.store(false, Ordering::SeqCst);
        if send_bye {
            let mut connection = self.connection.lock().await;
            if let Ok(exchange) = connection.request(Command::Bye).await {
                print_exchange(&exchange);
            }
        }
        println!("Exiting...");
    }

    fn spawn_poller(&self) {
        let connection = Arc::clone(&self.connection);
        let prompting = Arc::clone(&self.prompting);
        let running = Arc::clone(&self.running);

        tokio::spawn(async move {
            let mut ticker = interval(POLL_INTERVAL);
            ticker.tick().await; // the first tick fires immediately

            loop {
                ticker.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                if !prompting.load(Ordering::SeqCst) {
                    continue;
                }

                let polled = {
                    let mut connection = connection.lock().await;
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    connection.request(Command::Ping).await
                };

                match polled {
                    Ok(exchange) => {
                        let mut printed = false;
                        for notice in &exchange.notices {
                            if !notice.is_empty() {
                                println!("{notice}");
                                printed = true;
                            }
                        }
                        if !exchange.response.body.is_empty() {
                            println!("{}", exchange.response.body);
                            printed = true;
                        }
                        if printed {
                            print_prompt();
                        }
                    }
                    Err(err) => {
                        debug!("Poll failed: {err}");
                        if running.swap(false, Ordering::SeqCst) {
                            println!("{err}");
                        }
                        break;
                    }
                }
            }
        });
    }
}

fn print_prompt() {
    print!("{PROMPT}");
    let _ = std::io::stdout().flush();
}

fn print_exchange(exchange: &Exchange) {
    for notice in &exchange.notices {
        if !notice.is_empty() {
            println!("{notice}");
        }
    }
    println!("{}", exchange.response.body);
}

fn print_help() {
    println!("help - display this help message");
    println!("login NAME - log in to the server with this username");
    println!("games - list all the current ongoing games");
    println!("who - list all the users available to play");
    println!("play NAME - begin a game with this user");
    println!("remove N S - remove N objects from set S on your turn");
    println!("observe ID - start observing this ongoing game");
    println!("unobserve ID - stop observing this game");
    println!("bye - log off the server and exit");
}

/// Checks the argument count against the command's parameter names,
/// printing a diagnostic on mismatch.
fn expect_args<'a>(command: &str, arguments: &'a [&'a str], params: &[&str]) -> Option<&'a [&'a str]> {
    if arguments.len() > params.len() {
        println!("Too many arguments to '{command}'");
        return None;
    }
    if arguments.len() < params.len() {
        let missing = &params[arguments.len()..];
        println!(
            "Missing {} argument{} to '{command}'",
            missing.join(", "),
            if missing.len() > 1 { "s" } else { "" }
        );
        return None;
    }
    Some(arguments)
}

/// Parses a positive integer argument, printing a diagnostic otherwise.
fn natural(what: &str, value: &str) -> Option<i64> {
    match value.parse::<i64>() {
        Ok(n) if n >= 1 => Some(n),
        _ => {
            println!("Invalid {what}; must be a positive integer");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_args_exact_match() {
        let arguments = ["alice"];
        assert_eq!(
            expect_args("login", &arguments, &["NAME"]),
            Some(&arguments[..])
        );
    }

    #[test]
    fn test_expect_args_too_many() {
        let arguments = ["alice", "extra"];
        assert_eq!(expect_args("login", &arguments, &["NAME"]), None);
    }

    #[test]
    fn test_expect_args_missing() {
        assert_eq!(expect_args("remove", &[], &["N", "S"]), None);
        let one = ["2"];
        assert_eq!(expect_args("remove", &one, &["N", "S"]), None);
    }

    #[test]
    fn test_expect_args_no_params() {
        assert_eq!(expect_args("who", &[], &[]), Some(&[][..]));
    }

    #[test]
    fn test_natural_accepts_positive_integers() {
        assert_eq!(natural("set ID", "1"), Some(1));
        assert_eq!(natural("set ID", "42"), Some(42));
    }

    #[test]
    fn test_natural_rejects_zero_negative_and_garbage() {
        assert_eq!(natural("object count", "0"), None);
        assert_eq!(natural("object count", "-3"), None);
        assert_eq!(natural("object count", "many"), None);
        assert_eq!(natural("object count", "1.5"), None);
    }
}
