//! Request dispatcher and per-method handlers
//!
//! Every request is routed here by its connection worker while that worker
//! holds the global registry lock, so a handler body never interleaves
//! with another request's state mutation. Each handler returns the
//! terminal [`Reply`]; the caller's queued notifications are drained in
//! the same lock acquisition and travel ahead of it as 300 frames.

use shared::protocol::{is_valid_username, Command, Request, Status, NIM_VERSION};

use crate::game::MoveError;
use crate::registry::Registry;

const INVALID_NAME: &str =
    "Invalid name; must be 1 to 32 characters from A-Z a-z 0-9 _ - + .";

/// The terminal frame of one exchange, plus whether the worker should
/// close the connection after sending it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: Status,
    pub body: String,
    pub close: bool,
}

impl Reply {
    fn new(status: Status, body: impl Into<String>) -> Self {
        Reply {
            status,
            body: body.into(),
            close: false,
        }
    }

    fn closing(status: Status, body: impl Into<String>) -> Self {
        Reply {
            status,
            body: body.into(),
            close: true,
        }
    }
}

/// Routes one decoded request to its handler.
///
/// Returns the terminal reply and the caller's drained notification queue.
/// The queue is flushed up front: no handler ever enqueues to its own
/// caller, and BYE removes the caller's user entry entirely.
pub fn dispatch(registry: &mut Registry, conn: u64, request: &Request) -> (Reply, Vec<String>) {
    let notices = registry.drain_queue(conn);

    let reply = if request.version > NIM_VERSION {
        Reply::new(
            Status::VersionNotSupported,
            format!("This server speaks NIM/{NIM_VERSION}."),
        )
    } else {
        match &request.command {
            Command::Login(name) => login(registry, conn, name),
            Command::Play(name) => play(registry, conn, name),
            Command::Remove(n, s) => remove(registry, conn, *n, *s),
            Command::Observe(id) => observe(registry, conn, *id),
            Command::Unobserve(id) => unobserve(registry, conn, *id),
            Command::Games => games(registry),
            Command::Who => who(registry, conn),
            Command::Ping => Reply::new(Status::Ok, ""),
            Command::Bye => bye(registry, conn),
            Command::Unknown { method, .. } => Reply::new(
                Status::NotImplemented,
                format!("The method '{method}' is not supported."),
            ),
        }
    };

    (reply, notices)
}

/// Ends the user's game (telling the opponent and observers), releases any
/// observer slot, unbinds the name, and removes the user. Shared by BYE
/// and by worker teardown when a socket drops.
pub fn disconnect(registry: &mut Registry, conn: u64) {
    let Some(user) = registry.user(conn) else {
        return;
    };
    let name = user.display_name();
    let playing = user.game;
    let observing = user.observing;

    if let Some(game_id) = playing {
        let parties = registry
            .game(game_id)
            .map(|game| (game.opponent_of(conn), game.observers.iter().copied().collect::<Vec<_>>()));
        if let Some((opponent, observers)) = parties {
            let notice = format!("{name} has left the game. Game #{game_id} is over.");
            registry.enqueue(opponent, notice.clone());
            for observer in observers {
                registry.enqueue(observer, notice.clone());
            }
            registry.retire_game(game_id);
        }
    }

    if let Some(game_id) = observing {
        if let Some(game) = registry.game_mut(game_id) {
            game.observers.remove(&conn);
        }
    }

    registry.remove_user(conn);
}

fn login(registry: &mut Registry, conn: u64, name: &str) -> Reply {
    if !is_valid_username(name) {
        return Reply::new(Status::Error, INVALID_NAME);
    }
    let Some(user) = registry.user(conn) else {
        return lost_connection();
    };
    if let Some(current) = &user.name {
        return Reply::new(
            Status::MethodNotAllowed,
            format!("You are already logged in as {current}."),
        );
    }
    if registry.user_by_name(name).is_some() {
        return Reply::new(
            Status::Impossible,
            format!("The name '{name}' is already taken."),
        );
    }

    registry.bind_name(conn, name);
    Reply::new(Status::Hello, format!("Hello, {name}!"))
}

fn play(registry: &mut Registry, conn: u64, target_name: &str) -> Reply {
    let Some(caller) = registry.user(conn) else {
        return lost_connection();
    };
    let Some(caller_name) = caller.name.clone() else {
        return Reply::new(
            Status::MethodNotAllowed,
            "You must log in before starting a game.",
        );
    };
    if caller.game.is_some() {
        return Reply::new(Status::MethodNotAllowed, "You are already playing a game.");
    }
    let Some(target) = registry.user_by_name(target_name) else {
        return Reply::new(
            Status::NotFound,
            format!("There is no user named '{target_name}'."),
        );
    };
    if target == conn {
        return Reply::new(Status::Forbidden, "You cannot play against yourself.");
    }
    let target_busy = registry
        .user(target)
        .map(|user| user.game.is_some())
        .unwrap_or(true);
    if target_busy {
        return Reply::new(
            Status::Impossible,
            format!("{target_name} is already playing a game."),
        );
    }

    let game_id = registry.create_game(conn, target);
    let table = match registry.game(game_id) {
        Some(game) => game.pile_table(),
        None => return lost_connection(),
    };
    registry.enqueue(
        target,
        format!(
            "{caller_name} has challenged you to a game of Nim!\n{table}\nIt is {caller_name}'s turn."
        ),
    );
    Reply::new(
        Status::BeginGame,
        format!(
            "You are now playing Nim against {target_name} (game #{game_id}).\n{table}\nIt is your turn."
        ),
    )
}

fn remove(registry: &mut Registry, conn: u64, n: i64, s: i64) -> Reply {
    let Some(game_id) = registry.user(conn).and_then(|user| user.game) else {
        return Reply::new(Status::MethodNotAllowed, "You are not playing a game.");
    };
    let mover = match registry.user(conn) {
        Some(user) => user.display_name(),
        None => return lost_connection(),
    };

    let moved = {
        let Some(game) = registry.game_mut(game_id) else {
            return lost_connection();
        };
        match game.remove(conn, n, s) {
            Err(err) => Err(err),
            Ok(outcome) => Ok((
                outcome.finished,
                game.pile_table(),
                game.opponent_of(conn),
                game.observers.iter().copied().collect::<Vec<_>>(),
            )),
        }
    };

    match moved {
        Err(MoveError::NotYourTurn) => Reply::new(Status::MethodNotAllowed, "It is not your turn."),
        Err(MoveError::NoSuchSet) => Reply::new(Status::NotFound, format!("There is no set {s}.")),
        Err(MoveError::IllegalCount) => Reply::new(
            Status::IllegalMove,
            format!("You cannot remove {n} object(s) from set {s}."),
        ),
        Ok((finished, table, opponent, observers)) => {
            let mut transcript = format!("{mover} removed {n} object(s) from set {s}.\n{table}");
            if finished {
                transcript.push_str(&format!("\n{mover} has won game #{game_id}!"));
            }
            registry.enqueue(opponent, transcript.clone());
            for observer in observers {
                registry.enqueue(observer, transcript.clone());
            }

            if finished {
                registry.retire_game(game_id);
                Reply::new(Status::EndGame, transcript)
            } else {
                Reply::new(Status::Ok, transcript)
            }
        }
    }
}

fn observe(registry: &mut Registry, conn: u64, id: i64) -> Reply {
    let found = u64::try_from(id)
        .ok()
        .and_then(|game_id| registry.game(game_id))
        .map(|game| (game.id, game.pile_table(), game.is_player(conn)));
    let Some((game_id, table, is_player)) = found else {
        return Reply::new(Status::NotFound, format!("There is no game #{id}."));
    };
    let Some(user) = registry.user(conn) else {
        return lost_connection();
    };
    if user.observing.is_some() {
        return Reply::new(Status::Impossible, "You are already observing a game.");
    }
    if is_player {
        return Reply::new(Status::Forbidden, "You cannot observe your own game.");
    }

    if let Some(game) = registry.game_mut(game_id) {
        game.observers.insert(conn);
    }
    if let Some(user) = registry.user_mut(conn) {
        user.observing = Some(game_id);
    }
    Reply::new(Status::Ok, format!("Now observing game #{game_id}.\n{table}"))
}

fn unobserve(registry: &mut Registry, conn: u64, id: i64) -> Reply {
    let found = u64::try_from(id)
        .ok()
        .and_then(|game_id| registry.game(game_id))
        .map(|game| game.id);
    let Some(game_id) = found else {
        return Reply::new(Status::NotFound, format!("There is no game #{id}."));
    };
    let observing = registry.user(conn).and_then(|user| user.observing);
    if observing != Some(game_id) {
        return Reply::new(
            Status::Impossible,
            format!("You are not observing game #{game_id}."),
        );
    }

    if let Some(game) = registry.game_mut(game_id) {
        game.observers.remove(&conn);
    }
    if let Some(user) = registry.user_mut(conn) {
        user.observing = None;
    }
    Reply::new(Status::Ok, format!("No longer observing game #{game_id}."))
}

fn games(registry: &Registry) -> Reply {
    let lines: Vec<String> = registry
        .games()
        .map(|game| {
            let player1 = registry
                .user(game.player1)
                .map(|user| user.display_name())
                .unwrap_or_default();
            let player2 = registry
                .user(game.player2)
                .map(|user| user.display_name())
                .unwrap_or_default();
            format!("{} - {} vs. {}", game.id, player1, player2)
        })
        .collect();

    if lines.is_empty() {
        Reply::new(Status::Ok, "There are no games being played.")
    } else {
        Reply::new(Status::Ok, lines.join("\n"))
    }
}

fn who(registry: &Registry, conn: u64) -> Reply {
    let mut names: Vec<String> = registry
        .users()
        .filter(|user| user.id != conn && user.game.is_none())
        .filter_map(|user| user.name.clone())
        .collect();
    names.sort();

    if names.is_empty() {
        Reply::new(Status::Ok, "There is no one available to play.")
    } else {
        Reply::new(Status::Ok, names.join("\n"))
    }
}

fn bye(registry: &mut Registry, conn: u64) -> Reply {
    disconnect(registry, conn);
    Reply::closing(Status::Bye, "Goodbye!")
}

fn lost_connection() -> Reply {
    Reply::new(
        Status::InternalError,
        "The server lost track of this connection.",
    )
}
