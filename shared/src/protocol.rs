//! Packet grammar for the Nim text protocol
//!
//! Requests look like `PLAY bob NIM/1.0` followed by a header block and a
//! counted body; responses like `NIM/1.0 203 Begin Game`. Every packet
//! carries a `Content-Length` header naming the byte length of its body.
//! Methods have fixed, typed parameter signatures that are validated here,
//! at decode time, so handlers never re-parse arguments.

use std::fmt;
use std::str::FromStr;

use crate::NimError;

/// Default TCP port for Nim servers.
pub const NIM_PORT: u16 = 7849;

/// The one protocol version this implementation speaks.
pub const NIM_VERSION: Version = Version { major: 1, minor: 0 };

/// Largest accepted packet body, in bytes.
pub const MAX_BODY: usize = 4096;

/// Protocol version carried on every request and response line.
///
/// Ordering is lexicographic on (major, minor), so a `2.0` or `1.1` request
/// compares greater than the supported `1.0` and draws a 505.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = NimError;

    fn from_str(s: &str) -> Result<Self, NimError> {
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| NimError::Framing(format!("bad protocol version '{s}'")))?;
        let major = major
            .parse()
            .map_err(|_| NimError::Framing(format!("bad protocol version '{s}'")))?;
        let minor = minor
            .parse()
            .map_err(|_| NimError::Framing(format!("bad protocol version '{s}'")))?;
        Ok(Version { major, minor })
    }
}

/// Response status vocabulary. Each status maps to exactly one reason phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Hello,
    Bye,
    BeginGame,
    EndGame,
    Continued,
    Error,
    Impossible,
    IllegalMove,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    InternalError,
    NotImplemented,
    VersionNotSupported,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Hello => 201,
            Status::Bye => 202,
            Status::BeginGame => 203,
            Status::EndGame => 204,
            Status::Continued => 300,
            Status::Error => 400,
            Status::Impossible => 401,
            Status::IllegalMove => 402,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::MethodNotAllowed => 405,
            Status::InternalError => 500,
            Status::NotImplemented => 501,
            Status::VersionNotSupported => 505,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Hello => "Hello",
            Status::Bye => "Bye",
            Status::BeginGame => "Begin Game",
            Status::EndGame => "End Game",
            Status::Continued => "Continued",
            Status::Error => "Error",
            Status::Impossible => "Impossible",
            Status::IllegalMove => "Illegal Move",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",
            Status::InternalError => "Internal Error",
            Status::NotImplemented => "Not Implemented",
            Status::VersionNotSupported => "Nim Version Not Supported",
        }
    }

    pub fn from_code(code: u16) -> Option<Status> {
        match code {
            200 => Some(Status::Ok),
            201 => Some(Status::Hello),
            202 => Some(Status::Bye),
            203 => Some(Status::BeginGame),
            204 => Some(Status::EndGame),
            300 => Some(Status::Continued),
            400 => Some(Status::Error),
            401 => Some(Status::Impossible),
            402 => Some(Status::IllegalMove),
            403 => Some(Status::Forbidden),
            404 => Some(Status::NotFound),
            405 => Some(Status::MethodNotAllowed),
            500 => Some(Status::InternalError),
            501 => Some(Status::NotImplemented),
            505 => Some(Status::VersionNotSupported),
            _ => None,
        }
    }
}

/// A decoded request method with its typed parameters.
///
/// Methods this implementation does not know decode as `Unknown` with the
/// raw parameter strings preserved; the dispatcher answers those with 501.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(String),
    Remove(i64, i64),
    Bye,
    Games,
    Who,
    Play(String),
    Observe(i64),
    Unobserve(i64),
    Ping,
    Unknown { method: String, params: Vec<String> },
}

impl Command {
    pub fn method(&self) -> &str {
        match self {
            Command::Login(_) => "LOGIN",
            Command::Remove(_, _) => "REMOVE",
            Command::Bye => "BYE",
            Command::Games => "GAMES",
            Command::Who => "WHO",
            Command::Play(_) => "PLAY",
            Command::Observe(_) => "OBSERVE",
            Command::Unobserve(_) => "UNOBSERVE",
            Command::Ping => "PING",
            Command::Unknown { method, .. } => method,
        }
    }

    /// Builds a typed command from a method name and raw parameter tokens.
    pub fn from_parts(method: &str, params: &[&str]) -> Result<Command, NimError> {
        match method {
            "LOGIN" => Ok(Command::Login(single_param(method, params)?.to_string())),
            "PLAY" => Ok(Command::Play(single_param(method, params)?.to_string())),
            "REMOVE" => {
                if params.len() != 2 {
                    return Err(arity_error(method, 2, params.len()));
                }
                Ok(Command::Remove(
                    int_param(method, params[0])?,
                    int_param(method, params[1])?,
                ))
            }
            "OBSERVE" => Ok(Command::Observe(int_param(
                method,
                single_param(method, params)?,
            )?)),
            "UNOBSERVE" => Ok(Command::Unobserve(int_param(
                method,
                single_param(method, params)?,
            )?)),
            "BYE" => no_params(method, params).map(|_| Command::Bye),
            "GAMES" => no_params(method, params).map(|_| Command::Games),
            "WHO" => no_params(method, params).map(|_| Command::Who),
            "PING" => no_params(method, params).map(|_| Command::Ping),
            _ => Ok(Command::Unknown {
                method: method.to_string(),
                params: params.iter().map(|p| p.to_string()).collect(),
            }),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Login(name) => write!(f, "LOGIN {name}"),
            Command::Remove(n, s) => write!(f, "REMOVE {n} {s}"),
            Command::Play(name) => write!(f, "PLAY {name}"),
            Command::Observe(id) => write!(f, "OBSERVE {id}"),
            Command::Unobserve(id) => write!(f, "UNOBSERVE {id}"),
            Command::Unknown { method, params } => {
                write!(f, "{method}")?;
                for param in params {
                    write!(f, " {param}")?;
                }
                Ok(())
            }
            _ => write!(f, "{}", self.method()),
        }
    }
}

fn arity_error(method: &str, expected: usize, got: usize) -> NimError {
    NimError::Framing(format!(
        "{method} takes {expected} parameter(s), got {got}"
    ))
}

fn single_param<'a>(method: &str, params: &[&'a str]) -> Result<&'a str, NimError> {
    if params.len() != 1 {
        return Err(arity_error(method, 1, params.len()));
    }
    Ok(params[0])
}

fn no_params(method: &str, params: &[&str]) -> Result<(), NimError> {
    if !params.is_empty() {
        return Err(arity_error(method, 0, params.len()));
    }
    Ok(())
}

fn int_param(method: &str, value: &str) -> Result<i64, NimError> {
    value
        .parse()
        .map_err(|_| NimError::Framing(format!("{method} parameter '{value}' is not an integer")))
}

/// A request packet: method line, protocol version, and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub version: Version,
    pub body: String,
}

impl Request {
    pub fn new(command: Command) -> Self {
        Request {
            command,
            version: NIM_VERSION,
            body: String::new(),
        }
    }

    /// The `METHOD [params] NIM/x.y` line, without the trailing CRLF.
    pub fn request_line(&self) -> String {
        format!("{} NIM/{}", self.command, self.version)
    }

    pub fn encode(&self) -> Vec<u8> {
        format!(
            "{}\r\nContent-Length: {}\r\n\r\n{}",
            self.request_line(),
            self.body.len(),
            self.body
        )
        .into_bytes()
    }

    /// Parses a request line plus the already-extracted body.
    pub fn parse(line: &str, body: String) -> Result<Request, NimError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 2 {
            return Err(NimError::Framing(format!("bad request line '{line}'")));
        }
        let version = protocol_token(tokens[tokens.len() - 1])?;
        let command = Command::from_parts(tokens[0], &tokens[1..tokens.len() - 1])?;
        Ok(Request {
            command,
            version,
            body,
        })
    }
}

/// A response packet: protocol version, status, and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub version: Version,
    pub status: Status,
    pub body: String,
}

impl Response {
    pub fn new(status: Status, body: impl Into<String>) -> Self {
        Response {
            version: NIM_VERSION,
            status,
            body: body.into(),
        }
    }

    /// A 300 Continued frame carrying one queued notification.
    pub fn continued(body: impl Into<String>) -> Self {
        Response::new(Status::Continued, body)
    }

    /// The `NIM/x.y <code> <reason>` line, without the trailing CRLF.
    pub fn status_line(&self) -> String {
        format!(
            "NIM/{} {} {}",
            self.version,
            self.status.code(),
            self.status.reason()
        )
    }

    pub fn encode(&self) -> Vec<u8> {
        format!(
            "{}\r\nContent-Length: {}\r\n\r\n{}",
            self.status_line(),
            self.body.len(),
            self.body
        )
        .into_bytes()
    }

    /// Parses a status line plus the already-extracted body.
    pub fn parse(line: &str, body: String) -> Result<Response, NimError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 2 {
            return Err(NimError::Framing(format!("bad status line '{line}'")));
        }
        let version = protocol_token(tokens[0])?;
        let code: u16 = tokens[1]
            .parse()
            .map_err(|_| NimError::Framing(format!("bad status code '{}'", tokens[1])))?;
        let status = Status::from_code(code)
            .ok_or_else(|| NimError::Framing(format!("unknown status code {code}")))?;
        Ok(Response {
            version,
            status,
            body,
        })
    }
}

fn protocol_token(token: &str) -> Result<Version, NimError> {
    token
        .strip_prefix("NIM/")
        .ok_or_else(|| NimError::Framing(format!("missing protocol version in '{token}'")))?
        .parse()
}

/// Parses the `Name: value` lines that follow a request or status line.
pub fn parse_headers(lines: &[String]) -> Result<Vec<(String, String)>, NimError> {
    lines
        .iter()
        .map(|line| {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| NimError::Framing(format!("malformed header line '{line}'")))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Extracts and bounds-checks the mandatory Content-Length header.
pub fn content_length(headers: &[(String, String)]) -> Result<usize, NimError> {
    let value = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("Content-Length"))
        .map(|(_, value)| value.as_str())
        .ok_or_else(|| NimError::Framing("missing Content-Length header".to_string()))?;
    let length: usize = value
        .parse()
        .map_err(|_| NimError::Framing(format!("bad Content-Length '{value}'")))?;
    if length > MAX_BODY {
        return Err(NimError::Framing(format!(
            "body of {length} bytes exceeds the {MAX_BODY}-byte limit"
        )));
    }
    Ok(length)
}

/// Checks a username against the protocol charset: 1 to 32 characters from
/// `A-Z a-z 0-9 _ - + .`, case-sensitive.
pub fn is_valid_username(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 32
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'+' | b'.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_and_reasons() {
        assert_eq!(Status::Ok.code(), 200);
        assert_eq!(Status::Hello.reason(), "Hello");
        assert_eq!(Status::BeginGame.code(), 203);
        assert_eq!(Status::BeginGame.reason(), "Begin Game");
        assert_eq!(Status::EndGame.code(), 204);
        assert_eq!(Status::Continued.code(), 300);
        assert_eq!(Status::Impossible.code(), 401);
        assert_eq!(Status::IllegalMove.reason(), "Illegal Move");
        assert_eq!(Status::MethodNotAllowed.code(), 405);
        assert_eq!(
            Status::VersionNotSupported.reason(),
            "Nim Version Not Supported"
        );
    }

    #[test]
    fn test_status_from_code_round_trip() {
        for status in [
            Status::Ok,
            Status::Hello,
            Status::Bye,
            Status::BeginGame,
            Status::EndGame,
            Status::Continued,
            Status::Error,
            Status::Impossible,
            Status::IllegalMove,
            Status::Forbidden,
            Status::NotFound,
            Status::MethodNotAllowed,
            Status::InternalError,
            Status::NotImplemented,
            Status::VersionNotSupported,
        ] {
            assert_eq!(Status::from_code(status.code()), Some(status));
        }
    }

    #[test]
    fn test_status_from_unknown_code() {
        assert_eq!(Status::from_code(418), None);
        assert_eq!(Status::from_code(0), None);
    }

    #[test]
    fn test_version_parse_and_display() {
        let version: Version = "1.0".parse().unwrap();
        assert_eq!(version, NIM_VERSION);
        assert_eq!(version.to_string(), "1.0");
    }

    #[test]
    fn test_version_ordering() {
        let v10: Version = "1.0".parse().unwrap();
        let v11: Version = "1.1".parse().unwrap();
        let v20: Version = "2.0".parse().unwrap();
        assert!(v11 > v10);
        assert!(v20 > v11);
        assert!(v10 <= NIM_VERSION);
    }

    #[test]
    fn test_version_rejects_garbage() {
        assert!("abc".parse::<Version>().is_err());
        assert!("1".parse::<Version>().is_err());
        assert!("1.x".parse::<Version>().is_err());
    }

    #[test]
    fn test_request_round_trip_every_method() {
        let commands = vec![
            Command::Login("alice".to_string()),
            Command::Remove(2, 1),
            Command::Bye,
            Command::Games,
            Command::Who,
            Command::Play("bob".to_string()),
            Command::Observe(7),
            Command::Unobserve(7),
            Command::Ping,
        ];

        for command in commands {
            let request = Request::new(command.clone());
            let encoded = String::from_utf8(request.encode()).unwrap();
            let (line, rest) = encoded.split_once("\r\n").unwrap();
            let body = rest.split_once("\r\n\r\n").unwrap().1;
            let decoded = Request::parse(line, body.to_string()).unwrap();

            assert_eq!(decoded.command, command);
            assert_eq!(decoded.version, NIM_VERSION);
        }
    }

    #[test]
    fn test_request_encode_has_content_length() {
        let mut request = Request::new(Command::Ping);
        request.body = "hello".to_string();
        let encoded = String::from_utf8(request.encode()).unwrap();
        assert_eq!(encoded, "PING NIM/1.0\r\nContent-Length: 5\r\n\r\nhello");
    }

    #[test]
    fn test_remove_accepts_negative_integers() {
        // Typed decode only checks that the parameters are integers; value
        // range is the game engine's business.
        let request = Request::parse("REMOVE -3 0 NIM/1.0", String::new()).unwrap();
        assert_eq!(request.command, Command::Remove(-3, 0));
    }

    #[test]
    fn test_remove_rejects_non_integer() {
        assert!(Request::parse("REMOVE two 1 NIM/1.0", String::new()).is_err());
    }

    #[test]
    fn test_wrong_arity_is_framing_error() {
        assert!(Request::parse("LOGIN NIM/1.0", String::new()).is_err());
        assert!(Request::parse("LOGIN a b NIM/1.0", String::new()).is_err());
        assert!(Request::parse("BYE now NIM/1.0", String::new()).is_err());
        assert!(Request::parse("REMOVE 1 NIM/1.0", String::new()).is_err());
    }

    #[test]
    fn test_unknown_method_keeps_string_params() {
        let request = Request::parse("FROBNICATE 12 fast NIM/1.0", String::new()).unwrap();
        match request.command {
            Command::Unknown { method, params } => {
                assert_eq!(method, "FROBNICATE");
                assert_eq!(params, vec!["12".to_string(), "fast".to_string()]);
            }
            other => panic!("expected Unknown command, got {other:?}"),
        }
    }

    #[test]
    fn test_request_missing_version_is_framing_error() {
        assert!(Request::parse("LOGIN alice", String::new()).is_err());
        assert!(Request::parse("PING", String::new()).is_err());
    }

    #[test]
    fn test_request_carries_foreign_version() {
        let request = Request::parse("PING NIM/2.0", String::new()).unwrap();
        assert_eq!(request.version, Version { major: 2, minor: 0 });
        assert!(request.version > NIM_VERSION);
    }

    #[test]
    fn test_response_round_trip() {
        let response = Response::new(Status::BeginGame, "the table");
        let encoded = String::from_utf8(response.encode()).unwrap();
        let (line, rest) = encoded.split_once("\r\n").unwrap();
        let body = rest.split_once("\r\n\r\n").unwrap().1;
        let decoded = Response::parse(line, body.to_string()).unwrap();

        assert_eq!(decoded.status, Status::BeginGame);
        assert_eq!(decoded.body, "the table");
    }

    #[test]
    fn test_response_unknown_status_is_framing_error() {
        assert!(Response::parse("NIM/1.0 299 Whatever", String::new()).is_err());
    }

    #[test]
    fn test_response_bad_status_line() {
        assert!(Response::parse("NIM/1.0", String::new()).is_err());
        assert!(Response::parse("HTTP/1.1 200 OK", String::new()).is_err());
    }

    #[test]
    fn test_parse_headers() {
        let lines = vec!["Content-Length: 12".to_string(), "X-Extra: yes".to_string()];
        let headers = parse_headers(&lines).unwrap();
        assert_eq!(headers[0], ("Content-Length".to_string(), "12".to_string()));
        assert_eq!(content_length(&headers).unwrap(), 12);
    }

    #[test]
    fn test_malformed_header_line() {
        let lines = vec!["not a header".to_string()];
        assert!(parse_headers(&lines).is_err());
    }

    #[test]
    fn test_content_length_missing_or_invalid() {
        assert!(content_length(&[]).is_err());
        let bad = vec![("Content-Length".to_string(), "lots".to_string())];
        assert!(content_length(&bad).is_err());
    }

    #[test]
    fn test_content_length_over_limit() {
        let big = vec![("Content-Length".to_string(), "9000".to_string())];
        assert!(content_length(&big).is_err());
    }

    #[test]
    fn test_username_validation() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("Bob_2+x.-"));
        assert!(is_valid_username(&"a".repeat(32)));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username(&"a".repeat(33)));
        assert!(!is_valid_username("no spaces"));
        assert!(!is_valid_username("émile"));
    }
}
