//! Response statuses and handler flavors.
//!
//! A flavor decides how a handler's payload is rendered and which status
//! vocabulary it speaks: message handlers use small negative codes, web and
//! JSON handlers use HTTP codes.

use crate::message::Status;

/// Transport-independent meaning of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Ok,
    Created,
    MultiStatus,
    Found,
    BadRequest,
    AuthFailure,
    Forbidden,
    NotFound,
    NotAllowed,
    ServerError,
}

/// Rendering style of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flavor {
    /// Whole payload rendered as JSON, message status codes.
    Message,
    /// Body and headers rendered as an HTTP response.
    #[default]
    Web,
    /// Payload rendered as a JSON document over HTTP.
    Json,
}

const MESSAGE_CODES: &[(i32, &str)] = &[
    (0, "OK"),
    (-1, "Bad request"),
    (-2, "Authentication failed"),
    (-3, "Not found"),
    (-4, "Method not allowed"),
    (-5, "Server error"),
];

const WEB_CODES: &[(i32, &str)] = &[
    (200, "OK"),
    (201, "Created"),
    (207, "Multi-Status"),
    (302, "Found"),
    (400, "Bad request"),
    (401, "Authentication failed"),
    (403, "Forbidden"),
    (404, "Not found"),
    (405, "Method not allowed"),
    (500, "Server error"),
];

impl Flavor {
    /// True for flavors that speak HTTP (headers, cookies, `Allow`).
    pub fn is_web(&self) -> bool {
        matches!(self, Flavor::Web | Flavor::Json)
    }

    /// The code this flavor uses for `kind`.
    pub fn code(&self, kind: StatusKind) -> i32 {
        match self {
            Flavor::Message => match kind {
                StatusKind::Ok | StatusKind::Created | StatusKind::MultiStatus | StatusKind::Found => 0,
                StatusKind::BadRequest => -1,
                StatusKind::AuthFailure | StatusKind::Forbidden => -2,
                StatusKind::NotFound => -3,
                StatusKind::NotAllowed => -4,
                StatusKind::ServerError => -5,
            },
            Flavor::Web | Flavor::Json => match kind {
                StatusKind::Ok => 200,
                StatusKind::Created => 201,
                StatusKind::MultiStatus => 207,
                StatusKind::Found => 302,
                StatusKind::BadRequest => 400,
                StatusKind::AuthFailure => 401,
                StatusKind::Forbidden => 403,
                StatusKind::NotFound => 404,
                StatusKind::NotAllowed => 405,
                StatusKind::ServerError => 500,
            },
        }
    }

    /// Status for `kind` with its standard message.
    pub fn status(&self, kind: StatusKind) -> Status {
        self.lookup(self.code(kind))
    }

    /// Status for an arbitrary code; unknown codes use the code as message.
    pub fn lookup(&self, code: i32) -> Status {
        let table = match self {
            Flavor::Message => MESSAGE_CODES,
            Flavor::Web | Flavor::Json => WEB_CODES,
        };
        table
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(c, msg)| Status::new(*c, msg))
            .unwrap_or_else(|| Status::with_msg(code, code.to_string()))
    }

    /// Status a fresh handler starts with: error until success is earned.
    pub fn default_status(&self) -> Status {
        self.status(StatusKind::ServerError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flavor_codes() {
        assert_eq!(Flavor::Web.status(StatusKind::NotFound), Status::new(404, "Not found"));
        assert_eq!(Flavor::Message.status(StatusKind::NotFound), Status::new(-3, "Not found"));
        assert_eq!(Flavor::Json.default_status().code, 500);
        assert_eq!(Flavor::Message.default_status().code, -5);
    }

    #[test]
    fn test_unknown_code_lookup() {
        let status = Flavor::Web.lookup(418);
        assert_eq!(status.code, 418);
        assert_eq!(status.msg, "418");
    }
}
