//! Transport-agnostic responses produced by the dispatcher.
//!
//! A [`Reply`] pairs a numeric [`StatusCode`] with a small serializable
//! [`Body`]. The HTTP front end renders the body as JSON and copies the status
//! code onto the response line, so the library never depends on a particular
//! web framework.

use crate::stats::StatsSnapshot;
use serde::Serialize;

/// Numeric status code attached to every [`Reply`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: Self = Self(200);
    pub const NOT_FOUND: Self = Self(404);
    pub const METHOD_NOT_ALLOWED: Self = Self(405);
    pub const PRECONDITION_FAILED: Self = Self(412);
    pub const UNPROCESSABLE_ENTITY: Self = Self(422);
    pub const SERVICE_UNAVAILABLE: Self = Self(503);

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }
}

/// Structured payload of a [`Reply`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Body {
    /// A password was accepted and will be digested under `id`.
    Submitted { id: u64 },
    /// The finished digest for `id`.
    Digest { id: u64, digest: String },
    /// Submission statistics.
    Stats(StatsSnapshot),
    /// Acknowledgement without further data.
    Ack { status: &'static str },
    /// Any failure; `error` repeats the status code.
    Error {
        error: u16,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        allow: Option<&'static [&'static str]>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    status: StatusCode,
    body: Body,
}

impl Reply {
    pub const fn ok(body: Body) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub const fn error(
        status: StatusCode,
        message: String,
        allow: Option<&'static [&'static str]>,
    ) -> Self {
        Self {
            status,
            body: Body::Error {
                error: status.as_u16(),
                message,
                allow,
            },
        }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Verbs to advertise in an `Allow` header, if this reply rejects the
    /// request's verb.
    pub fn allow(&self) -> Option<&'static [&'static str]> {
        match self.body {
            Body::Error { allow, .. } => allow,
            _ => None,
        }
    }

    pub fn into_parts(self) -> (StatusCode, Body) {
        (self.status, self.body)
    }
}

impl<T, E> From<Result<T, E>> for Reply
where
    T: Into<Reply>,
    E: Into<Reply>,
{
    fn from(res: Result<T, E>) -> Self {
        match res {
            Ok(ok) => ok.into(),
            Err(err) => err.into(),
        }
    }
}

impl From<Body> for Reply {
    fn from(body: Body) -> Self {
        Self::ok(body)
    }
}
