//! Built-in request handlers.
//!
//! Each handler has the [`Handler`](crate::router::Handler) signature and is
//! registered in [`Service::default_routes`]. Handlers return
//! `Result<Body, Error>` internally and let the `Reply` conversion pick the
//! status code.

use super::{Call, Form, Service};
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::reply::{Body, Reply};

/// `POST /hash`: accepts a password and returns its handle.
///
/// The digest is computed in the background and becomes retrievable through
/// `GET /hash/{id}` once the configured delay has elapsed.
pub fn submit_hash(svc: &Service, call: &Call<'_>) -> Reply {
    submit(svc, call).into()
}

fn submit(svc: &Service, call: &Call<'_>) -> Result<Body> {
    let password = validate_form(svc, call)?;

    if !call.rest.is_empty() {
        return Err(Error::MalformedPath {
            reason: format!("`{}` takes no qualifier", call.method),
        });
    }

    // Only allocate once the request is known to be valid and the digest can
    // be scheduled, so rejected submissions never consume a handle.
    let runtime = svc.worker.runtime()?;
    let id = svc.handles.next();
    svc.worker.schedule_on(&runtime, id, password.as_bytes().to_vec());

    #[cfg(feature = "tracing")]
    tracing::debug!("Accepted password under handle {id}");

    Ok(Body::Submitted { id })
}

fn validate_form<'a>(svc: &Service, call: &Call<'a>) -> Result<&'a str> {
    let form: &'a Form = call.form;
    let config = svc.config();
    let max = config.max_password_len;

    for field in config.required_fields() {
        let value = form
            .get(field)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::MissingField {
                field: field.to_string(),
            })?;

        if value.len() > max {
            return Err(Error::FieldTooLong {
                field: field.to_string(),
                len: value.len(),
                max,
            });
        }
    }

    // Present and non-empty: checked in the loop above.
    Ok(form
        .get(&config.password_field)
        .map(String::as_str)
        .unwrap_or_default())
}

/// `GET /hash/{id}`: returns the digest stored under `id`.
///
/// A handle that was never issued and one whose digest is still being computed
/// both answer `404`.
pub fn retrieve_hash(svc: &Service, call: &Call<'_>) -> Reply {
    retrieve(svc, call).into()
}

fn retrieve(svc: &Service, call: &Call<'_>) -> Result<Body> {
    let raw = call.qualifier().ok_or_else(|| Error::MalformedPath {
        reason: format!("expected /{}/<id>", call.method),
    })?;

    let id: Handle = raw.parse().map_err(|_| Error::InvalidHandle {
        raw: raw.to_string(),
    })?;

    let digest = svc.store.get(id).ok_or(Error::NotFound { handle: id })?;
    Ok(Body::Digest { id, digest })
}

/// `GET /stats`: count and average latency of successful submissions.
pub fn stats(svc: &Service, _call: &Call<'_>) -> Reply {
    Reply::ok(Body::Stats(svc.stats.snapshot()))
}

/// `shutdown` (any routed verb): stops admission and acknowledges at once.
///
/// Draining and listener teardown happen out of band, driven by the gate's
/// shutdown-ready signal.
pub fn shutdown(svc: &Service, _call: &Call<'_>) -> Reply {
    svc.gate.initiate_shutdown();
    Reply::ok(Body::Ack {
        status: "shutting down",
    })
}
