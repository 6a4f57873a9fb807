//! HTTP status codes the server produces, as a typed enum.

/// Every status a static file server can answer with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                            // 200
    PartialContent,                // 206

    // ── 3xx Redirection ───────────────────────────────────────────────────────
    MovedPermanently,              // 301
    NotModified,                   // 304

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    NotFound,                      // 404
    MethodNotAllowed,              // 405
    PreconditionFailed,            // 412
    RangeNotSatisfiable,           // 416

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError,           // 500
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                  => 200,
            Status::PartialContent      => 206,
            Status::MovedPermanently    => 301,
            Status::NotModified         => 304,
            Status::NotFound            => 404,
            Status::MethodNotAllowed    => 405,
            Status::PreconditionFailed  => 412,
            Status::RangeNotSatisfiable => 416,
            Status::InternalServerError => 500,
        }
    }
}

impl From<Status> for http::StatusCode {
    fn from(s: Status) -> http::StatusCode {
        match s {
            Status::Ok                  => http::StatusCode::OK,
            Status::PartialContent      => http::StatusCode::PARTIAL_CONTENT,
            Status::MovedPermanently    => http::StatusCode::MOVED_PERMANENTLY,
            Status::NotModified         => http::StatusCode::NOT_MODIFIED,
            Status::NotFound            => http::StatusCode::NOT_FOUND,
            Status::MethodNotAllowed    => http::StatusCode::METHOD_NOT_ALLOWED,
            Status::PreconditionFailed  => http::StatusCode::PRECONDITION_FAILED,
            Status::RangeNotSatisfiable => http::StatusCode::RANGE_NOT_SATISFIABLE,
            Status::InternalServerError => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
