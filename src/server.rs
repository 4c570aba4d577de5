use std::io::Read;
use std::panic::{self, AssertUnwindSafe};

use tiny_http::{Method, Request, Response, Server};
use tracing::{error, info, warn};

use crate::app::App;
use crate::error::{AuditError, Result};
use crate::protocol::{self, Reply};

/// Answers triggers one at a time until the listener shuts down.
pub fn serve(app: &App, addr: &str) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| AuditError::Configuration(format!("failed to bind {addr}: {e}")))?;
    info!(addr, "listening for triggers");

    for request in server.incoming_requests() {
        handle_request(app, request);
    }

    Ok(())
}

pub fn handle_request(app: &App, mut request: Request) {
    let reply = dispatch(app, &mut request);
    let response = Response::from_string(reply.body).with_status_code(reply.status);

    if let Err(e) = request.respond(response) {
        warn!(error = %e, "failed to write response");
    }
}

fn dispatch(app: &App, request: &mut Request) -> Reply {
    match request.method() {
        Method::Get if request.url() == "/health" => Reply::ok("translation-audit alive"),

        Method::Post => {
            let mut body = String::new();
            if let Err(e) = request.as_reader().read_to_string(&mut body) {
                warn!(error = %e, "unreadable request body");
                return Reply::bad_request();
            }

            // A panic must not take the listener down with it.
            match panic::catch_unwind(AssertUnwindSafe(|| protocol::handle(app, &body))) {
                Ok(reply) => reply,
                Err(_) => {
                    error!("job panicked");
                    Reply::internal("internal error")
                }
            }
        }

        _ => Reply {
            status: 405,
            body: "Method Not Allowed".to_string(),
        },
    }
}
