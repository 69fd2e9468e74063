//! OpenAPI documentation definition.

use syslog_ng_ctl::command::{CommandResult, CommandStatus};
use utoipa::OpenApi;

use crate::handlers::ErrorBody;

#[derive(OpenApi)]
#[openapi(
    paths(crate::handlers::handle_reload, crate::handlers::handle_healthcheck),
    components(schemas(CommandResult, CommandStatus, ErrorBody)),
    info(
        title = "syslog-ng exporter API",
        version = "1.0",
        description = "Control commands forwarded to the syslog-ng control socket"
    )
)]
pub(crate) struct ApiDoc;
