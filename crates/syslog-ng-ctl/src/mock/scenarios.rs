//! Canned control socket responses of a small syslog-ng installation.
//!
//! Shared by tests and by the `syslog-ng-ctl-mock` server.

use crate::control::Request;

/// `STATS` response: header, 38 data lines, sentinel.
pub const STATS_RESPONSE: &str = "\
SourceName;SourceId;SourceInstance;State;Type;Number
dst.file;d_mesg#0;/var/log/messages;a;dropped;0
dst.file;d_mesg#0;/var/log/messages;a;processed;610
dst.file;d_mesg#0;/var/log/messages;a;stored;0
destination;d_spol;;a;processed;0
src.internal;s_sys#2;;a;processed;72
src.internal;s_sys#2;;a;stamp;1556092051
center;;received;a;processed;72
src.unix-dgram;s_sys#0;/run/systemd/journal/syslog;a;processed;675
src.unix-dgram;s_sys#0;/run/systemd/journal/syslog;a;stamp;1556092606
destination;d_mesg;;a;processed;610
destination;d_mail;;a;processed;0
destination;d_auth;;a;processed;51
destination;d_mlal;;a;processed;0
center;;queued;a;processed;797
src.none;;;a;processed;0
src.none;;;a;stamp;0
destination;d_cron;;a;processed;111
global;payload_reallocs;;a;processed;88
global;sdata_updates;;a;processed;0
dst.file;d_kern#0;/var/log/kern;o;dropped;0
dst.file;d_kern#0;/var/log/kern;o;processed;25
dst.file;d_kern#0;/var/log/kern;o;stored;0
src.host;;l261767-vm;d;processed;772
src.host;;l261767-vm;d;stamp;1556092606
dst.file;d_cron#0;/var/log/cron;o;dropped;0
dst.file;d_cron#0;/var/log/cron;o;processed;111
dst.file;d_cron#0;/var/log/cron;o;stored;0
src.file;s_sys#1;/dev/kmsg;a;processed;25
src.file;s_sys#1;/dev/kmsg;a;stamp;1556091325
destination;d_boot;;a;processed;0
destination;d_kern;;a;processed;25
global;msg_clones;;a;processed;0
source;s_sys;;a;processed;72
dst.file;d_auth#0;/var/log/secure;a;dropped;0
dst.file;d_auth#0;/var/log/secure;a;processed;51
dst.file;d_auth#0;/var/log/secure;a;stored;0
src.tcp;s_net;afsocket_sd.(stream,AF_INET(0.0.0.0:514));a;connections;0
src.network;s_net;afsocket_sd.(stream,AF_INET(0.0.0.0:601));a;connections;0
.
";

/// Number of lines in [`STATS_RESPONSE`] that classify to a metric.
pub const STATS_EMISSIONS: usize = 28;

pub const RELOAD_RESPONSE: &str = "OK Config reload successful\n.\n";

pub const RELOAD_FAILED_RESPONSE: &str =
    "FAIL Error while reloading configuration: syntax error in /etc/syslog-ng/syslog-ng.conf\n.\n";

pub const HEALTHCHECK_RESPONSE: &str = "\
OK syslogng_io_worker_latency_seconds 6.0819000000000002e-05
syslogng_mainloop_io_worker_roundtrip_latency_seconds 0.000114926
syslogng_internal_events_queue_usage_ratio 0
.
";

/// Response syslog-ng gives to a command it does not know.
pub const UNKNOWN_COMMAND_RESPONSE: &str = "FAIL Invalid command\n.\n";

/// Canned response for a request line (without the newline).
pub fn response_for(request: &str) -> &'static str {
    match request.trim() {
        t if t == Request::Stats.token() => STATS_RESPONSE,
        t if t == Request::Reload.token() => RELOAD_RESPONSE,
        t if t == Request::Healthcheck.token() => HEALTHCHECK_RESPONSE,
        _ => UNKNOWN_COMMAND_RESPONSE,
    }
}
