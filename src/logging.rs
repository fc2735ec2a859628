use anyhow::Result;
use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};
use log::{info, warn};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Orbit, Request, Response, Rocket};

use crate::settings::ServerSettings;

/// Start file logging with daily rotation. Warnings are also echoed to
/// stderr. Keep the returned handle alive for the life of the process.
pub fn init_logger(settings: &ServerSettings) -> Result<LoggerHandle> {
    let handle = Logger::try_with_str(&settings.log_spec)?
        .log_to_file(
            FileSpec::default()
                .directory(settings.log_dir.clone())
                .basename("netrunner"),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Numbers,
            Cleanup::KeepLogFiles(7),
        )
        .start()?;
    Ok(handle)
}

/// Logs one line per request and the bound address at liftoff.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request logger",
            kind: Kind::Liftoff | Kind::Response,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let config = rocket.config();
        match local_ip_address::local_ip() {
            Ok(ip) => info!(
                "listening on {}:{} (LAN address {}:{})",
                config.address, config.port, ip, config.port
            ),
            Err(e) => {
                info!("listening on {}:{}", config.address, config.port);
                warn!("could not determine LAN address: {}", e);
            }
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        info!("{} {} -> {}", req.method(), req.uri(), res.status());
    }
}
