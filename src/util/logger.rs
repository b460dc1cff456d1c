use ::config;
use ::fern;
use ::log;
use ::time;

use crate::error::FResult;

/// Turn a config `loglevel` string into a level filter
fn parse_level(levelstr: &str) -> log::LevelFilter {
    match levelstr.to_lowercase().as_ref() {
        "off" => log::LevelFilter::Off,
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => {
            println!("forcesync: config: bad `loglevel` value (\"{}\"), defaulting to \"warn\"", levelstr);
            log::LevelFilter::Warn
        }
    }
}

/// a simple wrapper (pretty much direct from documentation) that sets up
/// logging to STDOUT via fern/log
pub fn setup_logger() -> FResult<()> {
    let levelstr: String = config::get(&["loglevel"]).unwrap_or_else(|_| String::from("warn"));
    let level = parse_level(&levelstr);
    let res = fern::Dispatch::new()
        .format(|out, message, record| {
            let now = time::now();
            let stamp = time::strftime("%Y-%m-%d][%H:%M:%S", &now)
                .unwrap_or_else(|_| String::from("?"));
            out.finish(format_args!("[{}][{}] {}", stamp, record.level(), message))
        })
        .level(level)
        .chain(::std::io::stdout())
        .apply();
    match res {
        Ok(_) => {}
        // someone beat us to it (tests, mostly). not our problem.
        Err(_) => debug!("logger::setup_logger() -- logger already set"),
    }
    Ok(())
}
