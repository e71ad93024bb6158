/*
 * main.rs
 *
 * Parse args, build a Port, run one wrapped primitive, print what came
 * back. Boring on purpose.
 *
 * --json output is for scripts. Don't rename fields.
 */

use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use portshim::args::{Args, Command};
use portshim::error::exit_codes;
use portshim::{
    BrokenDownTime, Config, Metadata, NullReporter, Port, PortError, Reporter, TracingReporter,
    strerror,
};
use tracing_subscriber::EnvFilter;

type CliPort = Port<Box<dyn Reporter>>;

fn main() {
    std::process::exit(i32::from(run_main()));
}

fn run_main() -> u8 {
    let args = Args::parse_args();

    let config = Config::from_env();
    let config = config.with_trace(config.trace || args.trace);
    init_logging(config.trace);

    let reporter: Box<dyn Reporter> = if args.quiet {
        Box::new(NullReporter)
    } else {
        Box::new(TracingReporter)
    };
    let port: CliPort = Port::new(reporter).with_config(config);

    let json = matches!(
        args.command,
        Command::Stat { json: true, .. }
            | Command::Gmtime { json: true, .. }
            | Command::Localtime { json: true, .. }
    );

    let result = match &args.command {
        Command::Stat { path, json } => run_stat(&port, path, *json),
        Command::Time => run_time(&port),
        Command::Gmtime { epoch, json } => run_breakdown(&port, *epoch, *json, true),
        Command::Localtime { epoch, json } => run_breakdown(&port, *epoch, *json, false),
        Command::Strerror { errno } => {
            println!("{}", strerror(*errno));
            Ok(())
        }
        Command::Alloc { factors } => run_alloc(&port, factors),
        Command::Cat { paths } => run_cat(&port, paths),
    };

    match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            if json {
                print_json_error(&e);
            } else if !args.quiet {
                eprintln!("portshim: {e}");
            }
            e.exit_code()
        }
    }
}

/* RUST_LOG wins; --trace / PORTSHIM_DEBUG add portshim=debug on top */
fn init_logging(trace: bool) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if trace && let Ok(directive) = "portshim=debug".parse() {
        filter = filter.add_directive(directive);
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_stat(port: &CliPort, path: &Path, json: bool) -> portshim::Result<()> {
    let meta = port.stat(path)?;
    if json {
        print_json_stat(path, &meta);
    } else {
        println!("path: {}", path.display());
        println!("size: {}", meta.size);
        println!("kind: {}", meta.kind.as_str());
        println!("mode: {:04o}", meta.mode);
        println!("accessed: {}", meta.accessed);
        println!("modified: {}", meta.modified);
        println!("changed: {}", meta.changed);
    }
    Ok(())
}

fn run_time(port: &CliPort) -> portshim::Result<()> {
    let now = port.time();
    println!("{now}");
    println!("{}", port.ctime(now)?);
    Ok(())
}

fn run_breakdown(port: &CliPort, epoch: i64, json: bool, utc: bool) -> portshim::Result<()> {
    let mut out = BrokenDownTime::default();
    let tm = if utc {
        port.gmtime(epoch, &mut out)
    } else {
        port.localtime(epoch, &mut out)
    }
    .ok_or(PortError::TimeRange(epoch))?;

    if json {
        print_json_time(epoch, tm);
    } else {
        println!("{tm}");
        println!("weekday: {}", tm.weekday);
        println!("yearday: {}", tm.yearday);
        match tm.is_dst {
            Some(dst) => println!("dst: {dst}"),
            None => println!("dst: unknown"),
        }
        println!("utc_offset: {}", tm.utc_offset);
    }
    Ok(())
}

fn run_alloc(port: &CliPort, factors: &[usize]) -> portshim::Result<()> {
    let buf = match *factors {
        [a, b] => port.malloc2(a, b)?,
        [a, b, c] => port.malloc3(a, b, c)?,
        /* clap enforces 2..=3 */
        _ => return Err(PortError::from_errno("alloc", libc::EINVAL)),
    };

    match buf {
        Some(buf) => println!("allocated {} bytes", buf.len()),
        None => println!("allocated 0 bytes"),
    }
    Ok(())
}

fn run_cat(port: &CliPort, paths: &[PathBuf]) -> portshim::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut buf = vec![0u8; 64 * 1024];

    for path in paths {
        let mut file = port.open(path, "rb")?;
        loop {
            let n = file.read_bytes(&mut buf);
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n]).map_err(io_to_port)?;
        }
        let failed = file.error();
        file.close()?;
        if failed {
            /* already reported by read */
            return Err(PortError::from_errno("read", libc::EIO));
        }
    }
    out.flush().map_err(io_to_port)
}

fn io_to_port(e: std::io::Error) -> PortError {
    PortError::from_errno("write", e.raw_os_error().unwrap_or(libc::EIO))
}

fn print_json_stat(path: &Path, meta: &Metadata) {
    println!(
        r#"{{"status":"ok","path":"{}","size":{},"kind":"{}","mode":"{:04o}","accessed":{},"modified":{},"changed":{}}}"#,
        escape_json_string(&path.display().to_string()),
        meta.size,
        meta.kind.as_str(),
        meta.mode,
        meta.accessed,
        meta.modified,
        meta.changed
    );
}

fn print_json_time(epoch: i64, tm: &BrokenDownTime) {
    let mut json = String::with_capacity(256);
    let _ = write!(
        json,
        r#"{{"status":"ok","epoch":{},"year":{},"month":{},"day":{},"hour":{},"minute":{},"second":{},"weekday":{},"yearday":{}"#,
        epoch, tm.year, tm.month, tm.day, tm.hour, tm.minute, tm.second, tm.weekday, tm.yearday
    );
    match tm.is_dst {
        Some(dst) => {
            let _ = write!(json, r#","is_dst":{dst}"#);
        }
        None => json.push_str(r#","is_dst":null"#),
    }
    let _ = write!(json, r#","utc_offset":{}}}"#, tm.utc_offset);
    println!("{json}");
}

fn print_json_error(err: &PortError) {
    /* Escape control characters for valid JSON */
    let msg = escape_json_string(&err.to_string());
    println!(
        r#"{{"status":"error","error":"{}","exit_code":{}}}"#,
        msg,
        err.exit_code()
    );
}

/* escape string for JSON - handles quotes, backslashes, control chars */
fn escape_json_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c < '\x20' => {
                let _ = write!(result, "\\u{:04x}", c as u32);
            }
            c => result.push(c),
        }
    }
    result
}
